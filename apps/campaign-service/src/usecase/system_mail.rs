//! # 単発メール送信ユースケース
//!
//! キャンペーンを介さずに 1 通だけ送るメールを扱う。
//!
//! - 任意の件名・本文による単発送信
//! - 購読者向けのウェルカムメール
//! - SMTP 設定確認用のテストメール
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: 組み込みメールのテンプレートはバイナリに埋め込み、
//!   tera でレンダリングする
//! - **送信結果はそのまま返す**: 未構成・送信失敗は [`DeliveryOutcome`] で返し、
//!   HTTP ステータスへの変換はハンドラが行う

use std::sync::Arc;

use mailflow_domain::email::EmailMessage;
use tera::{Context, Tera};

use super::{DeliveryOutcome, MailTransport};
use crate::error::CampaignServiceError;

const STORE_NAME: &str = "MAGR Store";
const SHOP_URL: &str = "https://magrstore.com";
const SUPPORT_EMAIL: &str = "support@magrstore.com";

const WELCOME_TEMPLATE: &str = "welcome.html";
const SMTP_TEST_TEMPLATE: &str = "smtp_test.html";

/// 単発送信の入力
#[derive(Debug, Clone)]
pub struct SendEmailInput {
    pub to:      String,
    pub subject: String,
    pub html:    String,
    pub cc:      Option<String>,
    pub bcc:     Option<String>,
}

/// 組み込みメールのレンダラー
pub struct SystemMailRenderer {
    engine: Tera,
}

impl SystemMailRenderer {
    /// 埋め込みテンプレートを登録してレンダラーを作成する
    pub fn new() -> Result<Self, CampaignServiceError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    WELCOME_TEMPLATE,
                    include_str!("../../templates/system/welcome.html"),
                ),
                (
                    SMTP_TEST_TEMPLATE,
                    include_str!("../../templates/system/smtp_test.html"),
                ),
            ])
            .map_err(|e| CampaignServiceError::Internal(e.to_string()))?;

        Ok(Self { engine })
    }

    /// ウェルカムメールを生成する
    pub fn welcome(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<EmailMessage, CampaignServiceError> {
        let mut context = base_context();
        if let Some(name) = name {
            context.insert("name", name);
        }

        let subject = match name {
            Some(name) => format!("Welcome to {STORE_NAME}, {name}!"),
            None => format!("Welcome to {STORE_NAME}!"),
        };
        let html = self.render(WELCOME_TEMPLATE, &context)?;

        Ok(EmailMessage::new(email, subject, html))
    }

    /// SMTP 設定確認用のテストメールを生成する
    pub fn smtp_test(&self, email: &str) -> Result<EmailMessage, CampaignServiceError> {
        let html = self.render(SMTP_TEST_TEMPLATE, &base_context())?;

        Ok(EmailMessage::new(
            email,
            format!("{STORE_NAME} - SMTP Test Email"),
            html,
        ))
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, CampaignServiceError> {
        self.engine
            .render(template, context)
            .map_err(|e| CampaignServiceError::Internal(e.to_string()))
    }
}

fn base_context() -> Context {
    let mut context = Context::new();
    context.insert("store_name", STORE_NAME);
    context.insert("shop_url", SHOP_URL);
    context.insert("support_email", SUPPORT_EMAIL);
    context
}

/// 単発メール送信ユースケース
pub struct SystemMailUseCaseImpl {
    transport: Arc<MailTransport>,
    renderer:  SystemMailRenderer,
}

impl SystemMailUseCaseImpl {
    pub fn new(transport: Arc<MailTransport>, renderer: SystemMailRenderer) -> Self {
        Self {
            transport,
            renderer,
        }
    }

    /// 任意の件名・本文でメールを 1 通送信する
    #[tracing::instrument(skip_all)]
    pub async fn send(&self, input: SendEmailInput) -> Result<DeliveryOutcome, CampaignServiceError> {
        if input.to.trim().is_empty()
            || input.subject.trim().is_empty()
            || input.html.trim().is_empty()
        {
            return Err(CampaignServiceError::BadRequest(
                "宛先（to）、件名（subject）、本文（html）は必須です".to_string(),
            ));
        }

        let message = EmailMessage::new(input.to, input.subject, input.html)
            .with_cc(input.cc)
            .with_bcc(input.bcc);

        Ok(self.transport.send(&message).await)
    }

    /// ウェルカムメールを送信する
    #[tracing::instrument(skip_all)]
    pub async fn send_welcome(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<DeliveryOutcome, CampaignServiceError> {
        require_email_address(email, "メールアドレスは必須です")?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let message = self.renderer.welcome(email.trim(), name)?;
        Ok(self.transport.send(&message).await)
    }

    /// SMTP 設定確認用のテストメールを送信する
    #[tracing::instrument(skip_all)]
    pub async fn send_test(&self, email: &str) -> Result<DeliveryOutcome, CampaignServiceError> {
        require_email_address(email, "有効なテスト送信先メールアドレスを指定してください")?;

        let message = self.renderer.smtp_test(email.trim())?;
        Ok(self.transport.send(&message).await)
    }
}

fn require_email_address(email: &str, message: &str) -> Result<(), CampaignServiceError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(CampaignServiceError::BadRequest(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use mailflow_domain::{
        clock::{Clock, FixedClock},
        smtp_config::{SmtpFallback, SmtpSecret},
    };
    use mailflow_infra::{
        kv::{InMemoryKvStore, KvStore},
        mock::MockMailSender,
        repository::{KvDeliveryLogRepository, KvSmtpConfigRepository},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::usecase::SmtpConfigUseCaseImpl;

    fn sut(fallback: SmtpFallback, sender: MockMailSender) -> SystemMailUseCaseImpl {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let smtp_config = Arc::new(SmtpConfigUseCaseImpl::new(
            Arc::new(KvSmtpConfigRepository::new(store.clone())),
            fallback,
            clock.clone(),
        ));
        let transport = Arc::new(MailTransport::new(
            smtp_config,
            Arc::new(sender),
            Arc::new(KvDeliveryLogRepository::new(store)),
            clock,
        ));
        SystemMailUseCaseImpl::new(transport, SystemMailRenderer::new().unwrap())
    }

    fn configured() -> SmtpFallback {
        SmtpFallback {
            hostname: Some("smtp.example.com".to_string()),
            username: Some("user".to_string()),
            password: Some(SmtpSecret::new("secret")),
            ..Default::default()
        }
    }

    #[test]
    fn test_レンダラーが正常に初期化される() {
        assert!(SystemMailRenderer::new().is_ok());
    }

    #[test]
    fn test_名前ありのウェルカムメールは件名と本文に名前を含む() {
        let renderer = SystemMailRenderer::new().unwrap();

        let message = renderer.welcome("ada@example.com", Some("Ada")).unwrap();

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Welcome to MAGR Store, Ada!");
        assert!(message.html.contains("Hi Ada,"));
    }

    #[test]
    fn test_名前なしのウェルカムメールはthereで呼びかける() {
        let renderer = SystemMailRenderer::new().unwrap();

        let message = renderer.welcome("ada@example.com", None).unwrap();

        assert_eq!(message.subject, "Welcome to MAGR Store!");
        assert!(message.html.contains("Hi there,"));
    }

    #[test]
    fn test_ウェルカムメールの名前はエスケープされる() {
        let renderer = SystemMailRenderer::new().unwrap();

        let message = renderer
            .welcome("ada@example.com", Some("<script>"))
            .unwrap();

        assert!(!message.html.contains("<script>"));
    }

    #[test]
    fn test_テストメールの件名() {
        let renderer = SystemMailRenderer::new().unwrap();

        let message = renderer.smtp_test("ops@example.com").unwrap();

        assert_eq!(message.subject, "MAGR Store - SMTP Test Email");
        assert!(message.html.contains("SMTP Test Successful!"));
    }

    #[tokio::test]
    async fn test_単発送信はccとbccを付けて送信する() {
        let sender = MockMailSender::new();
        let sut = sut(configured(), sender.clone());

        let outcome = sut
            .send(SendEmailInput {
                to:      "a@x.com".to_string(),
                subject: "件名".to_string(),
                html:    "<p>本文</p>".to_string(),
                cc:      Some("c@x.com".to_string()),
                bcc:     Some(" ".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Sent);
        let sent = sender.sent_messages();
        assert_eq!(sent[0].cc.as_deref(), Some("c@x.com"));
        assert_eq!(sent[0].bcc, None);
    }

    #[rstest]
    #[case("", "件名", "<p>本文</p>")]
    #[case("a@x.com", " ", "<p>本文</p>")]
    #[case("a@x.com", "件名", "")]
    #[tokio::test]
    async fn test_単発送信の必須項目が空ならbad_request(
        #[case] to: &str,
        #[case] subject: &str,
        #[case] html: &str,
    ) {
        let sut = sut(configured(), MockMailSender::new());

        let result = sut
            .send(SendEmailInput {
                to:      to.to_string(),
                subject: subject.to_string(),
                html:    html.to_string(),
                cc:      None,
                bcc:     None,
            })
            .await;

        assert!(matches!(result, Err(CampaignServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_未構成ならnot_configuredを返す() {
        let sender = MockMailSender::new();
        let sut = sut(SmtpFallback::default(), sender.clone());

        let outcome = sut.send_test("ops@example.com").await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::NotConfigured);
        assert!(sender.sent_messages().is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("not-an-email")]
    #[tokio::test]
    async fn test_アットマークを含まない宛先はbad_request(#[case] email: &str) {
        let sut = sut(configured(), MockMailSender::new());

        assert!(matches!(
            sut.send_test(email).await,
            Err(CampaignServiceError::BadRequest(_))
        ));
        assert!(matches!(
            sut.send_welcome(email, None).await,
            Err(CampaignServiceError::BadRequest(_))
        ));
    }
}
