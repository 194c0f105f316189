//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//!
//! - ポート 465: 暗黙的 TLS（`relay`）
//! - それ以外: STARTTLS（`starttls_relay`）

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    Address,
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use mailflow_domain::{
    email::{EmailMessage, MailError},
    smtp_config::SmtpConfig,
};

use super::MailSender;

/// SMTP メール送信
///
/// 送信ごとに `SmtpConfig` からトランスポートを組み立てる。
pub struct SmtpMailSender {
    timeout: Duration,
}

impl SmtpMailSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `timeout`: 接続から送信完了までのタイムアウト
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn transport(
        &self,
        config: &SmtpConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = if config.uses_implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.hostname)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.hostname)
        }
        .map_err(|e| MailError::Transport(format!("TLS 設定に失敗: {e}")))?;

        Ok(builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose().to_string(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    #[tracing::instrument(skip_all, level = "debug", fields(host = %config.hostname, port = config.port))]
    async fn send(&self, config: &SmtpConfig, message: &EmailMessage) -> Result<(), MailError> {
        let message = build_message(config, message)?;

        self.transport(config)?
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// 設定とメッセージから lettre の `Message` を組み立てる
///
/// CC / BCC はカンマ区切りで複数指定できる。
fn build_message(config: &SmtpConfig, email: &EmailMessage) -> Result<Message, MailError> {
    let from = Mailbox::new(
        Some(config.from_name.clone()),
        parse_address(&config.from_email, "送信元")?,
    );
    let to = Mailbox::new(None, parse_address(&email.to, "宛先")?);

    let mut builder = Message::builder().from(from).to(to).subject(&email.subject);
    for cc in split_addresses(email.cc.as_deref()) {
        builder = builder.cc(Mailbox::new(None, parse_address(cc, "CC")?));
    }
    for bcc in split_addresses(email.bcc.as_deref()) {
        builder = builder.bcc(Mailbox::new(None, parse_address(bcc, "BCC")?));
    }

    builder
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}

fn parse_address(value: &str, label: &str) -> Result<Address, MailError> {
    value
        .trim()
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("{label} {value}: {e}")))
}

fn split_addresses(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
