//! # 開封・クリック計測ユースケース
//!
//! トラッキングトークンの発行と、開封ピクセル・クリックリダイレクトの処理を担当する。
//!
//! ## 設計方針
//!
//! - **呼び出し元にエラーを見せない**: メールクライアントには常にピクセル / リダイレクトを返す。
//!   状態更新の失敗はログにのみ出力する
//! - **冪等**: 受信者の `opened` / `clicked` が false → true に遷移したときだけカウンタを加算する
//! - **タイムアウト**: 状態更新は別タスクで実行し、一定時間で待つのをやめる。
//!   タスクはそのまま完了まで実行される
//! - **直列化**: カウンタの read-modify-write はキャンペーン単位のロック内で行う

use std::{sync::Arc, time::Duration};

use mailflow_domain::{
    campaign::CampaignName,
    clock::Clock,
    tracking::{TrackingTarget, TrackingToken},
};
use mailflow_infra::repository::{
    CampaignRecipientRepository,
    CampaignRepository,
    TrackingTokenRepository,
};
use mailflow_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};
use url::Url;

use super::KeyedLocks;
use crate::error::CampaignServiceError;

/// 計測するイベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackingEvent {
    Open,
    Click,
}

/// 開封・クリック計測サービス
#[derive(Clone)]
pub struct TrackingService {
    token_repository: Arc<dyn TrackingTokenRepository>,
    recipient_repository: Arc<dyn CampaignRecipientRepository>,
    campaign_repository: Arc<dyn CampaignRepository>,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    default_redirect_url: Arc<str>,
    write_timeout: Duration,
}

impl TrackingService {
    pub fn new(
        token_repository: Arc<dyn TrackingTokenRepository>,
        recipient_repository: Arc<dyn CampaignRecipientRepository>,
        campaign_repository: Arc<dyn CampaignRepository>,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        default_redirect_url: &str,
        write_timeout: Duration,
    ) -> Self {
        Self {
            token_repository,
            recipient_repository,
            campaign_repository,
            locks,
            clock,
            default_redirect_url: Arc::from(default_redirect_url),
            write_timeout,
        }
    }

    /// 受信者のトラッキングトークンを発行する
    pub async fn mint_token(
        &self,
        campaign_name: &CampaignName,
        email: &str,
    ) -> Result<TrackingToken, CampaignServiceError> {
        let token = TrackingToken::generate();
        let target = TrackingTarget {
            campaign_name: campaign_name.clone(),
            email:         email.to_string(),
        };
        self.token_repository.save(&token, &target).await?;
        Ok(token)
    }

    /// 開封を記録する
    ///
    /// トークンが解決できない場合や記録に失敗した場合も何も返さない（ピクセルは常に返す）。
    #[tracing::instrument(skip_all)]
    pub async fn handle_open(&self, token: &str) {
        self.record_with_timeout(TrackingToken::from_string(token), TrackingEvent::Open)
            .await;
    }

    /// クリックを記録し、リダイレクト先を返す
    ///
    /// `destination` が絶対 URL（http / https）でなければ既定のリダイレクト先を返す。
    #[tracing::instrument(skip_all)]
    pub async fn handle_click(&self, token: &str, destination: Option<&str>) -> String {
        self.record_with_timeout(TrackingToken::from_string(token), TrackingEvent::Click)
            .await;
        self.redirect_target(destination)
    }

    /// リダイレクト先を決める
    ///
    /// 返す URL は正規化済み（パーセントエンコード済み）で、そのまま `Location` ヘッダに使える。
    pub fn redirect_target(&self, destination: Option<&str>) -> String {
        destination
            .and_then(|url| Url::parse(url.trim()).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .map_or_else(|| self.default_redirect_url.to_string(), String::from)
    }

    async fn record_with_timeout(&self, token: TrackingToken, tracking_event: TrackingEvent) {
        let this = self.clone();
        let handle = tokio::spawn(async move { this.record(token, tracking_event).await });

        // タイムアウト時は JoinHandle を drop するだけで、タスクは実行を続ける
        match tokio::time::timeout(self.write_timeout, handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!(
                error.category = category::INFRASTRUCTURE,
                error.kind = kind::TRACKING,
                error = %e,
                ?tracking_event,
                "トラッキングの記録に失敗"
            ),
            Ok(Err(e)) => tracing::error!(
                error.category = category::INFRASTRUCTURE,
                error.kind = kind::TRACKING,
                error = %e,
                ?tracking_event,
                "トラッキングの記録タスクが異常終了"
            ),
            Err(_) => tracing::warn!(
                ?tracking_event,
                timeout_ms = self.write_timeout.as_millis() as u64,
                "トラッキングの記録がタイムアウト（バックグラウンドで継続）"
            ),
        }
    }

    async fn record(
        &self,
        token: TrackingToken,
        tracking_event: TrackingEvent,
    ) -> Result<(), CampaignServiceError> {
        let Some(target) = self.token_repository.find(&token).await? else {
            tracing::debug!(%token, "未知のトラッキングトークン");
            return Ok(());
        };

        let _guard = self.locks.lock(target.campaign_name.as_str()).await;

        let Some(mut recipient) = self
            .recipient_repository
            .find(&target.campaign_name, &target.email)
            .await?
        else {
            return Ok(());
        };

        let original = recipient.clone();
        let now = self.clock.now();
        let transitioned = match tracking_event {
            TrackingEvent::Open => recipient.mark_opened(now),
            TrackingEvent::Click => recipient.mark_clicked(now),
        };
        if !transitioned {
            return Ok(());
        }
        self.recipient_repository.save(&recipient).await?;

        if let Err(e) = self
            .increment_counter(&target.campaign_name, tracking_event)
            .await
        {
            // 受信者のフラグとキャンペーンのカウンタを一致させるため、受信者を元に戻す
            if let Err(restore_error) = self.recipient_repository.save(&original).await {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::TRACKING,
                    error = %restore_error,
                    campaign = %target.campaign_name,
                    ?tracking_event,
                    "受信者は計測済みのままキャンペーンのカウンタが加算されていない"
                );
            }
            return Err(e);
        }

        let action = match tracking_event {
            TrackingEvent::Open => event::action::EMAIL_OPENED,
            TrackingEvent::Click => event::action::LINK_CLICKED,
        };
        log_business_event!(
            event.category = event::category::TRACKING,
            event.action = action,
            event.entity_type = event::entity_type::CAMPAIGN_RECIPIENT,
            event.entity_id = %target.campaign_name,
            event.result = event::result::SUCCESS,
            "トラッキングを記録"
        );

        Ok(())
    }

    async fn increment_counter(
        &self,
        campaign_name: &CampaignName,
        tracking_event: TrackingEvent,
    ) -> Result<(), CampaignServiceError> {
        let Some(campaign) = self.campaign_repository.find_by_name(campaign_name).await? else {
            return Ok(());
        };
        let campaign = match tracking_event {
            TrackingEvent::Open => campaign.record_open(),
            TrackingEvent::Click => campaign.record_click(),
        };
        self.campaign_repository.save(&campaign).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use mailflow_domain::{
        campaign::{Campaign, CampaignRecipient, Recipient, RecipientStatus},
        clock::FixedClock,
        template::TemplateName,
    };
    use mailflow_infra::{
        kv::{InMemoryKvStore, KvStore},
        mock::{FailingKvStore, FaultyKvStore},
        repository::{
            KvCampaignRecipientRepository,
            KvCampaignRepository,
            KvTrackingTokenRepository,
        },
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    struct Fixture {
        sut:        TrackingService,
        campaigns:  KvCampaignRepository,
        recipients: KvCampaignRecipientRepository,
    }

    fn fixture_with_store(store: Arc<dyn KvStore>) -> Fixture {
        fixture_with(store, Duration::from_secs(2))
    }

    fn fixture_with(store: Arc<dyn KvStore>, write_timeout: Duration) -> Fixture {
        let campaigns = KvCampaignRepository::new(store.clone());
        let recipients = KvCampaignRecipientRepository::new(store.clone());
        let sut = TrackingService::new(
            Arc::new(KvTrackingTokenRepository::new(store)),
            Arc::new(recipients.clone()),
            Arc::new(campaigns.clone()),
            Arc::new(KeyedLocks::new()),
            Arc::new(FixedClock::new(
                DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            )),
            "https://magrstore.com",
            write_timeout,
        );
        Fixture {
            sut,
            campaigns,
            recipients,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_store(Arc::new(InMemoryKvStore::new()))
    }

    /// キャンペーンと受信者を登録し、受信者ごとのトークンを返す
    async fn seed(fixture: &Fixture, emails: &[String]) -> Vec<TrackingToken> {
        let name = CampaignName::new("spring-sale").unwrap();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let campaign = Campaign::start(
            name.clone(),
            TemplateName::new("greeting").unwrap(),
            emails.len(),
            None,
            now,
        )
        .unwrap();
        fixture.campaigns.save(&campaign).await.unwrap();

        let mut tokens = Vec::new();
        for email in emails {
            let token = fixture.sut.mint_token(&name, email).await.unwrap();
            let recipient = CampaignRecipient::new(
                name.clone(),
                Recipient::new(email.clone(), None),
                RecipientStatus::Sent,
                token.clone(),
                None,
                now,
            );
            fixture.recipients.save(&recipient).await.unwrap();
            tokens.push(token);
        }
        tokens
    }

    async fn campaign(fixture: &Fixture) -> Campaign {
        fixture
            .campaigns
            .find_by_name(&CampaignName::new("spring-sale").unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_同じトークンで2回開封しても開封数は1だけ増える() {
        let fixture = fixture();
        let tokens = seed(&fixture, &["a@x.com".to_string()]).await;

        fixture.sut.handle_open(tokens[0].as_str()).await;
        fixture.sut.handle_open(tokens[0].as_str()).await;

        assert_eq!(campaign(&fixture).await.opened_count(), 1);
        let recipient = fixture
            .recipients
            .find(&CampaignName::new("spring-sale").unwrap(), "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(recipient.opened());
        assert!(recipient.opened_at().is_some());
    }

    #[tokio::test]
    async fn test_url無しのクリックは既定のリダイレクト先を返しクリック済みにする() {
        let fixture = fixture();
        let tokens = seed(&fixture, &["a@x.com".to_string()]).await;

        let target = fixture.sut.handle_click(tokens[0].as_str(), None).await;

        assert_eq!(target, "https://magrstore.com");
        assert_eq!(campaign(&fixture).await.clicked_count(), 1);
    }

    #[tokio::test]
    async fn test_未知のトークンは状態を変更しない() {
        let fixture = fixture();
        seed(&fixture, &["a@x.com".to_string()]).await;
        let before = campaign(&fixture).await;

        fixture.sut.handle_open("unknown-token").await;
        let target = fixture
            .sut
            .handle_click("unknown-token", Some("https://example.com/a"))
            .await;

        assert_eq!(target, "https://example.com/a");
        assert_eq!(campaign(&fixture).await, before);
    }

    #[tokio::test]
    async fn test_同じキャンペーンの100件の同時開封で開封数が100になる() {
        let fixture = fixture();
        let emails: Vec<String> = (0..100).map(|i| format!("user{i}@x.com")).collect();
        let tokens = seed(&fixture, &emails).await;

        let handles: Vec<_> = tokens
            .into_iter()
            .map(|token| {
                let sut = fixture.sut.clone();
                tokio::spawn(async move { sut.handle_open(token.as_str()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(campaign(&fixture).await.opened_count(), 100);
    }

    #[tokio::test]
    async fn test_ストア障害でもリダイレクト先を返す() {
        let fixture = fixture_with_store(Arc::new(FailingKvStore::new()));

        fixture.sut.handle_open("any").await;
        let target = fixture
            .sut
            .handle_click("any", Some("https://example.com/sale"))
            .await;

        assert_eq!(target, "https://example.com/sale");
    }

    #[tokio::test]
    async fn test_書き込みが遅くてもタイムアウトで応答しバックグラウンドで記録を完了する() {
        let store = Arc::new(FaultyKvStore::new());
        let fixture = fixture_with(store.clone(), Duration::from_millis(50));
        let tokens = seed(&fixture, &["a@x.com".to_string()]).await;
        store.delay_get(Duration::from_millis(500));

        let started = std::time::Instant::now();
        let target = fixture
            .sut
            .handle_click(tokens[0].as_str(), Some("https://example.com/sale"))
            .await;
        let elapsed = started.elapsed();
        store.recover();

        assert_eq!(target, "https://example.com/sale");
        assert!(elapsed < Duration::from_millis(400), "elapsed: {elapsed:?}");

        let mut clicked = 0;
        for _ in 0..100 {
            clicked = campaign(&fixture).await.clicked_count();
            if clicked == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(clicked, 1);
    }

    #[tokio::test]
    async fn test_カウンタの保存に失敗したら受信者を元に戻し次の開封で記録できる() {
        let store = Arc::new(FaultyKvStore::new());
        let fixture = fixture_with_store(store.clone());
        let tokens = seed(&fixture, &["a@x.com".to_string()]).await;
        let name = CampaignName::new("spring-sale").unwrap();

        store.fail_set_with_prefix("campaign:");
        fixture.sut.handle_open(tokens[0].as_str()).await;
        store.recover();

        let recipient = fixture.recipients.find(&name, "a@x.com").await.unwrap().unwrap();
        assert!(!recipient.opened());
        assert_eq!(campaign(&fixture).await.opened_count(), 0);

        fixture.sut.handle_open(tokens[0].as_str()).await;

        let recipient = fixture.recipients.find(&name, "a@x.com").await.unwrap().unwrap();
        assert!(recipient.opened());
        assert_eq!(campaign(&fixture).await.opened_count(), 1);
    }

    #[rstest]
    #[case(Some("https://example.com/a?b=c"), "https://example.com/a?b=c")]
    #[case(Some("http://example.com"), "http://example.com/")]
    #[case(Some(" https://example.com/ä "), "https://example.com/%C3%A4")]
    #[case(Some(""), "https://magrstore.com")]
    #[case(Some("javascript:alert(1)"), "https://magrstore.com")]
    #[case(Some("//evil.example.com"), "https://magrstore.com")]
    #[case(Some("/relative"), "https://magrstore.com")]
    #[case(None, "https://magrstore.com")]
    fn test_リダイレクト先はhttpの絶対urlだけを許可する(
        #[case] destination: Option<&str>,
        #[case] expected: &str,
    ) {
        let fixture = fixture();

        assert_eq!(fixture.sut.redirect_target(destination), expected);
    }
}
