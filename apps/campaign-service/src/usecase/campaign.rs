//! # キャンペーン送信ユースケース
//!
//! テンプレートと受信者リストからキャンペーンを作成し、受信者ごとに差し込み・
//! トラッキング埋め込み・送信・結果記録を行う。
//!
//! ## 処理の流れ
//!
//! 1. 入力検証（キャンペーン名、受信者、テンプレートの存在、キャンペーン名の重複）。
//!    同じメールアドレスの受信者は最初の 1 件だけを残す
//! 2. `status=sending` のキャンペーンを保存
//! 3. 受信者ごとに並行して送信（同時実行数はセマフォで制限）
//! 4. 全受信者の結果が確定したら、キャンペーンロック内で送信数・失敗数を確定して完了にする
//!
//! 1 件の送信失敗はバッチを中断しない。失敗は `failed_count` に数えるだけで、エラーとしては返さない。

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use mailflow_domain::{
    campaign::{Campaign, CampaignName, CampaignRecipient, Recipient, RecipientStatus},
    clock::Clock,
    email::EmailMessage,
    template::{Template, TemplateName},
    tracking::TrackingToken,
};
use mailflow_infra::repository::{
    CampaignRecipientRepository,
    CampaignRepository,
    TemplateRepository,
};
use mailflow_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};
use tokio::{sync::Semaphore, task::JoinSet};

use super::{KeyedLocks, MailTransport, TrackingService, tracking_html::inject_tracking};
use crate::error::CampaignServiceError;

/// キャンペーン送信の入力
#[derive(Debug, Clone)]
pub struct SendCampaignInput {
    pub campaign_name: String,
    pub template_name: String,
    pub recipients:    Vec<Recipient>,
    pub scheduled_at:  Option<DateTime<Utc>>,
}

/// キャンペーンとその受信者一覧
#[derive(Debug, Clone)]
pub struct CampaignDetail {
    pub campaign:   Campaign,
    pub recipients: Vec<CampaignRecipient>,
}

/// 送信処理の設定
#[derive(Debug, Clone)]
pub struct CampaignSettings {
    /// 受信者ごとの送信の同時実行数
    pub concurrency:       usize,
    /// 開封ピクセル・クリックリンクのベース URL
    pub tracking_base_url: String,
}

/// 検証済みで送信を開始できる状態のキャンペーン
struct PreparedCampaign {
    campaign:   Campaign,
    template:   Arc<Template>,
    recipients: Vec<Recipient>,
}

/// キャンペーン送信ユースケース
///
/// 非同期送信ではバックグラウンドタスクへ移すため `Clone` を実装する。
#[derive(Clone)]
pub struct CampaignUseCaseImpl {
    campaign_repository: Arc<dyn CampaignRepository>,
    recipient_repository: Arc<dyn CampaignRecipientRepository>,
    template_repository: Arc<dyn TemplateRepository>,
    transport: Arc<MailTransport>,
    tracking: Arc<TrackingService>,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    settings: Arc<CampaignSettings>,
}

impl CampaignUseCaseImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        campaign_repository: Arc<dyn CampaignRepository>,
        recipient_repository: Arc<dyn CampaignRecipientRepository>,
        template_repository: Arc<dyn TemplateRepository>,
        transport: Arc<MailTransport>,
        tracking: Arc<TrackingService>,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        settings: CampaignSettings,
    ) -> Self {
        Self {
            campaign_repository,
            recipient_repository,
            template_repository,
            transport,
            tracking,
            locks,
            clock,
            settings: Arc::new(settings),
        }
    }

    /// キャンペーンを送信し、全受信者の結果が確定してから返す
    #[tracing::instrument(skip_all, fields(campaign = %input.campaign_name))]
    pub async fn send(&self, input: SendCampaignInput) -> Result<Campaign, CampaignServiceError> {
        let prepared = self.prepare(input).await?;
        self.dispatch(prepared).await
    }

    /// キャンペーンを作成し、送信はバックグラウンドで行う
    ///
    /// 返すキャンペーンは `status=sending` の状態。進捗は [`Self::get`] で確認する。
    #[tracing::instrument(skip_all, fields(campaign = %input.campaign_name))]
    pub async fn send_in_background(
        &self,
        input: SendCampaignInput,
    ) -> Result<Campaign, CampaignServiceError> {
        let prepared = self.prepare(input).await?;
        let campaign = prepared.campaign.clone();

        let this = self.clone();
        tokio::spawn(async move {
            let name = prepared.campaign.name().clone();
            if let Err(e) = this.dispatch(prepared).await {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::STORAGE,
                    error = %e,
                    campaign = %name,
                    "バックグラウンドのキャンペーン送信に失敗"
                );
            }
        });

        Ok(campaign)
    }

    /// キャンペーン一覧を取得する（順序は保証しない）
    pub async fn list(&self) -> Result<Vec<Campaign>, CampaignServiceError> {
        Ok(self.campaign_repository.find_all().await?)
    }

    /// キャンペーンと受信者一覧を取得する
    pub async fn get(&self, name: &str) -> Result<CampaignDetail, CampaignServiceError> {
        let not_found = || CampaignServiceError::NotFound("キャンペーンが見つかりません".to_string());
        let name = CampaignName::new(name).map_err(|_| not_found())?;

        let campaign = self
            .campaign_repository
            .find_by_name(&name)
            .await?
            .ok_or_else(not_found)?;
        let recipients = self.recipient_repository.find_by_campaign(&name).await?;

        Ok(CampaignDetail {
            campaign,
            recipients,
        })
    }

    /// 入力を検証し、`status=sending` のキャンペーンを保存する
    async fn prepare(
        &self,
        input: SendCampaignInput,
    ) -> Result<PreparedCampaign, CampaignServiceError> {
        let name = CampaignName::new(input.campaign_name)?;
        let template_name = TemplateName::new(input.template_name)?;
        if input.recipients.is_empty() {
            return Err(CampaignServiceError::Validation(
                "受信者を 1 件以上指定してください".to_string(),
            ));
        }
        if input.recipients.iter().any(|r| r.email.trim().is_empty()) {
            return Err(CampaignServiceError::Validation(
                "受信者のメールアドレスは必須です".to_string(),
            ));
        }
        let recipients = dedupe_recipients(input.recipients);

        let template = self
            .template_repository
            .find_by_name(&template_name)
            .await?
            .ok_or_else(|| CampaignServiceError::NotFound("テンプレートが見つかりません".to_string()))?;

        let now = self.clock.now();
        if let Some(scheduled_at) = input.scheduled_at
            && scheduled_at > now
        {
            tracing::warn!(
                %scheduled_at,
                "予約配信には対応していないため即時に送信する"
            );
        }

        let campaign = {
            let _guard = self.locks.lock(name.as_str()).await;
            if self.campaign_repository.find_by_name(&name).await?.is_some() {
                return Err(CampaignServiceError::Validation(format!(
                    "キャンペーン名 {name} は既に使用されています"
                )));
            }
            let campaign = Campaign::start(
                name,
                template_name,
                recipients.len(),
                input.scheduled_at,
                now,
            )?;
            self.campaign_repository.save(&campaign).await?;
            campaign
        };

        log_business_event!(
            event.category = event::category::CAMPAIGN,
            event.action = event::action::CAMPAIGN_STARTED,
            event.entity_type = event::entity_type::CAMPAIGN,
            event.entity_id = %campaign.name(),
            event.result = event::result::SUCCESS,
            campaign.recipient_count = campaign.recipient_count(),
            "キャンペーン送信を開始"
        );

        Ok(PreparedCampaign {
            campaign,
            template: Arc::new(template),
            recipients,
        })
    }

    /// 全受信者に送信し、結果を確定する
    async fn dispatch(&self, prepared: PreparedCampaign) -> Result<Campaign, CampaignServiceError> {
        let PreparedCampaign {
            campaign,
            template,
            recipients,
        } = prepared;
        let name = campaign.name().clone();

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut sent = 0u64;
        let mut failed = 0u64;

        for recipient in recipients {
            // セマフォは閉じないため取得失敗は起こらないが、起きた場合は失敗として数える
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                failed += 1;
                continue;
            };
            let this = self.clone();
            let name = name.clone();
            let template = template.clone();
            tasks.spawn(async move {
                let _permit = permit;
                this.deliver_one(&name, &template, recipient).await
            });
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(RecipientStatus::Sent) => sent += 1,
                Ok(RecipientStatus::Failed) => failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "受信者への送信タスクが異常終了");
                    failed += 1;
                }
            }
        }

        self.finalize(&name, sent, failed).await
    }

    /// 1 人の受信者に送信し、結果を受信者レコードとして保存する
    ///
    /// 失敗はエラーとして返さず、`RecipientStatus::Failed` として返す。
    async fn deliver_one(
        &self,
        campaign_name: &CampaignName,
        template: &Template,
        recipient: Recipient,
    ) -> RecipientStatus {
        let content = template.render_for(recipient.display_name());

        let (status, token, error) = match self
            .tracking
            .mint_token(campaign_name, &recipient.email)
            .await
        {
            Ok(token) => {
                let html = inject_tracking(&content.html, &self.settings.tracking_base_url, &token);
                let message = EmailMessage::new(recipient.email.clone(), content.subject, html);
                let outcome = self.transport.send(&message).await;
                let status = if outcome.is_sent() {
                    RecipientStatus::Sent
                } else {
                    RecipientStatus::Failed
                };
                (status, token, outcome.error_message())
            }
            Err(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::TRACKING,
                    error = %e,
                    "トラッキングトークンの発行に失敗"
                );
                (
                    RecipientStatus::Failed,
                    TrackingToken::generate(),
                    Some("トラッキングトークンの発行に失敗しました".to_string()),
                )
            }
        };

        let row = CampaignRecipient::new(
            campaign_name.clone(),
            recipient,
            status,
            token,
            error,
            self.clock.now(),
        );
        let _guard = self.locks.lock(campaign_name.as_str()).await;
        if let Err(e) = self.recipient_repository.save(&row).await {
            tracing::error!(
                error.category = category::INFRASTRUCTURE,
                error.kind = kind::STORAGE,
                error = %e,
                "受信者レコードの保存に失敗"
            );
        }

        status
    }

    /// 送信数・失敗数を確定してキャンペーンを完了にする
    ///
    /// 送信中に記録された開封数・クリック数を失わないよう、ロック内で再読み込みしてから更新する。
    async fn finalize(
        &self,
        name: &CampaignName,
        sent: u64,
        failed: u64,
    ) -> Result<Campaign, CampaignServiceError> {
        let _guard = self.locks.lock(name.as_str()).await;

        let campaign = self
            .campaign_repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| {
                CampaignServiceError::Internal(format!("送信中のキャンペーンが見つかりません: {name}"))
            })?;
        let campaign = campaign
            .complete(sent, failed, self.clock.now())
            .map_err(|e| CampaignServiceError::Internal(e.to_string()))?;
        self.campaign_repository.save(&campaign).await?;

        log_business_event!(
            event.category = event::category::CAMPAIGN,
            event.action = event::action::CAMPAIGN_COMPLETED,
            event.entity_type = event::entity_type::CAMPAIGN,
            event.entity_id = %name,
            event.result = event::result::SUCCESS,
            campaign.sent_count = sent,
            campaign.failed_count = failed,
            "キャンペーン送信が完了"
        );

        Ok(campaign)
    }
}

/// メールアドレスの前後の空白を除き、同じアドレスの受信者は最初の 1 件だけを残す
///
/// 受信者レコードのキーは (キャンペーン名, メールアドレス) のため、重複を残すと
/// 1 人に複数回送信され、送信結果が上書きされる。
fn dedupe_recipients(recipients: Vec<Recipient>) -> Vec<Recipient> {
    let requested = recipients.len();
    let mut seen = HashSet::with_capacity(requested);
    let unique: Vec<Recipient> = recipients
        .into_iter()
        .map(|r| Recipient::new(r.email.trim(), r.name))
        .filter(|r| seen.insert(r.email.clone()))
        .collect();

    if unique.len() < requested {
        tracing::info!(
            requested,
            unique = unique.len(),
            "重複した受信者を除外"
        );
    }
    unique
}
