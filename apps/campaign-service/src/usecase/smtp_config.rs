//! # SMTP 設定ユースケース
//!
//! 永続化された SMTP 設定と環境変数の既定値を統合する。
//!
//! - 保存時: ホスト名・ポート・ユーザー名・パスワードは必須
//! - 読み込み時: 永続化された値を環境変数の既定値に重ねる（永続化側が優先）
//! - 表示用の読み込みではパスワードをマスクする。生の資格情報は送信処理にのみ渡す

use std::sync::Arc;

use mailflow_domain::{
    clock::Clock,
    smtp_config::{MaskedSmtpConfig, SmtpConfig, SmtpConfigDraft, SmtpFallback},
};
use mailflow_infra::repository::SmtpConfigRepository;
use mailflow_shared::{event_log::event, log_business_event};

use crate::error::CampaignServiceError;

/// 送信に使う SMTP 設定
#[derive(Debug, Clone)]
pub struct ResolvedSmtpConfig {
    pub config:     SmtpConfig,
    /// ホスト名・ユーザー名・パスワードがすべて揃っているか
    pub configured: bool,
}

/// 表示用の SMTP 設定
#[derive(Debug, Clone)]
pub struct SmtpConfigView {
    pub config:     MaskedSmtpConfig,
    pub configured: bool,
}

/// SMTP 設定ユースケース
pub struct SmtpConfigUseCaseImpl {
    smtp_config_repository: Arc<dyn SmtpConfigRepository>,
    fallback: SmtpFallback,
    clock: Arc<dyn Clock>,
}

impl SmtpConfigUseCaseImpl {
    pub fn new(
        smtp_config_repository: Arc<dyn SmtpConfigRepository>,
        fallback: SmtpFallback,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            smtp_config_repository,
            fallback,
            clock,
        }
    }

    /// SMTP 設定を保存する
    #[tracing::instrument(skip_all, fields(host = %draft.hostname))]
    pub async fn save(&self, draft: SmtpConfigDraft) -> Result<SmtpConfig, CampaignServiceError> {
        let config = draft.validate(&self.fallback, self.clock.now())?;

        self.smtp_config_repository.save(&config).await?;

        log_business_event!(
            event.category = event::category::SETTINGS,
            event.action = event::action::SMTP_CONFIG_SAVED,
            event.entity_type = event::entity_type::SMTP_CONFIG,
            event.result = event::result::SUCCESS,
            smtp.host = %config.hostname,
            smtp.port = config.port,
            "SMTP 設定を保存"
        );

        Ok(config)
    }

    /// 送信に使う設定を読み込む
    ///
    /// 永続化された設定も環境変数の既定値も無い場合はゼロ値・未構成を返す。
    pub async fn load(&self) -> Result<ResolvedSmtpConfig, CampaignServiceError> {
        let persisted = self.smtp_config_repository.find().await?;

        Ok(match SmtpConfig::resolve(persisted, &self.fallback) {
            Some(config) => ResolvedSmtpConfig {
                configured: config.is_configured(),
                config,
            },
            None => ResolvedSmtpConfig {
                config:     SmtpConfig::default(),
                configured: false,
            },
        })
    }

    /// 表示用に資格情報をマスクした設定を読み込む
    pub async fn load_for_display(&self) -> Result<SmtpConfigView, CampaignServiceError> {
        let resolved = self.load().await?;
        Ok(SmtpConfigView {
            config:     resolved.config.masked(),
            configured: resolved.configured,
        })
    }
}
