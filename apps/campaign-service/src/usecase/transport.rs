//! # メール送信（MailTransport）
//!
//! SMTP 設定の解決 → 送信 → 配信ログ記録を 1 通分まとめて行う。
//!
//! ## 設計方針
//!
//! - **エラーを返さない**: 結果は [`DeliveryOutcome`] で表し、呼び出し元に例外を伝播しない
//! - **未構成はソフトな失敗**: SMTP が未構成ならネットワーク I/O を行わず `NotConfigured` を返す
//! - **ログ記録**: 送信成功・失敗・未構成のいずれも配信ログに 1 件追記する。
//!   ログの書き込み失敗は結果に影響しない

use std::sync::Arc;

use mailflow_domain::{
    clock::Clock,
    delivery_log::{DeliveryLogEntry, DeliveryStatus},
    email::EmailMessage,
};
use mailflow_infra::{MailSender, repository::DeliveryLogRepository};
use mailflow_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};

use super::SmtpConfigUseCaseImpl;

/// 1 通分の送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// SMTP サーバーが受理した
    Sent,
    /// SMTP が未構成のため送信しなかった
    NotConfigured,
    /// 設定の読み込み、接続、認証、送信のいずれかで失敗した
    TransportFailed(String),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// 失敗理由（成功時は `None`）
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Sent => None,
            Self::NotConfigured => Some("SMTP が設定されていません".to_string()),
            Self::TransportFailed(detail) => Some(detail.clone()),
        }
    }

    fn delivery_status(&self) -> DeliveryStatus {
        match self {
            Self::Sent => DeliveryStatus::Sent,
            Self::NotConfigured => DeliveryStatus::NotConfigured,
            Self::TransportFailed(_) => DeliveryStatus::Failed,
        }
    }
}

/// メール送信
pub struct MailTransport {
    smtp_config: Arc<SmtpConfigUseCaseImpl>,
    sender: Arc<dyn MailSender>,
    delivery_log_repository: Arc<dyn DeliveryLogRepository>,
    clock: Arc<dyn Clock>,
}

impl MailTransport {
    pub fn new(
        smtp_config: Arc<SmtpConfigUseCaseImpl>,
        sender: Arc<dyn MailSender>,
        delivery_log_repository: Arc<dyn DeliveryLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            smtp_config,
            sender,
            delivery_log_repository,
            clock,
        }
    }

    /// メールを 1 通送信する
    #[tracing::instrument(skip_all, fields(to = %message.to))]
    pub async fn send(&self, message: &EmailMessage) -> DeliveryOutcome {
        let outcome = self.deliver(message).await;

        match &outcome {
            DeliveryOutcome::Sent => log_business_event!(
                event.category = event::category::DELIVERY,
                event.action = event::action::EMAIL_SENT,
                event.entity_type = event::entity_type::DELIVERY_LOG,
                event.result = event::result::SUCCESS,
                email.recipient = %message.to,
                "メール送信成功"
            ),
            DeliveryOutcome::NotConfigured => log_business_event!(
                event.category = event::category::DELIVERY,
                event.action = event::action::EMAIL_NOT_CONFIGURED,
                event.entity_type = event::entity_type::DELIVERY_LOG,
                event.result = event::result::SKIPPED,
                email.recipient = %message.to,
                "SMTP 未構成のため送信をスキップ"
            ),
            DeliveryOutcome::TransportFailed(detail) => log_business_event!(
                event.category = event::category::DELIVERY,
                event.action = event::action::EMAIL_FAILED,
                event.entity_type = event::entity_type::DELIVERY_LOG,
                event.result = event::result::FAILURE,
                email.recipient = %message.to,
                error = %detail,
                "メール送信失敗"
            ),
        }

        let entry = DeliveryLogEntry::record(
            message,
            outcome.delivery_status(),
            outcome.error_message(),
            self.clock.now(),
        );
        if let Err(e) = self.delivery_log_repository.append(&entry).await {
            tracing::error!(
                error.category = category::INFRASTRUCTURE,
                error.kind = kind::STORAGE,
                error = %e,
                "配信ログの記録に失敗"
            );
        }

        outcome
    }

    async fn deliver(&self, message: &EmailMessage) -> DeliveryOutcome {
        let resolved = match self.smtp_config.load().await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::STORAGE,
                    error = %e,
                    "SMTP 設定の読み込みに失敗"
                );
                return DeliveryOutcome::TransportFailed("SMTP 設定を読み込めませんでした".to_string());
            }
        };

        if !resolved.configured {
            return DeliveryOutcome::NotConfigured;
        }

        match self.sender.send(&resolved.config, message).await {
            Ok(()) => DeliveryOutcome::Sent,
            Err(e) => {
                tracing::warn!(
                    error.category = category::EXTERNAL_SERVICE,
                    error.kind = kind::SMTP,
                    error = %e,
                    "SMTP 送信に失敗"
                );
                DeliveryOutcome::TransportFailed(e.to_string())
            }
        }
    }
}
