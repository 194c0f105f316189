//! # リポジトリ実装
//!
//! ドメインエンティティを KV ストアに保存・取得するリポジトリを提供する。
//!
//! ## 設計方針
//!
//! - **キー設計の集約**: KV キーの組み立てはこのモジュール内に閉じる
//! - **ストア抽象化**: すべて `Arc<dyn KvStore>` の上に実装し、Redis / インメモリを問わない
//! - **テスタビリティ**: トレイト経由でモック可能な設計
//!
//! ## キー一覧
//!
//! | キー | 値 |
//! |------|----|
//! | `template:{name}` | [`Template`](mailflow_domain::template::Template) |
//! | `smtp-config` | [`SmtpConfig`](mailflow_domain::smtp_config::SmtpConfig) |
//! | `campaign:{name}` | [`Campaign`](mailflow_domain::campaign::Campaign) |
//! | `campaign-recipient:{campaign}:{email}` | [`CampaignRecipient`](mailflow_domain::campaign::CampaignRecipient) |
//! | `delivery-log:{timestamp}:{to}` | [`DeliveryLogEntry`](mailflow_domain::delivery_log::DeliveryLogEntry) |
//! | `tracking-token:{token}` | [`TrackingTarget`](mailflow_domain::tracking::TrackingTarget) |

pub mod campaign_recipient_repository;
pub mod campaign_repository;
pub mod delivery_log_repository;
pub mod smtp_config_repository;
pub mod template_repository;
pub mod tracking_token_repository;

pub use campaign_recipient_repository::{
    CampaignRecipientRepository,
    KvCampaignRecipientRepository,
};
pub use campaign_repository::{CampaignRepository, KvCampaignRepository};
pub use delivery_log_repository::{DeliveryLogRepository, KvDeliveryLogRepository};
pub use smtp_config_repository::{KvSmtpConfigRepository, SmtpConfigRepository};
pub use template_repository::{KvTemplateRepository, TemplateRepository};
pub use tracking_token_repository::{KvTrackingTokenRepository, TrackingTokenRepository};
