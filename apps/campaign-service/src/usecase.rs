//! # ユースケース層
//!
//! キャンペーン配信サービスのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・メール送信・時計を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//! - **キャンペーン単位の直列化**: カウンタの read-modify-write は [`KeyedLocks`] で直列化し、
//!   送信処理と開封・クリック計測で同じロックを共有する
//!
//! ## モジュール構成
//!
//! - `template`: テンプレート管理
//! - `smtp_config`: SMTP 設定の保存と解決
//! - `transport`: 1 通分の送信と配信ログ記録
//! - `campaign`: キャンペーン送信
//! - `tracking`: 開封・クリック計測
//! - `analytics`: 配信分析
//! - `system_mail`: 単発送信・ウェルカムメール・テストメール

pub(crate) mod keyed_lock;
pub(crate) mod tracking_html;

pub mod analytics;
pub mod campaign;
pub mod smtp_config;
pub mod system_mail;
pub mod template;
pub mod tracking;
pub mod transport;

pub use analytics::{AnalyticsReport, AnalyticsUseCaseImpl};
pub use campaign::{CampaignDetail, CampaignSettings, CampaignUseCaseImpl, SendCampaignInput};
pub use keyed_lock::KeyedLocks;
pub use smtp_config::{ResolvedSmtpConfig, SmtpConfigUseCaseImpl, SmtpConfigView};
pub use system_mail::{SendEmailInput, SystemMailRenderer, SystemMailUseCaseImpl};
pub use template::{TemplateUseCaseImpl, UpsertTemplateInput};
pub use tracking::TrackingService;
pub use transport::{DeliveryOutcome, MailTransport};
