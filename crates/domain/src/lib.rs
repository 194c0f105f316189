//! # Mailflow ドメイン層
//!
//! メールキャンペーン配信・トラッキングの中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: キーを持つ永続オブジェクト（Template, Campaign, CampaignRecipient）
//! - **値オブジェクト**: 生成時に検証される不変オブジェクト（TemplateName, TrackingToken, Rate）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! campaign-service → infra → domain
//!          ↘                   ↑
//!            ──────────────────┘
//! ```
//!
//! ドメイン層はインフラ層（KV ストア、SMTP）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`template`] - メールテンプレートと `{{name}}` 差し込み
//! - [`smtp_config`] - SMTP 接続設定（資格情報のマスク表示を含む）
//! - [`campaign`] - キャンペーンと受信者ごとの配信状態
//! - [`delivery_log`] - 送信試行の監査ログ
//! - [`tracking`] - 開封・クリック計測用の不透明トークン
//! - [`analytics`] - 開封率・クリック率の集計
//! - [`email`] - 送信用メールメッセージ
//!
//! ## 使用例
//!
//! ```rust
//! use mailflow_domain::DomainError;
//!
//! let error = DomainError::NotFound {
//!     entity_type: "Template",
//!     id:          "welcome".to_string(),
//! };
//! assert_eq!(error.to_string(), "Template が見つかりません: welcome");
//! ```

#[macro_use]
mod macros;

pub mod analytics;
pub mod campaign;
pub mod clock;
pub mod delivery_log;
pub mod email;
pub mod error;
pub mod smtp_config;
pub mod template;
pub mod tracking;

pub use error::DomainError;
