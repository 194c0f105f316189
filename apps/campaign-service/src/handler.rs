//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケースに委譲

pub mod analytics;
pub mod campaign;
pub mod email;
pub mod health;
pub mod smtp_config;
pub mod template;
pub mod tracking;

pub use analytics::{AnalyticsState, get_analytics};
pub use campaign::{CampaignState, get_campaign, list_campaigns, send_campaign};
pub use email::{EmailState, send_email, send_welcome_email};
pub use health::{ReadinessState, health_check, readiness_check};
pub use smtp_config::{SmtpConfigState, get_smtp_config, save_smtp_config, test_smtp};
pub use template::{TemplateState, get_template, list_templates, save_template};
pub use tracking::{TrackingState, track_click, track_open};
