//! # Mailflow インフラ層
//!
//! 外部システム（KV ストア、SMTP サーバー）との接続・通信を担当する。
//!
//! ## 設計方針
//!
//! ドメイン層のエンティティを永続化・送信するための具体的な実装を提供する。
//! 外部システムの詳細をカプセル化し、ユースケース層はトレイト経由でのみ利用する。
//!
//! ## 責務
//!
//! - **KV ストア**: [`kv::KvStore`] トレイトと Redis / インメモリ実装
//! - **リポジトリ**: KV ストア上のキー設計（`template:{name}` など）と JSON 変換
//! - **メール送信**: lettre による SMTP 送信（[`mail::MailSender`]）
//!
//! ## 依存関係
//!
//! ```text
//! campaign-service → infra → domain
//! ```
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use mailflow_infra::{kv::RedisKvStore, repository::KvTemplateRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RedisKvStore::new("redis://localhost:6379").await?);
//!     let templates = KvTemplateRepository::new(store);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod kv;
pub mod mail;
pub mod repository;

#[cfg(feature = "test-utils")]
pub mod mock;

pub use error::{InfraError, InfraErrorKind};
pub use kv::KvStore;
pub use mail::MailSender;
