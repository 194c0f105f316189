//! # メール送信
//!
//! SMTP サーバーへのメール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`MailSender`] でメール送信を抽象化し、テストではモックに差し替える
//! - **設定は送信ごとに受け取る**: SMTP 設定は実行中に更新されるため、
//!   送信側は接続を保持せず、呼び出しごとに渡された設定で接続する

mod smtp;

use async_trait::async_trait;
use mailflow_domain::{
    email::{EmailMessage, MailError},
    smtp_config::SmtpConfig,
};
pub use smtp::SmtpMailSender;

/// メール送信トレイト
#[async_trait]
pub trait MailSender: Send + Sync {
    /// 指定した SMTP 設定でメールを 1 通送信する
    async fn send(&self, config: &SmtpConfig, message: &EmailMessage) -> Result<(), MailError>;
}
