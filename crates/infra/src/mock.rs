//! # テスト用モック
//!
//! ユースケーステストで使用するモック実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailflow-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 永続化はインメモリ実装（[`InMemoryKvStore`](crate::kv::InMemoryKvStore)）で代用できるため、
//! ここでは外部送信と障害注入のためのモックのみを提供する。

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use mailflow_domain::{
    email::{EmailMessage, MailError},
    smtp_config::SmtpConfig,
};

use crate::{
    error::InfraError,
    kv::{InMemoryKvStore, KvStore},
    mail::MailSender,
};

// ===== MockMailSender =====

/// 送信したメッセージを記録するモック
///
/// `fail_for` で指定した宛先への送信は `MailError::Transport` で失敗する。
#[derive(Clone, Default)]
pub struct MockMailSender {
    sent:        Arc<Mutex<Vec<EmailMessage>>>,
    failing_to:  Arc<Mutex<HashSet<String>>>,
    fail_always: Arc<Mutex<bool>>,
}

impl MockMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, to: impl Into<String>) {
        self.failing_to.lock().unwrap().insert(to.into());
    }

    /// すべての送信を失敗させる
    pub fn fail_all(&self) {
        *self.fail_always.lock().unwrap() = true;
    }

    /// 送信に成功したメッセージの一覧
    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for MockMailSender {
    async fn send(&self, _config: &SmtpConfig, message: &EmailMessage) -> Result<(), MailError> {
        if *self.fail_always.lock().unwrap() || self.failing_to.lock().unwrap().contains(&message.to)
        {
            return Err(MailError::Transport(format!(
                "connection refused: {}",
                message.to
            )));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ===== FailingKvStore =====

/// すべての操作が失敗する KV ストア
///
/// ストア障害時にユースケースが内部エラーを返すこと、
/// またはエラーを呼び出し元に見せないことの確認に使う。
#[derive(Clone, Default)]
pub struct FailingKvStore;

impl FailingKvStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, InfraError> {
        Err(InfraError::unexpected("KV ストアに接続できません"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), InfraError> {
        Err(InfraError::unexpected("KV ストアに接続できません"))
    }

    async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<(String, String)>, InfraError> {
        Err(InfraError::unexpected("KV ストアに接続できません"))
    }

    async fn ping(&self) -> Result<(), InfraError> {
        Err(InfraError::unexpected("KV ストアに接続できません"))
    }
}

// ===== FaultyKvStore =====

/// 遅延・部分障害を注入できるインメモリ KV ストア
///
/// - `delay_get`: `get` の応答を指定時間だけ遅らせる
/// - `fail_set_with_prefix`: 指定したプレフィックスのキーへの `set` を失敗させる
///
/// clone したインスタンスは同じデータと注入設定を共有する。
#[derive(Clone, Default)]
pub struct FaultyKvStore {
    inner:                Arc<InMemoryKvStore>,
    get_delay:            Arc<Mutex<Option<Duration>>>,
    failing_set_prefixes: Arc<Mutex<Vec<String>>>,
}

impl FaultyKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get` を指定時間だけ遅らせる
    pub fn delay_get(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    /// 指定したプレフィックスのキーへの書き込みを失敗させる
    pub fn fail_set_with_prefix(&self, prefix: impl Into<String>) {
        self.failing_set_prefixes.lock().unwrap().push(prefix.into());
    }

    /// 注入した遅延と障害をすべて解除する
    pub fn recover(&self) {
        *self.get_delay.lock().unwrap() = None;
        self.failing_set_prefixes.lock().unwrap().clear();
    }
}

#[async_trait]
impl KvStore for FaultyKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let failing = self
            .failing_set_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if failing {
            return Err(InfraError::unexpected(format!("書き込みに失敗: {key}")));
        }
        self.inner.set(key, value).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, InfraError> {
        self.inner.scan_prefix(prefix).await
    }

    async fn ping(&self) -> Result<(), InfraError> {
        self.inner.ping().await
    }
}
