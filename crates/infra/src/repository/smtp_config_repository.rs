//! # SmtpConfigRepository
//!
//! 単一レコードの SMTP 設定を `smtp-config` キーに保存する。

use std::sync::Arc;

use async_trait::async_trait;
use mailflow_domain::smtp_config::SmtpConfig;

use crate::{
    error::InfraError,
    kv::{KvStore, get_json, set_json},
};

const KEY: &str = "smtp-config";

/// SMTP 設定リポジトリトレイト
#[async_trait]
pub trait SmtpConfigRepository: Send + Sync {
    /// 設定を保存する（既存の設定は置き換える）
    async fn save(&self, config: &SmtpConfig) -> Result<(), InfraError>;

    /// 保存済みの設定を取得する
    async fn find(&self) -> Result<Option<SmtpConfig>, InfraError>;
}

/// KV ストア実装の SmtpConfigRepository
#[derive(Clone)]
pub struct KvSmtpConfigRepository {
    store: Arc<dyn KvStore>,
}

impl KvSmtpConfigRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SmtpConfigRepository for KvSmtpConfigRepository {
    async fn save(&self, config: &SmtpConfig) -> Result<(), InfraError> {
        set_json(self.store.as_ref(), KEY, config).await
    }

    async fn find(&self) -> Result<Option<SmtpConfig>, InfraError> {
        get_json(self.store.as_ref(), KEY).await
    }
}
