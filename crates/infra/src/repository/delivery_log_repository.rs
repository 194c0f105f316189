//! # DeliveryLogRepository
//!
//! 配信ログの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **追記専用**: 送信成功・失敗・未構成のいずれも 1 件ずつ記録し、更新しない
//! - **キー**: `delivery-log:{ナノ秒タイムスタンプ}:{宛先}`
//!
//! 同一宛先・同一ナノ秒の書き込みはキーが衝突し、後勝ちになる。

use std::sync::Arc;

use async_trait::async_trait;
use mailflow_domain::delivery_log::DeliveryLogEntry;

use crate::{
    error::InfraError,
    kv::{KvStore, scan_json, set_json},
};

const KEY_PREFIX: &str = "delivery-log:";

fn entry_key(entry: &DeliveryLogEntry) -> String {
    // 2262 年以降はナノ秒表現が i64 を超えるためマイクロ秒 * 1000 で代替する
    let timestamp = entry
        .sent_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| entry.sent_at.timestamp_micros().saturating_mul(1000));
    format!("{KEY_PREFIX}{timestamp}:{}", entry.to)
}

/// 配信ログリポジトリトレイト
#[async_trait]
pub trait DeliveryLogRepository: Send + Sync {
    /// 配信ログを追記する
    async fn append(&self, entry: &DeliveryLogEntry) -> Result<(), InfraError>;

    /// すべての配信ログを送信日時の昇順で取得する
    async fn find_all(&self) -> Result<Vec<DeliveryLogEntry>, InfraError>;
}

/// KV ストア実装の DeliveryLogRepository
#[derive(Clone)]
pub struct KvDeliveryLogRepository {
    store: Arc<dyn KvStore>,
}

impl KvDeliveryLogRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryLogRepository for KvDeliveryLogRepository {
    async fn append(&self, entry: &DeliveryLogEntry) -> Result<(), InfraError> {
        set_json(self.store.as_ref(), &entry_key(entry), entry).await
    }

    async fn find_all(&self) -> Result<Vec<DeliveryLogEntry>, InfraError> {
        let mut entries: Vec<DeliveryLogEntry> =
            scan_json(self.store.as_ref(), KEY_PREFIX).await?;
        entries.sort_by_key(|e| e.sent_at);
        Ok(entries)
    }
}
