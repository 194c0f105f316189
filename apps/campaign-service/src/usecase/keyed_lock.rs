//! # キー単位の非同期ロック
//!
//! KV ストアには複数キーのトランザクションが無いため、キャンペーンのカウンタ更新
//! （read-modify-write）はプロセス内でキャンペーン名ごとに直列化する。
//! 送信処理とトラッキング処理は同じ [`KeyedLocks`] を共有する。
//!
//! 使われなくなったキーのエントリは次回のロック取得時に掃除する。
//! 複数プロセスで同じストアを共有する構成は直列化の対象外。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// キーごとの非同期ロックの集合
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// キーのロックを取得する
    ///
    /// 返されたガードを drop するとロックが解放される。
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // マップ以外から参照されていないエントリ（保持者・待機者なし）を削除する
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// 保持しているエントリ数
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
