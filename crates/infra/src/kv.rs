//! # KV ストア
//!
//! 全リポジトリが共有する永続化の抽象。`get` / `set` / プレフィックス走査のみを提供し、
//! 複数キーにまたがるトランザクションは持たない。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: ユースケースには `Arc<dyn KvStore>` を注入する
//! - **2 つの実装**: Redis（本番）、インメモリ（開発・テスト）
//! - **値は JSON 文字列**: 型付きの読み書きは [`get_json`] / [`set_json`] / [`scan_json`] を使う
//!
//! 同一キーへの read-modify-write の直列化はこの層では行わない
//! （ユースケース層のキャンペーン単位ロックが担う）。

mod memory;
mod redis;

use async_trait::async_trait;
pub use self::memory::InMemoryKvStore;
pub use self::redis::RedisKvStore;
use serde::{Serialize, de::DeserializeOwned};

use crate::InfraError;

/// KV ストアトレイト
#[async_trait]
pub trait KvStore: Send + Sync {
    /// キーに対応する値を取得する
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;

    /// キーに値を保存する（既存値は上書き）
    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;

    /// プレフィックスに前方一致するキーと値をすべて取得する
    ///
    /// 結果の順序は保証しない。
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, InfraError>;

    /// 接続確認（readiness check 用）
    async fn ping(&self) -> Result<(), InfraError>;
}

/// キーの値を JSON としてデコードして取得する
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, InfraError> {
    match store.get(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// 値を JSON にエンコードして保存する
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), InfraError> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json).await
}

/// プレフィックスに一致する値をすべて JSON としてデコードして取得する
pub async fn scan_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    prefix: &str,
) -> Result<Vec<T>, InfraError> {
    store
        .scan_prefix(prefix)
        .await?
        .into_iter()
        .map(|(_, json)| serde_json::from_str(&json).map_err(InfraError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        name:  String,
        count: u32,
    }

    #[tokio::test]
    async fn test_set_jsonで保存した値をget_jsonで取得できる() {
        let store = InMemoryKvStore::new();
        let item = Item {
            name:  "a".to_string(),
            count: 3,
        };

        set_json(&store, "item:a", &item).await.unwrap();
        let loaded: Option<Item> = get_json(&store, "item:a").await.unwrap();

        assert_eq!(loaded, Some(item));
    }

    #[tokio::test]
    async fn test_get_jsonで存在しないキーはnone() {
        let store = InMemoryKvStore::new();

        let loaded: Option<Item> = get_json(&store, "item:missing").await.unwrap();

        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_get_jsonで壊れたjsonはシリアライズエラー() {
        let store = InMemoryKvStore::new();
        store.set("item:broken", "{not json").await.unwrap();

        let result: Result<Option<Item>, _> = get_json(&store, "item:broken").await;

        assert!(matches!(
            result.unwrap_err().kind(),
            crate::InfraErrorKind::Serialization(_)
        ));
    }

    #[tokio::test]
    async fn test_scan_jsonはプレフィックス一致の値だけを返す() {
        let store = InMemoryKvStore::new();
        for (key, count) in [("item:a", 1), ("item:b", 2), ("other:c", 3)] {
            let item = Item {
                name: key.to_string(),
                count,
            };
            set_json(&store, key, &item).await.unwrap();
        }

        let mut items: Vec<Item> = scan_json(&store, "item:").await.unwrap();
        items.sort_by_key(|i| i.count);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].count, 1);
        assert_eq!(items[1].count, 2);
    }
}
