//! Redis KV ストア実装
//!
//! `redis::aio::ConnectionManager` を使用する。接続は操作ごとに clone して使う
//! （ConnectionManager は内部で多重化されており、clone は安価）。
//!
//! プレフィックス走査は `SCAN MATCH` で行い、KEYS は使用しない。
//! プレフィックス内の glob 特殊文字（`*`, `?`, `[`, `]`, `\`）はエスケープする。

use std::collections::BTreeSet;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use super::KvStore;
use crate::InfraError;

/// SCAN 1 回あたりのヒント件数
const SCAN_COUNT: usize = 100;

/// Redis を使用した KV ストア
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// 新しい RedisKvStore を作成する
    ///
    /// # 引数
    ///
    /// - `redis_url`: Redis 接続 URL（例: `redis://localhost:6379`）
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// プレフィックスから SCAN MATCH 用のパターンを生成する
    fn prefix_pattern(prefix: &str) -> String {
        let mut pattern = String::with_capacity(prefix.len() + 1);
        for c in prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    #[tracing::instrument(skip_all, level = "debug", fields(%key))]
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%key))]
    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%prefix))]
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, InfraError> {
        let pattern = Self::prefix_pattern(prefix);
        let mut conn = self.conn.clone();

        // SCAN は同じキーを複数回返すことがあるため集合で重複を除く
        let mut keys = BTreeSet::new();
        let mut cursor = 0u64;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        let keys: Vec<String> = keys.into_iter().collect();
        let mut entries = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(SCAN_COUNT) {
            let values: Vec<Option<String>> = redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut conn)
                .await?;
            // SCAN と MGET の間に消えたキーは読み飛ばす
            entries.extend(
                chunk
                    .iter()
                    .zip(values)
                    .filter_map(|(key, value)| value.map(|v| (key.clone(), v))),
            );
        }

        Ok(entries)
    }

    async fn ping(&self) -> Result<(), InfraError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RedisKvStore>();
    }

    #[rstest]
    #[case("campaign:", "campaign:*")]
    #[case("campaign-recipient:sale*:", r"campaign-recipient:sale\*:*")]
    #[case("template:[a]?", r"template:\[a\]\?*")]
    #[case(r"a\b", r"a\\b*")]
    fn test_prefix_patternはglob特殊文字をエスケープする(
        #[case] prefix: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(RedisKvStore::prefix_pattern(prefix), expected);
    }
}
