//! # TrackingTokenRepository
//!
//! トラッキングトークンから受信者（キャンペーン名・メールアドレス）への対応を保存する。
//! トークンの発行と同時に書き込まれ、以後変更されない。

use std::sync::Arc;

use async_trait::async_trait;
use mailflow_domain::tracking::{TrackingTarget, TrackingToken};

use crate::{
    error::InfraError,
    kv::{KvStore, get_json, set_json},
};

fn token_key(token: &TrackingToken) -> String {
    format!("tracking-token:{token}")
}

/// トラッキングトークンリポジトリトレイト
#[async_trait]
pub trait TrackingTokenRepository: Send + Sync {
    /// トークンと受信者の対応を保存する
    async fn save(&self, token: &TrackingToken, target: &TrackingTarget)
    -> Result<(), InfraError>;

    /// トークンから受信者を解決する
    async fn find(&self, token: &TrackingToken) -> Result<Option<TrackingTarget>, InfraError>;
}

/// KV ストア実装の TrackingTokenRepository
#[derive(Clone)]
pub struct KvTrackingTokenRepository {
    store: Arc<dyn KvStore>,
}

impl KvTrackingTokenRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TrackingTokenRepository for KvTrackingTokenRepository {
    async fn save(
        &self,
        token: &TrackingToken,
        target: &TrackingTarget,
    ) -> Result<(), InfraError> {
        set_json(self.store.as_ref(), &token_key(token), target).await
    }

    async fn find(&self, token: &TrackingToken) -> Result<Option<TrackingTarget>, InfraError> {
        get_json(self.store.as_ref(), &token_key(token)).await
    }
}
