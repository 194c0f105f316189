//! # CampaignRepository
//!
//! キャンペーンの永続化を担当するリポジトリ。
//!
//! カウンタの read-modify-write はこのリポジトリでは直列化しない。
//! 呼び出し側がキャンペーン単位のロックを保持した状態で `find` → `save` を行う。

use std::sync::Arc;

use async_trait::async_trait;
use mailflow_domain::campaign::{Campaign, CampaignName};

use crate::{
    error::InfraError,
    kv::{KvStore, get_json, scan_json, set_json},
};

const KEY_PREFIX: &str = "campaign:";

fn campaign_key(name: &CampaignName) -> String {
    format!("{KEY_PREFIX}{name}")
}

/// キャンペーンリポジトリトレイト
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// キャンペーンを保存する（同名のキャンペーンは置き換える）
    async fn save(&self, campaign: &Campaign) -> Result<(), InfraError>;

    /// 名前でキャンペーンを検索する
    async fn find_by_name(&self, name: &CampaignName) -> Result<Option<Campaign>, InfraError>;

    /// すべてのキャンペーンを取得する（順序は保証しない）
    async fn find_all(&self) -> Result<Vec<Campaign>, InfraError>;
}

/// KV ストア実装の CampaignRepository
#[derive(Clone)]
pub struct KvCampaignRepository {
    store: Arc<dyn KvStore>,
}

impl KvCampaignRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CampaignRepository for KvCampaignRepository {
    async fn save(&self, campaign: &Campaign) -> Result<(), InfraError> {
        set_json(self.store.as_ref(), &campaign_key(campaign.name()), campaign).await
    }

    async fn find_by_name(&self, name: &CampaignName) -> Result<Option<Campaign>, InfraError> {
        get_json(self.store.as_ref(), &campaign_key(name)).await
    }

    async fn find_all(&self) -> Result<Vec<Campaign>, InfraError> {
        scan_json(self.store.as_ref(), KEY_PREFIX).await
    }
}
