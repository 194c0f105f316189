//! # CampaignRecipientRepository
//!
//! キャンペーン受信者（送信結果とトラッキング状態）の永続化を担当するリポジトリ。
//!
//! キーは `campaign-recipient:{campaign}:{email}`。キャンペーン名の部分は
//! パーセントエンコードして `:` を含まないようにする。これにより
//! キャンペーン `a` ・アドレス `b:x@y` と キャンペーン `a:b` ・アドレス `x@y` が
//! 同じキーにならず、`sale` の走査に `sale:2024` の受信者が混ざることもない。

use std::sync::Arc;

use async_trait::async_trait;
use mailflow_domain::campaign::{CampaignName, CampaignRecipient};

use crate::{
    error::InfraError,
    kv::{KvStore, get_json, scan_json, set_json},
};

const KEY_PREFIX: &str = "campaign-recipient:";

fn campaign_prefix(campaign_name: &CampaignName) -> String {
    format!(
        "{KEY_PREFIX}{}:",
        urlencoding::encode(campaign_name.as_str())
    )
}

fn recipient_key(campaign_name: &CampaignName, email: &str) -> String {
    format!("{}{email}", campaign_prefix(campaign_name))
}

/// キャンペーン受信者リポジトリトレイト
#[async_trait]
pub trait CampaignRecipientRepository: Send + Sync {
    /// 受信者レコードを保存する（同じキャンペーン・アドレスのレコードは置き換える）
    async fn save(&self, recipient: &CampaignRecipient) -> Result<(), InfraError>;

    /// キャンペーン名とメールアドレスで受信者レコードを検索する
    async fn find(
        &self,
        campaign_name: &CampaignName,
        email: &str,
    ) -> Result<Option<CampaignRecipient>, InfraError>;

    /// キャンペーンの受信者レコードをすべて取得する（順序は保証しない）
    async fn find_by_campaign(
        &self,
        campaign_name: &CampaignName,
    ) -> Result<Vec<CampaignRecipient>, InfraError>;
}

/// KV ストア実装の CampaignRecipientRepository
#[derive(Clone)]
pub struct KvCampaignRecipientRepository {
    store: Arc<dyn KvStore>,
}

impl KvCampaignRecipientRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CampaignRecipientRepository for KvCampaignRecipientRepository {
    async fn save(&self, recipient: &CampaignRecipient) -> Result<(), InfraError> {
        let key = recipient_key(recipient.campaign_name(), recipient.email());
        set_json(self.store.as_ref(), &key, recipient).await
    }

    async fn find(
        &self,
        campaign_name: &CampaignName,
        email: &str,
    ) -> Result<Option<CampaignRecipient>, InfraError> {
        get_json(self.store.as_ref(), &recipient_key(campaign_name, email)).await
    }

    async fn find_by_campaign(
        &self,
        campaign_name: &CampaignName,
    ) -> Result<Vec<CampaignRecipient>, InfraError> {
        scan_json(self.store.as_ref(), &campaign_prefix(campaign_name)).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use mailflow_domain::{
        campaign::{Recipient, RecipientStatus},
        tracking::TrackingToken,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kv::InMemoryKvStore;

    fn make_recipient(campaign: &str, email: &str) -> CampaignRecipient {
        CampaignRecipient::new(
            CampaignName::new(campaign).unwrap(),
            Recipient::new(email, None),
            RecipientStatus::Sent,
            TrackingToken::generate(),
            None,
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KvCampaignRecipientRepository>();
    }

    #[tokio::test]
    async fn test_キャンペーン名とアドレスで取得できる() {
        let sut = KvCampaignRecipientRepository::new(Arc::new(InMemoryKvStore::new()));
        let recipient = make_recipient("spring-sale", "a@x.com");
        sut.save(&recipient).await.unwrap();

        let found = sut
            .find(recipient.campaign_name(), "a@x.com")
            .await
            .unwrap();

        assert_eq!(found, Some(recipient));
    }

    #[tokio::test]
    async fn test_前方一致する別キャンペーンの受信者を含まない() {
        let sut = KvCampaignRecipientRepository::new(Arc::new(InMemoryKvStore::new()));
        sut.save(&make_recipient("sale", "a@x.com")).await.unwrap();
        sut.save(&make_recipient("sale", "b@x.com")).await.unwrap();
        sut.save(&make_recipient("sale:2024", "c@x.com"))
            .await
            .unwrap();

        let found = sut
            .find_by_campaign(&CampaignName::new("sale").unwrap())
            .await
            .unwrap();

        let mut emails: Vec<&str> = found.iter().map(|r| r.email()).collect();
        emails.sort();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_区切り文字を含むキャンペーン名とアドレスの組が衝突しない() {
        let sut = KvCampaignRecipientRepository::new(Arc::new(InMemoryKvStore::new()));
        let first = make_recipient("a", "b:x@y");
        let second = make_recipient("a:b", "x@y");
        sut.save(&first).await.unwrap();
        sut.save(&second).await.unwrap();

        let found_first = sut.find(first.campaign_name(), "b:x@y").await.unwrap();
        let found_second = sut.find(second.campaign_name(), "x@y").await.unwrap();

        assert_eq!(found_first, Some(first));
        assert_eq!(found_second, Some(second));
    }

    #[test]
    fn test_キャンペーン名の区切り文字はエンコードされる() {
        let key = recipient_key(&CampaignName::new("a:b").unwrap(), "x@y");

        assert_eq!(key, "campaign-recipient:a%3Ab:x@y");
    }
}
