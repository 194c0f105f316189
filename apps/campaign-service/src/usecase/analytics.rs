//! 配信分析ユースケース

use std::sync::Arc;

use mailflow_domain::analytics::{AnalyticsSummary, CampaignAnalytics};
use mailflow_infra::repository::{CampaignRepository, TemplateRepository};

use crate::error::CampaignServiceError;

/// 全体サマリーとキャンペーン別の集計
#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub summary:   AnalyticsSummary,
    pub campaigns: Vec<CampaignAnalytics>,
}

/// 配信分析ユースケース
///
/// 保存済みのキャンペーンとテンプレートを読み取って集計するだけで、状態は変更しない。
pub struct AnalyticsUseCaseImpl {
    campaign_repository: Arc<dyn CampaignRepository>,
    template_repository: Arc<dyn TemplateRepository>,
}

impl AnalyticsUseCaseImpl {
    pub fn new(
        campaign_repository: Arc<dyn CampaignRepository>,
        template_repository: Arc<dyn TemplateRepository>,
    ) -> Self {
        Self {
            campaign_repository,
            template_repository,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn report(&self) -> Result<AnalyticsReport, CampaignServiceError> {
        let campaigns = self.campaign_repository.find_all().await?;
        let template_count = self.template_repository.find_all().await?.len();

        Ok(AnalyticsReport {
            summary:   AnalyticsSummary::aggregate(&campaigns, template_count),
            campaigns: campaigns.iter().map(CampaignAnalytics::from_campaign).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use mailflow_domain::{
        campaign::{Campaign, CampaignName},
        template::{Template, TemplateName},
    };
    use mailflow_infra::{
        kv::{InMemoryKvStore, KvStore},
        mock::FailingKvStore,
        repository::{KvCampaignRepository, KvTemplateRepository},
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn sut(store: Arc<dyn KvStore>) -> AnalyticsUseCaseImpl {
        AnalyticsUseCaseImpl::new(
            Arc::new(KvCampaignRepository::new(store.clone())),
            Arc::new(KvTemplateRepository::new(store)),
        )
    }

    #[tokio::test]
    async fn test_キャンペーンが無ければ率は0() {
        let report = sut(Arc::new(InMemoryKvStore::new())).report().await.unwrap();

        assert_eq!(report.summary.total_campaigns, 0);
        assert_eq!(report.summary.total_sent, 0);
        assert_eq!(report.summary.open_rate.value(), 0.0);
        assert!(report.campaigns.is_empty());
    }

    #[tokio::test]
    async fn test_保存済みのキャンペーンとテンプレートを集計する() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let template = Template::new(
            TemplateName::new("greeting").unwrap(),
            "Hi",
            "<p>Hi</p>",
            None,
            now,
        )
        .unwrap();
        KvTemplateRepository::new(store.clone())
            .save(&template)
            .await
            .unwrap();

        let campaign = Campaign::start(
            CampaignName::new("spring-sale").unwrap(),
            TemplateName::new("greeting").unwrap(),
            4,
            None,
            now,
        )
        .unwrap()
        .complete(4, 0, now)
        .unwrap()
        .record_open()
        .record_click();
        KvCampaignRepository::new(store.clone())
            .save(&campaign)
            .await
            .unwrap();

        let report = sut(store).report().await.unwrap();

        assert_eq!(report.summary.total_campaigns, 1);
        assert_eq!(report.summary.total_templates, 1);
        assert_eq!(report.summary.total_sent, 4);
        assert_eq!(report.summary.open_rate.value(), 25.0);
        assert_eq!(report.campaigns[0].name, "spring-sale");
        assert_eq!(report.campaigns[0].click_rate.value(), 25.0);
    }

    #[tokio::test]
    async fn test_ストア障害は内部エラーになる() {
        let result = sut(Arc::new(FailingKvStore::new())).report().await;

        assert!(matches!(result, Err(CampaignServiceError::Storage(_))));
    }
}
