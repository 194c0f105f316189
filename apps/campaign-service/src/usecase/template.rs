//! テンプレート管理ユースケース

use std::sync::Arc;

use mailflow_domain::{
    clock::Clock,
    template::{Template, TemplateName},
};
use mailflow_infra::repository::TemplateRepository;
use mailflow_shared::{event_log::event, log_business_event};

use crate::error::CampaignServiceError;

/// テンプレート保存の入力
pub struct UpsertTemplateInput {
    pub name:     String,
    pub subject:  String,
    pub html:     String,
    pub category: Option<String>,
}

/// テンプレート管理ユースケース
pub struct TemplateUseCaseImpl {
    template_repository: Arc<dyn TemplateRepository>,
    clock: Arc<dyn Clock>,
}

impl TemplateUseCaseImpl {
    pub fn new(template_repository: Arc<dyn TemplateRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            template_repository,
            clock,
        }
    }

    /// テンプレートを名前で upsert する
    ///
    /// 既存のテンプレートがあれば `created_at` を維持して内容を差し替える。
    #[tracing::instrument(skip_all, fields(name = %input.name))]
    pub async fn upsert(&self, input: UpsertTemplateInput) -> Result<Template, CampaignServiceError> {
        let name = TemplateName::new(input.name)?;
        let now = self.clock.now();

        let template = match self.template_repository.find_by_name(&name).await? {
            Some(existing) => existing.revise(input.subject, input.html, input.category, now)?,
            None => Template::new(name, input.subject, input.html, input.category, now)?,
        };

        self.template_repository.save(&template).await?;

        log_business_event!(
            event.category = event::category::TEMPLATE,
            event.action = event::action::TEMPLATE_SAVED,
            event.entity_type = event::entity_type::TEMPLATE,
            event.entity_id = %template.name(),
            event.result = event::result::SUCCESS,
            "テンプレートを保存"
        );

        Ok(template)
    }

    /// 名前でテンプレートを取得する
    pub async fn get(&self, name: &str) -> Result<Template, CampaignServiceError> {
        let not_found = || CampaignServiceError::NotFound("テンプレートが見つかりません".to_string());
        let name = TemplateName::new(name).map_err(|_| not_found())?;

        self.template_repository
            .find_by_name(&name)
            .await?
            .ok_or_else(not_found)
    }

    /// テンプレート一覧を取得する（順序は保証しない）
    pub async fn list(&self) -> Result<Vec<Template>, CampaignServiceError> {
        Ok(self.template_repository.find_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use mailflow_domain::clock::FixedClock;
    use mailflow_infra::{kv::InMemoryKvStore, repository::KvTemplateRepository};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn sut_with_clock(
        repo: Arc<dyn TemplateRepository>,
        now: DateTime<Utc>,
    ) -> TemplateUseCaseImpl {
        TemplateUseCaseImpl::new(repo, Arc::new(FixedClock::new(now)))
    }

    fn input(name: &str, subject: &str, html: &str, category: Option<&str>) -> UpsertTemplateInput {
        UpsertTemplateInput {
            name:     name.to_string(),
            subject:  subject.to_string(),
            html:     html.to_string(),
            category: category.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_保存したテンプレートを名前で取得すると同じ内容が返る() {
        let repo: Arc<dyn TemplateRepository> =
            Arc::new(KvTemplateRepository::new(Arc::new(InMemoryKvStore::new())));
        let sut = sut_with_clock(repo, now());

        sut.upsert(input("welcome", "Hi {{name}}", "<p>Hi {{name}}</p>", Some("onboarding")))
            .await
            .unwrap();
        let found = sut.get("welcome").await.unwrap();

        assert_eq!(found.subject(), "Hi {{name}}");
        assert_eq!(found.html_body(), "<p>Hi {{name}}</p>");
        assert_eq!(found.category(), "onboarding");
    }

    #[tokio::test]
    async fn test_再保存でcreated_atを維持してupdated_atを更新する() {
        let repo: Arc<dyn TemplateRepository> =
            Arc::new(KvTemplateRepository::new(Arc::new(InMemoryKvStore::new())));
        let first = sut_with_clock(repo.clone(), now());
        first
            .upsert(input("welcome", "v1", "<p>v1</p>", None))
            .await
            .unwrap();

        let later = now() + Duration::hours(1);
        let second = sut_with_clock(repo, later);
        let revised = second
            .upsert(input("welcome", "v2", "<p>v2</p>", None))
            .await
            .unwrap();

        assert_eq!(revised.created_at(), now());
        assert_eq!(revised.updated_at(), later);
        assert_eq!(revised.subject(), "v2");
    }

    #[tokio::test]
    async fn test_カテゴリ未指定はgeneralになる() {
        let repo: Arc<dyn TemplateRepository> =
            Arc::new(KvTemplateRepository::new(Arc::new(InMemoryKvStore::new())));
        let sut = sut_with_clock(repo, now());

        let template = sut
            .upsert(input("welcome", "件名", "<p>本文</p>", Some("")))
            .await
            .unwrap();

        assert_eq!(template.category(), "general");
    }

    #[rstest]
    #[case("", "件名", "<p>本文</p>")]
    #[case("welcome", "", "<p>本文</p>")]
    #[case("welcome", "件名", "  ")]
    #[tokio::test]
    async fn test_必須項目が空ならバリデーションエラー(
        #[case] name: &str,
        #[case] subject: &str,
        #[case] html: &str,
    ) {
        let repo: Arc<dyn TemplateRepository> =
            Arc::new(KvTemplateRepository::new(Arc::new(InMemoryKvStore::new())));
        let sut = sut_with_clock(repo, now());

        let result = sut.upsert(input(name, subject, html, None)).await;

        assert!(matches!(result, Err(CampaignServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_存在しないテンプレートはnot_found() {
        let repo: Arc<dyn TemplateRepository> =
            Arc::new(KvTemplateRepository::new(Arc::new(InMemoryKvStore::new())));
        let sut = sut_with_clock(repo, now());

        let result = sut.get("missing").await;

        assert!(matches!(result, Err(CampaignServiceError::NotFound(_))));
    }
}
