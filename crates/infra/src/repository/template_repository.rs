//! # TemplateRepository
//!
//! メールテンプレートの永続化を担当するリポジトリ。
//!
//! テンプレートは名前で upsert され、削除操作は持たない。

use std::sync::Arc;

use async_trait::async_trait;
use mailflow_domain::template::{Template, TemplateName};

use crate::{
    error::InfraError,
    kv::{KvStore, get_json, scan_json, set_json},
};

const KEY_PREFIX: &str = "template:";

fn template_key(name: &TemplateName) -> String {
    format!("{KEY_PREFIX}{name}")
}

/// テンプレートリポジトリトレイト
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// テンプレートを保存する（同名のテンプレートは置き換える）
    async fn save(&self, template: &Template) -> Result<(), InfraError>;

    /// 名前でテンプレートを検索する
    async fn find_by_name(&self, name: &TemplateName) -> Result<Option<Template>, InfraError>;

    /// すべてのテンプレートを取得する（順序は保証しない）
    async fn find_all(&self) -> Result<Vec<Template>, InfraError>;
}

/// KV ストア実装の TemplateRepository
#[derive(Clone)]
pub struct KvTemplateRepository {
    store: Arc<dyn KvStore>,
}

impl KvTemplateRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TemplateRepository for KvTemplateRepository {
    async fn save(&self, template: &Template) -> Result<(), InfraError> {
        set_json(self.store.as_ref(), &template_key(template.name()), template).await
    }

    async fn find_by_name(&self, name: &TemplateName) -> Result<Option<Template>, InfraError> {
        get_json(self.store.as_ref(), &template_key(name)).await
    }

    async fn find_all(&self) -> Result<Vec<Template>, InfraError> {
        scan_json(self.store.as_ref(), KEY_PREFIX).await
    }
}
