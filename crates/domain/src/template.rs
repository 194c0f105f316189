//! # メールテンプレート
//!
//! キャンペーンで再利用される件名 / HTML 本文の組を表現する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 備考 |
//! |---|------------|------|
//! | [`Template`] | テンプレート | 名前で upsert される。物理削除しない |
//! | [`TemplateName`] | テンプレート名 | KV キー `template:{name}` の一部 |
//! | [`RenderedContent`] | 差し込み済みコンテンツ | 受信者ごとに生成される |
//!
//! ## 差し込み
//!
//! 件名・本文中の `{{name}}` をすべて受信者名に置換する。
//! 受信者名が無い場合は空文字列に置換する（プレースホルダを残さない）。
//! 本文に差し込む受信者名は HTML エスケープする。件名はプレーンテキストのためそのまま差し込む。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// カテゴリ未指定時のデフォルト値
pub const DEFAULT_CATEGORY: &str = "general";

/// 受信者名のプレースホルダ
pub const NAME_PLACEHOLDER: &str = "{{name}}";

define_validated_string! {
    /// テンプレート名（値オブジェクト）
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 200 文字
    pub struct TemplateName {
        label: "テンプレート名",
        max_length: 200,
    }
}

/// メールテンプレート
///
/// # 不変条件
///
/// - `subject` と `html_body` は空でない
/// - `category` は空でない（未指定時は [`DEFAULT_CATEGORY`]）
/// - `created_at <= updated_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    name:       TemplateName,
    subject:    String,
    #[serde(rename = "html")]
    html_body:  String,
    category:   String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 受信者ごとに差し込みを行った件名と本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub subject: String,
    pub html:    String,
}

impl Template {
    /// 新しいテンプレートを作成する
    pub fn new(
        name: TemplateName,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        category: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let (subject, html_body) = validate_content(subject.into(), html_body.into())?;

        Ok(Self {
            name,
            subject,
            html_body,
            category: normalize_category(category),
            created_at: now,
            updated_at: now,
        })
    }

    /// 既存テンプレートの内容を差し替える
    ///
    /// `created_at` は維持し、`updated_at` を更新する。
    pub fn revise(
        self,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        category: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let (subject, html_body) = validate_content(subject.into(), html_body.into())?;

        Ok(Self {
            subject,
            html_body,
            category: normalize_category(category),
            updated_at: now,
            ..self
        })
    }

    /// 受信者名を差し込んだ件名と本文を返す
    pub fn render_for(&self, recipient_name: Option<&str>) -> RenderedContent {
        let escaped_name = recipient_name.map(escape_html);
        RenderedContent {
            subject: personalize(&self.subject, recipient_name),
            html:    personalize(&self.html_body, escaped_name.as_deref()),
        }
    }

    // Getter メソッド

    pub fn name(&self) -> &TemplateName {
        &self.name
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html_body(&self) -> &str {
        &self.html_body
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// `{{name}}` をすべて受信者名（無ければ空文字列）に置換する
pub fn personalize(text: &str, recipient_name: Option<&str>) -> String {
    text.replace(NAME_PLACEHOLDER, recipient_name.unwrap_or_default())
}

/// HTML の特殊文字（`&`, `<`, `>`, `"`, `'`）を文字参照に置換する
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn validate_content(subject: String, html_body: String) -> Result<(String, String), DomainError> {
    if subject.trim().is_empty() {
        return Err(DomainError::Validation("件名は必須です".to_string()));
    }
    if html_body.trim().is_empty() {
        return Err(DomainError::Validation("本文（html）は必須です".to_string()));
    }
    Ok((subject, html_body))
}

fn normalize_category(category: Option<String>) -> String {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
