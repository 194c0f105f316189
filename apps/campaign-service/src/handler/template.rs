//! # テンプレートハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /email/template` - テンプレートの作成・更新（名前で upsert）
//! - `GET /email/templates` - テンプレート一覧
//! - `GET /email/template/{name}` - テンプレート取得

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use mailflow_domain::template::Template;
use serde::{Deserialize, Serialize};

use crate::{
    error::CampaignServiceError,
    usecase::{TemplateUseCaseImpl, UpsertTemplateInput},
};

/// テンプレート API の共有状態
pub struct TemplateState {
    pub usecase: TemplateUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// テンプレート保存リクエスト
///
/// 必須項目の欠落はユースケースの検証で 400 にするため、文字列は既定値を空にする。
#[derive(Debug, Deserialize)]
pub struct SaveTemplateRequest {
    #[serde(default)]
    pub name:     String,
    #[serde(default)]
    pub subject:  String,
    #[serde(default)]
    pub html:     String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveTemplateResponse {
    pub success:  bool,
    pub template: Template,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub template: Template,
}

// --- ハンドラ ---

/// POST /email/template
#[tracing::instrument(skip_all, fields(name = %req.name))]
pub async fn save_template(
    State(state): State<Arc<TemplateState>>,
    Json(req): Json<SaveTemplateRequest>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let template = state
        .usecase
        .upsert(UpsertTemplateInput {
            name:     req.name,
            subject:  req.subject,
            html:     req.html,
            category: req.category,
        })
        .await?;

    Ok(Json(SaveTemplateResponse {
        success: true,
        template,
    }))
}

/// GET /email/templates
#[tracing::instrument(skip_all)]
pub async fn list_templates(
    State(state): State<Arc<TemplateState>>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let templates = state.usecase.list().await?;

    Ok(Json(TemplateListResponse { templates }))
}

/// GET /email/template/{name}
#[tracing::instrument(skip_all, fields(%name))]
pub async fn get_template(
    State(state): State<Arc<TemplateState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let template = state.usecase.get(&name).await?;

    Ok(Json(TemplateResponse { template }))
}
