//! # キャンペーンハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /email/campaign/send` - キャンペーン送信
//! - `GET /email/campaigns` - キャンペーン一覧
//! - `GET /email/campaign/{name}` - キャンペーンと受信者一覧
//!
//! ## 送信モード
//!
//! `dispatch` で送信完了を待つかを選ぶ。
//!
//! - `sync`（既定）: 全受信者の結果が確定してから 200 を返す
//! - `async`: キャンペーンを作成した時点で 202 を返す。進捗は詳細取得で確認する

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use mailflow_domain::campaign::{Campaign, CampaignRecipient, Recipient};
use serde::{Deserialize, Serialize};

use crate::{
    error::CampaignServiceError,
    usecase::{CampaignUseCaseImpl, SendCampaignInput},
};

/// キャンペーン API の共有状態
pub struct CampaignState {
    pub usecase: CampaignUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 送信モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Sync,
    Async,
}

#[derive(Debug, Deserialize)]
pub struct RecipientRequest {
    #[serde(default)]
    pub email: String,
    pub name:  Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCampaignRequest {
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub recipients:    Vec<RecipientRequest>,
    pub scheduled_at:  Option<DateTime<Utc>>,
    #[serde(default)]
    pub dispatch:      DispatchMode,
}

#[derive(Debug, Serialize)]
pub struct SendCampaignResponse {
    pub success:  bool,
    pub campaign: Campaign,
    pub message:  String,
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Serialize)]
pub struct CampaignDetailResponse {
    pub campaign:   Campaign,
    pub recipients: Vec<CampaignRecipient>,
}

// --- ハンドラ ---

/// POST /email/campaign/send
///
/// ## レスポンス
///
/// - `200 OK`: 送信完了（`dispatch=sync`）
/// - `202 Accepted`: 送信受付（`dispatch=async`）
/// - `400 Bad Request`: 入力不正、キャンペーン名の重複
/// - `404 Not Found`: テンプレートが存在しない
#[tracing::instrument(skip_all, fields(campaign = %req.campaign_name, dispatch = ?req.dispatch))]
pub async fn send_campaign(
    State(state): State<Arc<CampaignState>>,
    Json(req): Json<SendCampaignRequest>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let input = SendCampaignInput {
        campaign_name: req.campaign_name,
        template_name: req.template_name,
        recipients:    req
            .recipients
            .into_iter()
            .map(|r| Recipient::new(r.email, r.name))
            .collect(),
        scheduled_at:  req.scheduled_at,
    };

    let (status, campaign, message) = match req.dispatch {
        DispatchMode::Sync => {
            let campaign = state.usecase.send(input).await?;
            let message = format!(
                "Campaign sent to {} recipients, {} failed",
                campaign.sent_count(),
                campaign.failed_count()
            );
            (StatusCode::OK, campaign, message)
        }
        DispatchMode::Async => {
            let campaign = state.usecase.send_in_background(input).await?;
            let message = format!(
                "Campaign accepted for delivery to {} recipients",
                campaign.recipient_count()
            );
            (StatusCode::ACCEPTED, campaign, message)
        }
    };

    Ok((
        status,
        Json(SendCampaignResponse {
            success: true,
            campaign,
            message,
        }),
    ))
}

/// GET /email/campaigns
#[tracing::instrument(skip_all)]
pub async fn list_campaigns(
    State(state): State<Arc<CampaignState>>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let campaigns = state.usecase.list().await?;

    Ok(Json(CampaignListResponse { campaigns }))
}

/// GET /email/campaign/{name}
#[tracing::instrument(skip_all, fields(%name))]
pub async fn get_campaign(
    State(state): State<Arc<CampaignState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let detail = state.usecase.get(&name).await?;

    Ok(Json(CampaignDetailResponse {
        campaign:   detail.campaign,
        recipients: detail.recipients,
    }))
}
