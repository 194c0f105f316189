//! # 配信分析ハンドラ
//!
//! - `GET /email/analytics` - 全体サマリーとキャンペーン別の開封率・クリック率

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use mailflow_domain::analytics::{AnalyticsSummary, CampaignAnalytics};
use serde::Serialize;

use crate::{error::CampaignServiceError, usecase::AnalyticsUseCaseImpl};

/// 配信分析 API の共有状態
pub struct AnalyticsState {
    pub usecase: AnalyticsUseCaseImpl,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsDto {
    #[serde(flatten)]
    pub summary:   AnalyticsSummary,
    pub campaigns: Vec<CampaignAnalytics>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub analytics: AnalyticsDto,
}

/// GET /email/analytics
#[tracing::instrument(skip_all)]
pub async fn get_analytics(
    State(state): State<Arc<AnalyticsState>>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let report = state.usecase.report().await?;

    Ok(Json(AnalyticsResponse {
        analytics: AnalyticsDto {
            summary:   report.summary,
            campaigns: report.campaigns,
        },
    }))
}
