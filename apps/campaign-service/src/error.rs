//! # Campaign Service エラー定義
//!
//! Campaign Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! 500 系のレスポンスには固定の detail のみを返し、原因はサーバー側のログにのみ出力する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailflow_domain::DomainError;
use mailflow_infra::InfraError;
use mailflow_shared::{
    ErrorResponse,
    event_log::error::{category, kind},
};
use thiserror::Error;

/// Campaign Service で発生するエラー
#[derive(Debug, Error)]
pub enum CampaignServiceError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト（JSON の形式不正など）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 入力値の検証失敗
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// KV ストアのエラー
    #[error("ストレージエラー: {0}")]
    Storage(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for CampaignServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
        }
    }
}

impl IntoResponse for CampaignServiceError {
    fn into_response(self) -> Response {
        let error = match &self {
            CampaignServiceError::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            CampaignServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            CampaignServiceError::Validation(msg) => ErrorResponse::validation_error(msg.clone()),
            CampaignServiceError::Storage(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::STORAGE,
                    "ストレージエラー: {}\n{}",
                    e,
                    e.span_trace()
                );
                ErrorResponse::internal_error()
            }
            CampaignServiceError::Internal(msg) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn into_parts(err: CampaignServiceError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ドメインのnot_foundは404になる() {
        let err: CampaignServiceError = DomainError::NotFound {
            entity_type: "Template",
            id:          "welcome".to_string(),
        }
        .into();

        let (status, body) = into_parts(err).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.detail, "Template が見つかりません: welcome");
    }

    #[tokio::test]
    async fn test_ストレージエラーは内部情報を返さない() {
        let err = CampaignServiceError::Storage(InfraError::unexpected("redis://secret@host"));

        let (status, body) = into_parts(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.detail, "内部エラーが発生しました");
    }

    #[tokio::test]
    async fn test_バリデーションエラーは400になる() {
        let err: CampaignServiceError = DomainError::Validation("件名は必須です".to_string()).into();

        let (status, body) = into_parts(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "件名は必須です");
    }
}
