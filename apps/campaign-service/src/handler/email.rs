//! # メール送信ハンドラ
//!
//! キャンペーンを介さない 1 通単位の送信を扱う。
//!
//! ## エンドポイント
//!
//! - `POST /email/send` - 任意の件名・本文で 1 通送信
//! - `POST /email/welcome` - ウェルカムメールを送信
//!
//! 送信に失敗した場合（SMTP 未構成を含む）は 500 と `success: false` を返す。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::{
    error::CampaignServiceError,
    usecase::{DeliveryOutcome, SendEmailInput, SystemMailUseCaseImpl},
};

/// メール送信 API の共有状態
pub struct EmailState {
    pub usecase: Arc<SystemMailUseCaseImpl>,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub to:      String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html:    String,
    pub cc:      Option<String>,
    pub bcc:     Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WelcomeEmailRequest {
    #[serde(default)]
    pub email: String,
    pub name:  Option<String>,
}

/// 送信結果のレスポンス
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeliveryResponse {
    pub(crate) fn sent(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                error:   None,
                message: Some(message.into()),
            }),
        )
    }

    pub(crate) fn failed(
        outcome: &DeliveryOutcome,
        message: Option<&str>,
    ) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self {
                success: false,
                error:   outcome.error_message(),
                message: message.map(str::to_string),
            }),
        )
    }
}

// --- ハンドラ ---

/// POST /email/send
#[tracing::instrument(skip_all)]
pub async fn send_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let outcome = state
        .usecase
        .send(SendEmailInput {
            to:      req.to,
            subject: req.subject,
            html:    req.html,
            cc:      req.cc,
            bcc:     req.bcc,
        })
        .await?;

    Ok(if outcome.is_sent() {
        DeliveryResponse::sent("Email sent successfully")
    } else {
        DeliveryResponse::failed(
            &outcome,
            Some("Email not sent. Please configure SMTP settings."),
        )
    })
}

/// POST /email/welcome
#[tracing::instrument(skip_all)]
pub async fn send_welcome_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<WelcomeEmailRequest>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let outcome = state
        .usecase
        .send_welcome(&req.email, req.name.as_deref())
        .await?;

    Ok(if outcome.is_sent() {
        DeliveryResponse::sent("Welcome email sent")
    } else {
        DeliveryResponse::failed(&outcome, None)
    })
}
