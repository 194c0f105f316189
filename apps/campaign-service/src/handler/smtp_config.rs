//! # SMTP 設定ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /admin/smtp-config` - 現在の設定（パスワードはマスク）
//! - `POST /admin/smtp-config` - 設定の保存
//! - `POST /admin/test-smtp` - テストメールの送信

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use mailflow_domain::smtp_config::{MaskedSmtpConfig, SmtpConfigDraft};
use serde::{Deserialize, Serialize};

use super::email::DeliveryResponse;
use crate::{
    error::CampaignServiceError,
    usecase::{SmtpConfigUseCaseImpl, SystemMailUseCaseImpl},
};

/// SMTP 設定 API の共有状態
pub struct SmtpConfigState {
    pub usecase:     Arc<SmtpConfigUseCaseImpl>,
    pub system_mail: Arc<SystemMailUseCaseImpl>,
}

// --- リクエスト/レスポンス型 ---

/// ポート番号（数値・文字列のどちらでも受け付ける）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    fn parse(&self) -> Result<u16, CampaignServiceError> {
        let invalid = || CampaignServiceError::Validation("ポート番号が不正です".to_string());
        match self {
            PortValue::Number(n) => u16::try_from(*n).map_err(|_| invalid()),
            PortValue::Text(s) => s.trim().parse().map_err(|_| invalid()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSmtpConfigRequest {
    #[serde(default)]
    pub hostname:   String,
    pub port:       Option<PortValue>,
    #[serde(default)]
    pub username:   String,
    #[serde(default)]
    pub password:   String,
    pub from_email: Option<String>,
    pub from_name:  Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSmtpRequest {
    #[serde(default)]
    pub test_email: String,
}

#[derive(Debug, Serialize)]
pub struct SmtpConfigResponse {
    pub configured: bool,
    pub config:     MaskedSmtpConfig,
}

#[derive(Debug, Serialize)]
pub struct SaveSmtpConfigResponse {
    pub success:    bool,
    pub message:    String,
    pub configured: bool,
}

// --- ハンドラ ---

/// GET /admin/smtp-config
#[tracing::instrument(skip_all)]
pub async fn get_smtp_config(
    State(state): State<Arc<SmtpConfigState>>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let view = state.usecase.load_for_display().await?;

    Ok(Json(SmtpConfigResponse {
        configured: view.configured,
        config:     view.config,
    }))
}

/// POST /admin/smtp-config
#[tracing::instrument(skip_all)]
pub async fn save_smtp_config(
    State(state): State<Arc<SmtpConfigState>>,
    Json(req): Json<SaveSmtpConfigRequest>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let port = req.port.as_ref().map(PortValue::parse).transpose()?;

    let config = state
        .usecase
        .save(SmtpConfigDraft {
            hostname: req.hostname,
            port,
            username: req.username,
            password: req.password,
            from_email: req.from_email,
            from_name: req.from_name,
        })
        .await?;

    Ok(Json(SaveSmtpConfigResponse {
        success:    true,
        message:    "SMTP configuration saved successfully".to_string(),
        configured: config.is_configured(),
    }))
}

/// POST /admin/test-smtp
#[tracing::instrument(skip_all)]
pub async fn test_smtp(
    State(state): State<Arc<SmtpConfigState>>,
    Json(req): Json<TestSmtpRequest>,
) -> Result<impl IntoResponse, CampaignServiceError> {
    let outcome = state.system_mail.send_test(&req.test_email).await?;

    Ok(if outcome.is_sent() {
        DeliveryResponse::sent(format!(
            "Test email sent successfully to {}! Check your inbox.",
            req.test_email.trim()
        ))
    } else {
        DeliveryResponse::failed(
            &outcome,
            Some("Failed to send test email. Please check your SMTP configuration."),
        )
    })
}
