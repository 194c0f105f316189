//! # ヘルスチェックハンドラ
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（KV ストアの接続状態を確認）
//!
//! レスポンス型は [`mailflow_shared::HealthResponse`] / [`mailflow_shared::ReadinessResponse`] を参照。

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use mailflow_infra::KvStore;
use mailflow_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};

/// KV ストアの PING のタイムアウト
const KV_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness Check エンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness Check 用の State
pub struct ReadinessState {
    pub kv_store: Arc<dyn KvStore>,
}

/// Readiness Check エンドポイント
///
/// KV ストアに PING を送り、応答があれば 200、無ければ 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let kv_result = check_kv_store(state.kv_store.as_ref()).await;

    let mut checks = HashMap::new();
    checks.insert("kv_store".to_string(), kv_result);

    let all_ok = checks.values().all(|s| matches!(s, CheckStatus::Ok));
    let (status, http_status) = if all_ok {
        (ReadinessStatus::Ready, StatusCode::OK)
    } else {
        (ReadinessStatus::NotReady, StatusCode::SERVICE_UNAVAILABLE)
    };

    (http_status, Json(ReadinessResponse { status, checks }))
}

async fn check_kv_store(kv_store: &dyn KvStore) -> CheckStatus {
    match tokio::time::timeout(KV_PING_TIMEOUT, kv_store.ping()).await {
        Ok(Ok(())) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "readiness check: kv store ping failed");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!("readiness check: kv store check timed out");
            CheckStatus::Error
        }
    }
}
