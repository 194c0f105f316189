//! # トラッキングハンドラ
//!
//! メール内の開封ピクセルとクリックリンクから呼ばれる。
//! 内部で何が起きてもエラーレスポンスは返さない。
//!
//! ## エンドポイント
//!
//! - `GET /email/track/open/{token}` - 常に 1x1 の透過 GIF を返す
//! - `GET /email/track/click/{token}?url=...` - 常に 302 でリダイレクトする

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State, rejection::PathRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use mailflow_domain::tracking::TRANSPARENT_PIXEL_GIF;
use url::form_urlencoded;

use crate::usecase::TrackingService;

const PIXEL_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// トラッキング API の共有状態
pub struct TrackingState {
    pub service: TrackingService,
}

/// クエリ文字列から最初の `url` パラメータを取り出す
///
/// 同じキーの繰り返しや不正なエンコードでも失敗しない。
fn destination_from_query(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

/// GET /email/track/open/{token}
///
/// トークンがパスとして解釈できない場合も計測をスキップしてピクセルを返す。
#[tracing::instrument(skip_all)]
pub async fn track_open(
    State(state): State<Arc<TrackingState>>,
    token: Result<Path<String>, PathRejection>,
) -> impl IntoResponse {
    match token {
        Ok(Path(token)) => state.service.handle_open(&token).await,
        Err(rejection) => tracing::debug!(%rejection, "解釈できない開封トークン"),
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, PIXEL_CACHE_CONTROL),
        ],
        TRANSPARENT_PIXEL_GIF.to_vec(),
    )
}

/// GET /email/track/click/{token}
///
/// トークンが解釈できない場合も計測をスキップしてリダイレクトする。
#[tracing::instrument(skip_all)]
pub async fn track_click(
    State(state): State<Arc<TrackingState>>,
    token: Result<Path<String>, PathRejection>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let destination = destination_from_query(query.as_deref());

    let location = match token {
        Ok(Path(token)) => {
            state
                .service
                .handle_click(&token, destination.as_deref())
                .await
        }
        Err(rejection) => {
            tracing::debug!(%rejection, "解釈できないクリックトークン");
            state.service.redirect_target(destination.as_deref())
        }
    };

    (StatusCode::FOUND, [(header::LOCATION, location)])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("url=https%3A%2F%2Fa.com%2Fx"), Some("https://a.com/x"))]
    #[case(Some("url=https://a.com&url=https://b.com"), Some("https://a.com"))]
    #[case(Some("utm=1&url=%FF"), Some("\u{FFFD}"))]
    #[case(Some("other=1"), None)]
    #[case(None, None)]
    fn test_クエリから最初のurlを取り出す(
        #[case] query: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(destination_from_query(query).as_deref(), expected);
    }
}
