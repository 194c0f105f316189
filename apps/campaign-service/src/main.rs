//! # Campaign Service サーバー
//!
//! メールテンプレートの管理、キャンペーン配信、開封・クリック計測、配信分析を提供する。
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │  Admin UI    │────▶│ Campaign Service │────▶│ SMTP server  │
//! └──────────────┘     │   port: 3100     │     └──────────────┘
//!                      └──────────────────┘
//! ┌──────────────┐            ▲    │
//! │ Mail client  │────────────┘    ▼
//! │ (pixel/link) │           ┌────────────────┐
//! └──────────────┘           │ Redis / memory │
//!                            └────────────────┘
//! ```
//!
//! 環境変数は [`mailflow_campaign_service::config`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（インメモリ KV）
//! cargo run -p mailflow-campaign-service
//!
//! # Redis を使う場合
//! KV_BACKEND=redis REDIS_URL=redis://localhost:6379 cargo run -p mailflow-campaign-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use mailflow_campaign_service::{
    app_builder::{AppDependencies, build_app},
    config::{CampaignServiceConfig, KvBackend},
};
use mailflow_domain::clock::SystemClock;
use mailflow_infra::{
    KvStore,
    kv::{InMemoryKvStore, RedisKvStore},
    mail::SmtpMailSender,
};
use mailflow_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Campaign Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_tracing(TracingConfig::from_env("campaign-service"));
    let _tracing_guard = tracing::info_span!("app", service = "campaign-service").entered();

    // 設定読み込み
    let config = CampaignServiceConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Campaign Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // KV ストアの初期化
    let kv_store: Arc<dyn KvStore> = match &config.kv_backend {
        KvBackend::Memory => {
            tracing::warn!("インメモリ KV ストアを使用します（再起動でデータは消えます）");
            Arc::new(InMemoryKvStore::new())
        }
        KvBackend::Redis { url } => {
            let store = RedisKvStore::new(url)
                .await
                .context("Redis への接続に失敗しました")?;
            tracing::info!("Redis に接続しました");
            Arc::new(store)
        }
    };

    let app = build_app(AppDependencies {
        kv_store,
        mail_sender: Arc::new(SmtpMailSender::new(config.smtp_timeout)),
        clock: Arc::new(SystemClock),
        settings: config.delivery.clone(),
        smtp_fallback: config.smtp_fallback.clone(),
    })
    .context("アプリケーションの構築に失敗しました")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Campaign Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
