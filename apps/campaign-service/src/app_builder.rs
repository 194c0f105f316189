//! # Campaign Service アプリケーション構築
//!
//! DI（リポジトリ・ユースケース・State）の初期化とルーター構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use mailflow_domain::{clock::Clock, smtp_config::SmtpFallback};
use mailflow_infra::{
    KvStore,
    MailSender,
    repository::{
        CampaignRecipientRepository,
        CampaignRepository,
        KvCampaignRecipientRepository,
        KvCampaignRepository,
        KvDeliveryLogRepository,
        KvSmtpConfigRepository,
        KvTemplateRepository,
        KvTrackingTokenRepository,
        TemplateRepository,
    },
};
use tower_http::trace::TraceLayer;

use crate::{
    config::DeliverySettings,
    error::CampaignServiceError,
    handler::{
        AnalyticsState,
        CampaignState,
        EmailState,
        ReadinessState,
        SmtpConfigState,
        TemplateState,
        TrackingState,
        get_analytics,
        get_campaign,
        get_smtp_config,
        get_template,
        health_check,
        list_campaigns,
        list_templates,
        readiness_check,
        save_smtp_config,
        save_template,
        send_campaign,
        send_email,
        send_welcome_email,
        test_smtp,
        track_click,
        track_open,
    },
    usecase::{
        AnalyticsUseCaseImpl,
        CampaignSettings,
        CampaignUseCaseImpl,
        KeyedLocks,
        MailTransport,
        SmtpConfigUseCaseImpl,
        SystemMailRenderer,
        SystemMailUseCaseImpl,
        TemplateUseCaseImpl,
        TrackingService,
    },
};

/// アプリケーションの外部依存
///
/// 本番では Redis / SMTP、テストではインメモリ実装とモックを渡す。
pub struct AppDependencies {
    pub kv_store:      Arc<dyn KvStore>,
    pub mail_sender:   Arc<dyn MailSender>,
    pub clock:         Arc<dyn Clock>,
    pub settings:      DeliverySettings,
    pub smtp_fallback: SmtpFallback,
}

/// DI コンテナの構築とルーター定義を行う
///
/// リポジトリ → ユースケース → State → Router の順に組み立てる。
/// キャンペーン単位のロックは送信処理とトラッキングで同じインスタンスを共有する。
pub fn build_app(deps: AppDependencies) -> Result<Router, CampaignServiceError> {
    let AppDependencies {
        kv_store,
        mail_sender,
        clock,
        settings,
        smtp_fallback,
    } = deps;

    // リポジトリ
    let template_repository: Arc<dyn TemplateRepository> =
        Arc::new(KvTemplateRepository::new(kv_store.clone()));
    let campaign_repository: Arc<dyn CampaignRepository> =
        Arc::new(KvCampaignRepository::new(kv_store.clone()));
    let recipient_repository: Arc<dyn CampaignRecipientRepository> =
        Arc::new(KvCampaignRecipientRepository::new(kv_store.clone()));
    let locks = Arc::new(KeyedLocks::new());

    // SMTP 設定と送信
    let smtp_config = Arc::new(SmtpConfigUseCaseImpl::new(
        Arc::new(KvSmtpConfigRepository::new(kv_store.clone())),
        smtp_fallback,
        clock.clone(),
    ));
    let transport = Arc::new(MailTransport::new(
        smtp_config.clone(),
        mail_sender,
        Arc::new(KvDeliveryLogRepository::new(kv_store.clone())),
        clock.clone(),
    ));
    let system_mail = Arc::new(SystemMailUseCaseImpl::new(
        transport.clone(),
        SystemMailRenderer::new()?,
    ));

    // トラッキング
    let tracking = TrackingService::new(
        Arc::new(KvTrackingTokenRepository::new(kv_store.clone())),
        recipient_repository.clone(),
        campaign_repository.clone(),
        locks.clone(),
        clock.clone(),
        &settings.default_redirect_url,
        settings.tracking_write_timeout,
    );

    // State
    let readiness_state = Arc::new(ReadinessState { kv_store });
    let template_state = Arc::new(TemplateState {
        usecase: TemplateUseCaseImpl::new(template_repository.clone(), clock.clone()),
    });
    let email_state = Arc::new(EmailState {
        usecase: system_mail.clone(),
    });
    let smtp_config_state = Arc::new(SmtpConfigState {
        usecase: smtp_config,
        system_mail,
    });
    let campaign_state = Arc::new(CampaignState {
        usecase: CampaignUseCaseImpl::new(
            campaign_repository.clone(),
            recipient_repository,
            template_repository.clone(),
            transport,
            Arc::new(tracking.clone()),
            locks,
            clock,
            CampaignSettings {
                concurrency:       settings.campaign_concurrency,
                tracking_base_url: settings.tracking_base_url,
            },
        ),
    });
    let tracking_state = Arc::new(TrackingState { service: tracking });
    let analytics_state = Arc::new(AnalyticsState {
        usecase: AnalyticsUseCaseImpl::new(campaign_repository, template_repository),
    });

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(readiness_state)
        // テンプレート API
        .route("/email/template", post(save_template))
        .route("/email/templates", get(list_templates))
        .route("/email/template/{name}", get(get_template))
        .with_state(template_state)
        // 単発送信 API
        .route("/email/send", post(send_email))
        .route("/email/welcome", post(send_welcome_email))
        .with_state(email_state)
        // キャンペーン API
        .route("/email/campaign/send", post(send_campaign))
        .route("/email/campaigns", get(list_campaigns))
        .route("/email/campaign/{name}", get(get_campaign))
        .with_state(campaign_state)
        // トラッキング API
        .route("/email/track/open/{token}", get(track_open))
        .route("/email/track/click/{token}", get(track_click))
        .with_state(tracking_state)
        // 配信分析 API
        .route("/email/analytics", get(get_analytics))
        .with_state(analytics_state)
        // 管理 API
        .route(
            "/admin/smtp-config",
            get(get_smtp_config).post(save_smtp_config),
        )
        .route("/admin/test-smtp", post(test_smtp))
        .with_state(smtp_config_state)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}
