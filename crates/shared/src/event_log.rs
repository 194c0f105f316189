//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で配信状況を追跡できるよう、ログフィールドの命名規約と
//! ヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` に `error.category` + `error.kind` フィールドを直接追加する。
//! 定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティの識別子（テンプレート名、キャンペーン名など）
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const TEMPLATE: &str = "template";
        pub const CAMPAIGN: &str = "campaign";
        pub const DELIVERY: &str = "delivery";
        pub const TRACKING: &str = "tracking";
        pub const SETTINGS: &str = "settings";
    }

    /// イベントアクション
    pub mod action {
        // テンプレート
        pub const TEMPLATE_SAVED: &str = "template.saved";

        // キャンペーン
        pub const CAMPAIGN_STARTED: &str = "campaign.started";
        pub const CAMPAIGN_COMPLETED: &str = "campaign.completed";

        // 配信
        pub const EMAIL_SENT: &str = "email.sent";
        pub const EMAIL_FAILED: &str = "email.failed";
        pub const EMAIL_NOT_CONFIGURED: &str = "email.not_configured";

        // トラッキング
        pub const EMAIL_OPENED: &str = "email.opened";
        pub const LINK_CLICKED: &str = "link.clicked";

        // 設定
        pub const SMTP_CONFIG_SAVED: &str = "smtp_config.saved";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const TEMPLATE: &str = "template";
        pub const CAMPAIGN: &str = "campaign";
        pub const CAMPAIGN_RECIPIENT: &str = "campaign_recipient";
        pub const DELIVERY_LOG: &str = "delivery_log";
        pub const SMTP_CONFIG: &str = "smtp_config";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
        pub const SKIPPED: &str = "skipped";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（KV ストア）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（SMTP サーバー）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const STORAGE: &str = "storage";
        pub const SMTP: &str = "smtp";
        pub const INTERNAL: &str = "internal";
        pub const TRACKING: &str = "tracking";
    }
}
