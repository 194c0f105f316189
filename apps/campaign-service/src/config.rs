//! # Campaign Service 設定
//!
//! 環境変数から Campaign Service サーバーの設定を読み込む。
//!
//! | 変数名 | デフォルト | 説明 |
//! |--------|-----------|------|
//! | `MAILFLOW_HOST` | `0.0.0.0` | バインドアドレス |
//! | `MAILFLOW_PORT` | `3100` | ポート番号 |
//! | `KV_BACKEND` | `memory` | `redis` / `memory` |
//! | `REDIS_URL` | なし | `KV_BACKEND=redis` の場合は必須 |
//! | `TRACKING_BASE_URL` | `http://localhost:3100` | 開封ピクセル・クリックリンクの公開 URL |
//! | `DEFAULT_REDIRECT_URL` | `https://magrstore.com` | クリック時の既定リダイレクト先 |
//! | `CAMPAIGN_CONCURRENCY` | `5` | キャンペーン送信の同時実行数 |
//! | `TRACKING_WRITE_TIMEOUT_MS` | `2000` | トラッキング書き込みの待ち時間上限 |
//! | `SMTP_TIMEOUT_SECS` | `30` | SMTP 送信のタイムアウト |
//! | `SMTP_HOST` ほか | なし | 永続化された SMTP 設定が無い場合の既定値 |

use std::{env, str::FromStr, time::Duration};

use mailflow_domain::smtp_config::{SmtpFallback, SmtpSecret};
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} の値が不正です: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} が設定されていません")]
    Missing(&'static str),
}

/// KV ストアのバックエンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvBackend {
    /// プロセス内メモリ（再起動で消える）
    Memory,
    /// Redis
    Redis { url: String },
}

/// Campaign Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CampaignServiceConfig {
    /// バインドアドレス
    pub host:          String,
    /// ポート番号
    pub port:          u16,
    /// KV ストアのバックエンド
    pub kv_backend:    KvBackend,
    /// 配信・トラッキングの設定
    pub delivery:      DeliverySettings,
    /// SMTP 送信のタイムアウト
    pub smtp_timeout:  Duration,
    /// SMTP 設定の環境変数既定値
    pub smtp_fallback: SmtpFallback,
}

/// 配信・トラッキングの設定
///
/// テストからも組み立てられるよう、環境変数に依存しない形で保持する。
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// 開封ピクセル・クリックリンクに使う公開ベース URL（末尾の `/` なし）
    pub tracking_base_url:      String,
    /// クリック時に有効な URL が無い場合のリダイレクト先
    pub default_redirect_url:   String,
    /// キャンペーン送信の同時実行数
    pub campaign_concurrency:   usize,
    /// トラッキングの状態更新を待つ上限
    pub tracking_write_timeout: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            tracking_base_url:      "http://localhost:3100".to_string(),
            default_redirect_url:   "https://magrstore.com".to_string(),
            campaign_concurrency:   5,
            tracking_write_timeout: Duration::from_millis(2000),
        }
    }
}

impl CampaignServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = DeliverySettings::default();

        let kv_backend = match env::var("KV_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .as_str()
        {
            "memory" => KvBackend::Memory,
            "redis" => KvBackend::Redis {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::Missing("REDIS_URL"))?,
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    name:  "KV_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let campaign_concurrency: usize = parse_or("CAMPAIGN_CONCURRENCY", 5)?;
        if campaign_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name:  "CAMPAIGN_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host: env::var("MAILFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("MAILFLOW_PORT", 3100)?,
            kv_backend,
            delivery: DeliverySettings {
                tracking_base_url: env::var("TRACKING_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.tracking_base_url),
                default_redirect_url: env::var("DEFAULT_REDIRECT_URL")
                    .unwrap_or(defaults.default_redirect_url),
                campaign_concurrency,
                tracking_write_timeout: Duration::from_millis(parse_or(
                    "TRACKING_WRITE_TIMEOUT_MS",
                    2000,
                )?),
            },
            smtp_timeout: Duration::from_secs(parse_or("SMTP_TIMEOUT_SECS", 30)?),
            smtp_fallback: SmtpFallback {
                hostname:   non_empty_var("SMTP_HOST"),
                port:       non_empty_var("SMTP_PORT")
                    .map(|v| parse_value("SMTP_PORT", &v))
                    .transpose()?,
                username:   non_empty_var("SMTP_USER"),
                password:   non_empty_var("SMTP_PASSWORD").map(SmtpSecret::new),
                from_email: non_empty_var("SMTP_FROM_EMAIL"),
                from_name:  non_empty_var("SMTP_FROM_NAME"),
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        Some(value) => parse_value(name, &value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}
