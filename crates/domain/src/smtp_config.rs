//! # SMTP 接続設定
//!
//! 送信に使用する SMTP サーバーの接続情報（シングルトン）を表現する。
//!
//! ## 設計方針
//!
//! - **保存値優先のマージ**: 永続化された設定を環境変数由来の [`SmtpFallback`] に重ねる
//! - **資格情報の秘匿**: [`SmtpSecret`] は `Debug` をマスクし、表示用には
//!   [`SmtpConfig::masked`] で固定マスク文字列に置き換えたビューを返す
//! - **構成済み判定**: ホスト名・ユーザー名・パスワードがすべて揃っている場合のみ送信可能

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// ポート未指定時のデフォルト（STARTTLS）
pub const DEFAULT_PORT: u16 = 587;

/// 暗黙的 TLS（SMTPS）で接続するポート
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// 送信元アドレス未指定時のデフォルト
pub const DEFAULT_FROM_EMAIL: &str = "noreply@magrstore.com";

/// 送信元表示名未指定時のデフォルト
pub const DEFAULT_FROM_NAME: &str = "MAGR Store";

/// 表示用に資格情報を置き換える固定文字列
pub const CREDENTIAL_MASK: &str = "••••••••";

/// SMTP パスワード
///
/// シリアライズは平文（KV ストアへの保存に必要）だが、
/// `Debug` 出力は `[REDACTED]` にマスクされる。
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SmtpSecret(String);

impl SmtpSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 平文を取得する（送信処理でのみ使用する）
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SmtpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SmtpSecret").field(&"[REDACTED]").finish()
    }
}

/// SMTP 接続設定
///
/// `Default` はゼロ値（未構成）を表す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpConfig {
    pub hostname:   String,
    pub port:       u16,
    pub username:   String,
    pub password:   SmtpSecret,
    pub from_email: String,
    pub from_name:  String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 環境変数から与えられる SMTP 設定の既定値
///
/// 永続化された設定が無い、または一部のフィールドが空の場合に使用する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpFallback {
    pub hostname:   Option<String>,
    pub port:       Option<u16>,
    pub username:   Option<String>,
    pub password:   Option<SmtpSecret>,
    pub from_email: Option<String>,
    pub from_name:  Option<String>,
}

impl SmtpFallback {
    /// いずれのフィールドも設定されていないか
    pub fn is_empty(&self) -> bool {
        self.hostname.is_none()
            && self.port.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.from_email.is_none()
            && self.from_name.is_none()
    }
}

/// 保存リクエストから組み立てる SMTP 設定の下書き
#[derive(Debug, Clone, Default)]
pub struct SmtpConfigDraft {
    pub hostname:   String,
    pub port:       Option<u16>,
    pub username:   String,
    pub password:   String,
    pub from_email: Option<String>,
    pub from_name:  Option<String>,
}

impl SmtpConfigDraft {
    /// 下書きを検証して保存可能な設定に変換する
    ///
    /// ホスト名・ポート・ユーザー名・パスワードは必須。
    /// 送信元アドレス・表示名が空の場合は `fallback`、次に組み込みの既定値を使う。
    pub fn validate(
        self,
        fallback: &SmtpFallback,
        now: DateTime<Utc>,
    ) -> Result<SmtpConfig, DomainError> {
        let hostname = self.hostname.trim().to_string();
        let username = self.username.trim().to_string();
        let port = self.port.filter(|p| *p != 0);

        let Some(port) = port else {
            return Err(DomainError::Validation("ポート番号は必須です".to_string()));
        };
        if hostname.is_empty() {
            return Err(DomainError::Validation("ホスト名は必須です".to_string()));
        }
        if username.is_empty() {
            return Err(DomainError::Validation("ユーザー名は必須です".to_string()));
        }
        if self.password.is_empty() {
            return Err(DomainError::Validation("パスワードは必須です".to_string()));
        }

        Ok(SmtpConfig {
            hostname,
            port,
            username,
            password: SmtpSecret::new(self.password),
            from_email: non_empty(self.from_email)
                .or_else(|| fallback.from_email.clone())
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            from_name: non_empty(self.from_name)
                .or_else(|| fallback.from_name.clone())
                .unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            updated_at: Some(now),
        })
    }
}

impl SmtpConfig {
    /// 永続化された設定を環境変数の既定値に重ねて有効な設定を求める
    ///
    /// どちらも存在しない場合は `None`（ゼロ値扱い）を返す。
    /// 永続化された値が空でなければそちらを優先する。
    pub fn resolve(persisted: Option<SmtpConfig>, fallback: &SmtpFallback) -> Option<SmtpConfig> {
        if persisted.is_none() && fallback.is_empty() {
            return None;
        }
        let persisted = persisted.unwrap_or_default();

        Some(SmtpConfig {
            hostname:   prefer(persisted.hostname, &fallback.hostname),
            port:       Some(persisted.port)
                .filter(|p| *p != 0)
                .or(fallback.port)
                .unwrap_or(DEFAULT_PORT),
            username:   prefer(persisted.username, &fallback.username),
            password:   if persisted.password.is_empty() {
                fallback.password.clone().unwrap_or_default()
            } else {
                persisted.password
            },
            from_email: Some(prefer(persisted.from_email, &fallback.from_email))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            from_name:  Some(prefer(persisted.from_name, &fallback.from_name))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            updated_at: persisted.updated_at,
        })
    }

    /// 送信に必要な情報（ホスト名・ユーザー名・パスワード）が揃っているか
    pub fn is_configured(&self) -> bool {
        !self.hostname.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }

    /// 暗黙的 TLS で接続すべきポートか
    pub fn uses_implicit_tls(&self) -> bool {
        self.port == IMPLICIT_TLS_PORT
    }

    /// 資格情報をマスクした表示用ビューを返す
    pub fn masked(&self) -> MaskedSmtpConfig {
        MaskedSmtpConfig {
            hostname:   self.hostname.clone(),
            port:       self.port,
            username:   self.username.clone(),
            password:   if self.password.is_empty() {
                String::new()
            } else {
                CREDENTIAL_MASK.to_string()
            },
            from_email: self.from_email.clone(),
            from_name:  self.from_name.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// 表示用の SMTP 設定（パスワードはマスク済み）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedSmtpConfig {
    pub hostname:   String,
    pub port:       u16,
    pub username:   String,
    pub password:   String,
    pub from_email: String,
    pub from_name:  String,
    pub updated_at: Option<DateTime<Utc>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn prefer(persisted: String, fallback: &Option<String>) -> String {
    if persisted.is_empty() {
        fallback.clone().unwrap_or_default()
    } else {
        persisted
    }
}
