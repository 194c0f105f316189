//! # 配信ログ
//!
//! 送信試行ごとに 1 件追記される監査ログ。書き込み後に変更されることはない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::email::EmailMessage;

/// 配信ステータス
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    /// SMTP サーバーが受理した
    Sent,
    /// 接続・認証・送信のいずれかで失敗した
    Failed,
    /// SMTP 未構成のため送信しなかった（ネットワーク I/O なし）
    NotConfigured,
}

/// 配信ログエントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    pub to:      String,
    pub subject: String,
    pub html:    String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc:      Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc:     Option<String>,
    pub sent_at: DateTime<Utc>,
    pub status:  DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error:   Option<String>,
}

impl DeliveryLogEntry {
    /// 送信したメッセージと結果からエントリを作成する
    pub fn record(
        message: &EmailMessage,
        status: DeliveryStatus,
        error: Option<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            to: message.to.clone(),
            subject: message.subject.clone(),
            html: message.html.clone(),
            cc: message.cc.clone(),
            bcc: message.bcc.clone(),
            sent_at,
            status,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_recordでメッセージの内容が写される() {
        let sent_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let message = EmailMessage::new("a@x.com", "件名", "<p>本文</p>")
            .with_cc(Some("c@x.com".to_string()));

        let entry = DeliveryLogEntry::record(
            &message,
            DeliveryStatus::Failed,
            Some("connection refused".to_string()),
            sent_at,
        );

        assert_eq!(entry.to, "a@x.com");
        assert_eq!(entry.cc.as_deref(), Some("c@x.com"));
        assert_eq!(entry.bcc, None);
        assert_eq!(entry.status, DeliveryStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_not_configuredはsnake_caseでシリアライズされる() {
        assert_eq!(
            serde_json::to_value(DeliveryStatus::NotConfigured).unwrap(),
            "not_configured"
        );
    }
}
