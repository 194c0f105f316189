//! # メールメッセージ
//!
//! 送信処理（MailTransport → MailSender）に渡される 1 通分のメールと、
//! 送信失敗を表すエラー型を定義する。

use thiserror::Error;

/// メール送信エラー
#[derive(Debug, Error)]
pub enum MailError {
    /// 送信元・宛先アドレスが不正
    #[error("メールアドレスが不正です: {0}")]
    InvalidAddress(String),

    /// メッセージの構築に失敗
    #[error("メッセージ構築に失敗: {0}")]
    Build(String),

    /// SMTP サーバーへの接続・認証・送信に失敗
    #[error("SMTP 送信に失敗: {0}")]
    Transport(String),
}

/// メールメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:      String,
    /// 件名
    pub subject: String,
    /// HTML 本文
    pub html:    String,
    /// CC（カンマ区切りで複数指定可）
    pub cc:      Option<String>,
    /// BCC（カンマ区切りで複数指定可）
    pub bcc:     Option<String>,
}

impl EmailMessage {
    /// CC / BCC なしのメッセージを作成する
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to:      to.into(),
            subject: subject.into(),
            html:    html.into(),
            cc:      None,
            bcc:     None,
        }
    }

    pub fn with_cc(mut self, cc: Option<String>) -> Self {
        self.cc = cc.filter(|v| !v.trim().is_empty());
        self
    }

    pub fn with_bcc(mut self, bcc: Option<String>) -> Self {
        self.bcc = bcc.filter(|v| !v.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_空白のみのccとbccは無視される() {
        let message = EmailMessage::new("a@x.com", "件名", "<p>本文</p>")
            .with_cc(Some("  ".to_string()))
            .with_bcc(Some("b@x.com".to_string()));

        assert_eq!(message.cc, None);
        assert_eq!(message.bcc.as_deref(), Some("b@x.com"));
    }
}
