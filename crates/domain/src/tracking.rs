//! # 開封・クリック計測
//!
//! メール本文に埋め込むトラッキングトークンと、トラッキングピクセルを定義する。
//!
//! トークンは UUID v4 由来の不透明な文字列であり、キャンペーン名や
//! メールアドレスを含まない。トークンから受信者への解決は
//! `tracking-token:{token}` に保存された [`TrackingTarget`] のみを根拠とする
//! （キャンペーン名・アドレスに区切り文字が含まれても曖昧にならない）。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaign::CampaignName;

/// 1×1 透過 GIF（43 バイト）
pub const TRANSPARENT_PIXEL_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// トラッキングトークン
///
/// 生成には UUID v4（122 bit の乱数）を使い、ハイフン無しの 32 文字 16 進数で表現する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingToken(String);

impl TrackingToken {
    /// 新しいトークンを生成する
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// リクエストパスなどから受け取った文字列をトークンとして扱う
    ///
    /// 形式の検証は行わない。存在しないトークンは参照時に見つからないだけで、
    /// 呼び出し元にエラーを見せない。
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// トークンが指す受信者（キャンペーン名とメールアドレスの組）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingTarget {
    pub campaign_name: CampaignName,
    pub email:         String,
}
