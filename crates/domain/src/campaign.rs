//! # キャンペーン
//!
//! テンプレートと受信者リストに対する一回の一括送信を表現する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 備考 |
//! |---|------------|------|
//! | [`Campaign`] | キャンペーン | 送信時に作成され、以後はカウンタのみ更新される |
//! | [`CampaignRecipient`] | キャンペーン受信者 | キー: (キャンペーン名, メールアドレス) |
//! | [`Recipient`] | 送信対象 | 送信リクエストで渡されるメールアドレスと任意の名前 |
//!
//! ## 状態遷移
//!
//! ```text
//! Sending ──(全受信者が sent / failed に確定)──→ Completed
//! ```
//!
//! 下書き・編集フェーズは存在しない。送信開始後はトラッキングによる
//! 開封数・クリック数の加算のみが行われる。
//!
//! ## 不変条件
//!
//! - 完了時に `sent_count + failed_count == recipient_count`
//! - 受信者の `opened` / `clicked` は false → true に高々 1 回だけ遷移する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, template::TemplateName, tracking::TrackingToken};

define_validated_string! {
    /// キャンペーン名（値オブジェクト）
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 最大 200 文字
    pub struct CampaignName {
        label: "キャンペーン名",
        max_length: 200,
    }
}

/// キャンペーンのステータス
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CampaignStatus {
    /// 送信中
    Sending,
    /// 全受信者の送信結果が確定済み
    Completed,
}

/// 受信者ごとの送信結果
///
/// 1 回の送信試行につき 1 度だけ設定され、以後変わらない。
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
pub enum RecipientStatus {
    Sent,
    Failed,
}

/// 送信対象（リクエストで渡される受信者）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(default)]
    pub name:  Option<String>,
}

impl Recipient {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }

    /// 空白のみの名前は「名前なし」として扱う
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

// =========================================================================
// Campaign（キャンペーンエンティティ）
// =========================================================================

/// キャンペーンエンティティ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    name:            CampaignName,
    template_name:   TemplateName,
    recipient_count: u64,
    sent_count:      u64,
    failed_count:    u64,
    opened_count:    u64,
    clicked_count:   u64,
    status:          CampaignStatus,
    scheduled_at:    Option<DateTime<Utc>>,
    created_at:      DateTime<Utc>,
    completed_at:    Option<DateTime<Utc>>,
}

impl Campaign {
    /// 送信開始時点のキャンペーンを作成する
    ///
    /// 受信者が 0 件の場合はバリデーションエラー。
    pub fn start(
        name: CampaignName,
        template_name: TemplateName,
        recipient_count: usize,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if recipient_count == 0 {
            return Err(DomainError::Validation(
                "受信者を 1 件以上指定してください".to_string(),
            ));
        }

        Ok(Self {
            name,
            template_name,
            recipient_count: recipient_count as u64,
            sent_count: 0,
            failed_count: 0,
            opened_count: 0,
            clicked_count: 0,
            status: CampaignStatus::Sending,
            scheduled_at,
            created_at: now,
            completed_at: None,
        })
    }

    /// 送信結果を確定してキャンペーンを完了する
    ///
    /// `sent + failed` が受信者数と一致しない場合はエラー。
    pub fn complete(self, sent: u64, failed: u64, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if sent + failed != self.recipient_count {
            return Err(DomainError::Validation(format!(
                "送信結果の合計（{}）が受信者数（{}）と一致しません",
                sent + failed,
                self.recipient_count
            )));
        }

        Ok(Self {
            sent_count: sent,
            failed_count: failed,
            status: CampaignStatus::Completed,
            completed_at: Some(now),
            ..self
        })
    }

    /// 開封数を 1 加算する
    pub fn record_open(self) -> Self {
        Self {
            opened_count: self.opened_count.saturating_add(1),
            ..self
        }
    }

    /// クリック数を 1 加算する
    pub fn record_click(self) -> Self {
        Self {
            clicked_count: self.clicked_count.saturating_add(1),
            ..self
        }
    }

    // Getter メソッド

    pub fn name(&self) -> &CampaignName {
        &self.name
    }

    pub fn template_name(&self) -> &TemplateName {
        &self.template_name
    }

    pub fn recipient_count(&self) -> u64 {
        self.recipient_count
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count
    }

    pub fn opened_count(&self) -> u64 {
        self.opened_count
    }

    pub fn clicked_count(&self) -> u64 {
        self.clicked_count
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

// =========================================================================
// CampaignRecipient（キャンペーン受信者エンティティ）
// =========================================================================

/// キャンペーン受信者エンティティ
///
/// 送信試行の結果とトラッキング状態を保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecipient {
    campaign_name:  CampaignName,
    email:          String,
    name:           Option<String>,
    status:         RecipientStatus,
    tracking_token: TrackingToken,
    opened:         bool,
    opened_at:      Option<DateTime<Utc>>,
    clicked:        bool,
    clicked_at:     Option<DateTime<Utc>>,
    sent_at:        DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error:          Option<String>,
}

impl CampaignRecipient {
    /// 送信試行の結果から受信者レコードを作成する
    pub fn new(
        campaign_name: CampaignName,
        recipient: Recipient,
        status: RecipientStatus,
        tracking_token: TrackingToken,
        error: Option<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            campaign_name,
            email: recipient.email,
            name: recipient.name,
            status,
            tracking_token,
            opened: false,
            opened_at: None,
            clicked: false,
            clicked_at: None,
            sent_at,
            error,
        }
    }

    /// 開封済みにする
    ///
    /// 未開封から開封済みに遷移した場合のみ `true` を返す。
    pub fn mark_opened(&mut self, now: DateTime<Utc>) -> bool {
        if self.opened {
            return false;
        }
        self.opened = true;
        self.opened_at = Some(now);
        true
    }

    /// クリック済みにする
    ///
    /// 未クリックからクリック済みに遷移した場合のみ `true` を返す。
    pub fn mark_clicked(&mut self, now: DateTime<Utc>) -> bool {
        if self.clicked {
            return false;
        }
        self.clicked = true;
        self.clicked_at = Some(now);
        true
    }

    // Getter メソッド

    pub fn campaign_name(&self) -> &CampaignName {
        &self.campaign_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn status(&self) -> RecipientStatus {
        self.status
    }

    pub fn tracking_token(&self) -> &TrackingToken {
        &self.tracking_token
    }

    pub fn opened(&self) -> bool {
        self.opened
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn clicked(&self) -> bool {
        self.clicked
    }

    pub fn clicked_at(&self) -> Option<DateTime<Utc>> {
        self.clicked_at
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn make_campaign(recipient_count: usize) -> Campaign {
        Campaign::start(
            CampaignName::new("spring-sale").unwrap(),
            TemplateName::new("greeting").unwrap(),
            recipient_count,
            None,
            now(),
        )
        .unwrap()
    }

    fn make_recipient() -> CampaignRecipient {
        CampaignRecipient::new(
            CampaignName::new("spring-sale").unwrap(),
            Recipient::new("a@x.com", Some("Ada".to_string())),
            RecipientStatus::Sent,
            TrackingToken::generate(),
            None,
            now(),
        )
    }

    #[test]
    fn test_startで送信中のキャンペーンが作成される() {
        let campaign = make_campaign(3);

        assert_eq!(campaign.status(), CampaignStatus::Sending);
        assert_eq!(campaign.recipient_count(), 3);
        assert_eq!(campaign.sent_count(), 0);
        assert_eq!(campaign.completed_at(), None);
    }

    #[test]
    fn test_受信者0件ではstartできない() {
        let result = Campaign::start(
            CampaignName::new("empty").unwrap(),
            TemplateName::new("greeting").unwrap(),
            0,
            None,
            now(),
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_completeで件数とステータスが確定する() {
        let completed = make_campaign(3).complete(2, 1, now()).unwrap();

        assert_eq!(completed.status(), CampaignStatus::Completed);
        assert_eq!(completed.sent_count(), 2);
        assert_eq!(completed.failed_count(), 1);
        assert_eq!(completed.completed_at(), Some(now()));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 1)]
    fn test_completeで合計が受信者数と一致しなければエラー(#[case] sent: u64, #[case] failed: u64) {
        let result = make_campaign(3).complete(sent, failed, now());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_完了後も開封数とクリック数を加算できる() {
        let campaign = make_campaign(1)
            .complete(1, 0, now())
            .unwrap()
            .record_open()
            .record_click()
            .record_click();

        assert_eq!(campaign.opened_count(), 1);
        assert_eq!(campaign.clicked_count(), 2);
    }

    #[test]
    fn test_mark_openedは初回のみtrueを返す() {
        let mut recipient = make_recipient();

        assert!(recipient.mark_opened(now()));
        assert!(!recipient.mark_opened(now()));
        assert!(recipient.opened());
        assert_eq!(recipient.opened_at(), Some(now()));
    }

    #[test]
    fn test_mark_clickedは開封状態に影響しない() {
        let mut recipient = make_recipient();

        assert!(recipient.mark_clicked(now()));
        assert!(!recipient.mark_clicked(now()));
        assert!(recipient.clicked());
        assert!(!recipient.opened());
    }

    #[test]
    fn test_ステータスはsnake_caseでシリアライズされる() {
        assert_eq!(
            serde_json::to_value(CampaignStatus::Completed).unwrap(),
            "completed"
        );
        assert_eq!(
            serde_json::to_value(RecipientStatus::Failed).unwrap(),
            "failed"
        );
    }

    #[rstest]
    #[case(Some("Ada"), Some("Ada"))]
    #[case(Some("  "), None)]
    #[case(None, None)]
    fn test_display_nameは空白のみの名前を無視する(
        #[case] name: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let recipient = Recipient::new("a@x.com", name.map(str::to_string));

        assert_eq!(recipient.display_name(), expected);
    }
}
