//! # 配信分析
//!
//! キャンペーンのカウンタから開封率・クリック率を算出する。
//!
//! 率は `part / sent * 100` で計算し、`[0, 100]` に丸め込む。
//! `sent == 0` の場合は 0 とする（ゼロ除算しない）。
//! JSON では小数点以下 2 桁の文字列（例: `"42.50"`）として出力する。

use serde::{Serialize, Serializer};

use crate::campaign::Campaign;

/// 百分率（値オブジェクト）
///
/// # 不変条件
///
/// - 常に `0.0 <= value <= 100.0`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rate(f64);

impl Rate {
    pub const ZERO: Rate = Rate(0.0);

    /// `part / total` を百分率で求める
    pub fn of(part: u64, total: u64) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let value = part as f64 / total as f64 * 100.0;
        Self(value.clamp(0.0, 100.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// キャンペーン単位の分析結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAnalytics {
    pub name:          String,
    pub sent_count:    u64,
    pub opened_count:  u64,
    pub clicked_count: u64,
    pub open_rate:     Rate,
    pub click_rate:    Rate,
}

impl CampaignAnalytics {
    pub fn from_campaign(campaign: &Campaign) -> Self {
        Self {
            name:          campaign.name().to_string(),
            sent_count:    campaign.sent_count(),
            opened_count:  campaign.opened_count(),
            clicked_count: campaign.clicked_count(),
            open_rate:     Rate::of(campaign.opened_count(), campaign.sent_count()),
            click_rate:    Rate::of(campaign.clicked_count(), campaign.sent_count()),
        }
    }
}

/// 全体の分析サマリ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_campaigns: u64,
    pub total_templates: u64,
    pub total_sent:      u64,
    pub total_opened:    u64,
    pub total_clicked:   u64,
    pub open_rate:       Rate,
    pub click_rate:      Rate,
}

impl AnalyticsSummary {
    /// キャンペーン一覧とテンプレート数からサマリを集計する
    pub fn aggregate(campaigns: &[Campaign], total_templates: usize) -> Self {
        let total_sent: u64 = campaigns.iter().map(Campaign::sent_count).sum();
        let total_opened: u64 = campaigns.iter().map(Campaign::opened_count).sum();
        let total_clicked: u64 = campaigns.iter().map(Campaign::clicked_count).sum();

        Self {
            total_campaigns: campaigns.len() as u64,
            total_templates: total_templates as u64,
            total_sent,
            total_opened,
            total_clicked,
            open_rate: Rate::of(total_opened, total_sent),
            click_rate: Rate::of(total_clicked, total_sent),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{campaign::CampaignName, template::TemplateName};

    fn make_campaign(name: &str, sent: u64, failed: u64, opened: u64, clicked: u64) -> Campaign {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut campaign = Campaign::start(
            CampaignName::new(name).unwrap(),
            TemplateName::new("greeting").unwrap(),
            (sent + failed) as usize,
            None,
            now,
        )
        .unwrap()
        .complete(sent, failed, now)
        .unwrap();
        for _ in 0..opened {
            campaign = campaign.record_open();
        }
        for _ in 0..clicked {
            campaign = campaign.record_click();
        }
        campaign
    }

    #[rstest]
    #[case(0, 0, "0.00")]
    #[case(5, 0, "0.00")]
    #[case(1, 3, "33.33")]
    #[case(2, 3, "66.67")]
    #[case(3, 3, "100.00")]
    #[case(7, 3, "100.00")]
    fn test_rateは0から100に収まり小数2桁で表示される(
        #[case] part: u64,
        #[case] total: u64,
        #[case] expected: &str,
    ) {
        let rate = Rate::of(part, total);

        assert!((0.0..=100.0).contains(&rate.value()));
        assert_eq!(rate.to_string(), expected);
    }

    #[test]
    fn test_rateは文字列としてシリアライズされる() {
        assert_eq!(serde_json::to_value(Rate::of(1, 8)).unwrap(), "12.50");
    }

    #[test]
    fn test_aggregateで全キャンペーンを合算する() {
        let campaigns = vec![
            make_campaign("a", 4, 0, 2, 1),
            make_campaign("b", 6, 2, 3, 0),
        ];

        let summary = AnalyticsSummary::aggregate(&campaigns, 5);

        assert_eq!(summary.total_campaigns, 2);
        assert_eq!(summary.total_templates, 5);
        assert_eq!(summary.total_sent, 10);
        assert_eq!(summary.total_opened, 5);
        assert_eq!(summary.total_clicked, 1);
        assert_eq!(summary.open_rate.to_string(), "50.00");
        assert_eq!(summary.click_rate.to_string(), "10.00");
    }

    #[test]
    fn test_送信0件のキャンペーンは率が0になる() {
        let analytics = CampaignAnalytics::from_campaign(&make_campaign("c", 0, 2, 0, 0));

        assert_eq!(analytics.open_rate, Rate::ZERO);
        assert_eq!(analytics.click_rate, Rate::ZERO);
    }

    #[test]
    fn test_キャンペーンが無ければ全体の率も0() {
        let summary = AnalyticsSummary::aggregate(&[], 0);

        assert_eq!(summary.total_sent, 0);
        assert_eq!(summary.open_rate, Rate::ZERO);
    }
}
