//! # トラッキング用の HTML 書き換え
//!
//! キャンペーンメールの本文に開封ピクセルとクリック計測用リンクを埋め込む。
//!
//! - 絶対 URL（`http://` / `https://`）の `<a href>` をクリック計測エンドポイント経由に書き換える
//! - 1×1 の開封ピクセルを `</body>` の直前に挿入する（`</body>` が無ければ末尾に追加）
//!
//! 相対 URL、`mailto:`、アンカーリンクは書き換えない。

use std::sync::LazyLock;

use mailflow_domain::tracking::TrackingToken;
use regex::{Captures, Regex};

/// `<a ... href="http(s)://...">` の href 値を取り出す
///
/// 二重引用符の値は `'` を、単一引用符の値は `"` を含んでよい。
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<a\b[^>]*?\bhref\s*=\s*)(?:"(https?://[^"]*)"|'(https?://[^']*)')"#)
        .expect("静的な正規表現")
});

/// `</body>` タグ（大文字小文字を区別しない）
static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("静的な正規表現"));

/// 開封ピクセルの URL
pub fn open_pixel_url(base_url: &str, token: &TrackingToken) -> String {
    format!("{}/email/track/open/{token}", base_url.trim_end_matches('/'))
}

/// クリック計測用の URL
///
/// 元の URL はクエリパラメータ `url` にパーセントエンコードして載せる。
pub fn click_url(base_url: &str, token: &TrackingToken, destination: &str) -> String {
    format!(
        "{}/email/track/click/{token}?url={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(destination)
    )
}

/// 本文にトラッキングを埋め込む
pub fn inject_tracking(html: &str, base_url: &str, token: &TrackingToken) -> String {
    let rewritten = ANCHOR_HREF.replace_all(html, |caps: &Captures<'_>| {
        let (quote, value) = match (caps.get(2), caps.get(3)) {
            (Some(value), _) => ('"', value.as_str()),
            (None, Some(value)) => ('\'', value.as_str()),
            (None, None) => return caps[0].to_string(),
        };
        // 属性値の中の &amp; は実際の URL では & を表す
        let destination = value.replace("&amp;", "&");
        format!(
            "{}{quote}{}{quote}",
            &caps[1],
            click_url(base_url, token, &destination)
        )
    });

    let pixel = format!(
        r#"<img src="{}" width="1" height="1" alt="" style="display:none" />"#,
        open_pixel_url(base_url, token)
    );

    match BODY_CLOSE.find(&rewritten) {
        Some(m) => {
            let mut html = String::with_capacity(rewritten.len() + pixel.len());
            html.push_str(&rewritten[..m.start()]);
            html.push_str(&pixel);
            html.push_str(&rewritten[m.start()..]);
            html
        }
        None => format!("{rewritten}{pixel}"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const BASE: &str = "https://track.example.com";

    fn token() -> TrackingToken {
        TrackingToken::from_string("abc123")
    }

    #[test]
    fn test_絶対urlのリンクをクリック計測経由に書き換える() {
        let html = r#"<p><a href="https://shop.example.com/sale?a=1&amp;b=2">Sale</a></p>"#;

        let result = inject_tracking(html, BASE, &token());

        assert!(result.contains(
            r#"<a href="https://track.example.com/email/track/click/abc123?url=https%3A%2F%2Fshop.example.com%2Fsale%3Fa%3D1%26b%3D2">Sale</a>"#
        ));
    }

    #[rstest]
    #[case(r#"<a href="/relative">x</a>"#)]
    #[case(r#"<a href="mailto:info@example.com">x</a>"#)]
    #[case(r##"<a href="#top">x</a>"##)]
    fn test_絶対url以外のリンクは書き換えない(#[case] html: &str) {
        let result = inject_tracking(html, BASE, &token());

        assert!(result.starts_with(html));
    }

    #[test]
    fn test_属性の順序や引用符が異なっても書き換える() {
        let html = r#"<A class='btn' HREF='http://example.com/'>x</A>"#;

        let result = inject_tracking(html, BASE, &token());

        assert!(result.contains(
            "HREF='https://track.example.com/email/track/click/abc123?url=http%3A%2F%2Fexample.com%2F'"
        ));
    }

    #[test]
    fn test_二重引用符のurlに含まれるアポストロフィも書き換え対象に含める() {
        let html = r#"<a href="https://a.com/?q=don't">x</a>"#;

        let result = inject_tracking(html, BASE, &token());

        assert!(result.starts_with(
            r#"<a href="https://track.example.com/email/track/click/abc123?url=https%3A%2F%2Fa.com%2F%3Fq%3Ddon%27t">x</a>"#
        ));
    }

    #[test]
    fn test_単一引用符のurlに含まれる二重引用符も書き換え対象に含める() {
        let html = r#"<a href='https://a.com/"x"'>x</a>"#;

        let result = inject_tracking(html, BASE, &token());

        assert!(result.starts_with(
            "<a href='https://track.example.com/email/track/click/abc123?url=https%3A%2F%2Fa.com%2F%22x%22'>x</a>"
        ));
    }

    #[test]
    fn test_開封ピクセルはbody終了タグの直前に入る() {
        let html = "<html><body><p>Hi</p></BODY></html>";

        let result = inject_tracking(html, BASE, &token());

        assert_eq!(
            result,
            r#"<html><body><p>Hi</p><img src="https://track.example.com/email/track/open/abc123" width="1" height="1" alt="" style="display:none" /></BODY></html>"#
        );
    }

    #[test]
    fn test_body終了タグが無ければ末尾に開封ピクセルを追加する() {
        let result = inject_tracking("<p>Hi</p>", "https://track.example.com/", &token());

        assert!(result.starts_with("<p>Hi</p><img src=\"https://track.example.com/email/track/open/abc123\""));
    }
}
