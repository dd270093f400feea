// Shared formatting helpers for SVG attributes and report markup.

use std::borrow::Cow;

pub(crate) const BLANK_URL: &str = "about:blank";

/// Stringifies a number the way `Element.setAttribute` would (`Number#toString()`), without
/// `-0` or non-finite values.
pub(crate) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let v = if v == 0.0 { 0.0 } else { v };
    let mut buf = ryu_js::Buffer::new();
    buf.format_finite(v).to_string()
}

pub(crate) fn escape_html(text: &str) -> Cow<'_, str> {
    htmlize::escape_all_quotes(text)
}

/// Link target for a report entry. Only web and mail schemes are clickable.
pub(crate) fn safe_href(url: &str) -> Cow<'_, str> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "mailto") => {
            escape_html(url)
        }
        _ => Cow::Borrowed(BLANK_URL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_follow_js_stringification() {
        assert_eq!(fmt(100.0), "100");
        assert_eq!(fmt(12.5), "12.5");
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(f64::NAN), "0");
        assert_eq!(fmt(1e21), "1e+21");
    }

    #[test]
    fn markup_and_both_quotes_are_escaped() {
        let out = escape_html(r#"<a href="x">it's & more</a>"#);
        assert!(out.starts_with("&lt;a href=&quot;x&quot;&gt;it"), "{out}");
        assert!(out.contains(" &amp; more&lt;/a&gt;"), "{out}");
        assert!(!out.contains('\''), "{out}");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn only_web_links_are_clickable() {
        assert_eq!(
            safe_href("https://github.com/team-mirai/policy/pull/1"),
            "https://github.com/team-mirai/policy/pull/1"
        );
        assert_eq!(safe_href("javascript:alert(1)"), BLANK_URL);
        assert_eq!(safe_href("N/A (url missing)"), BLANK_URL);
        assert_eq!(safe_href("https://x.test/?a=1&b=2"), "https://x.test/?a=1&amp;b=2");
    }
}
