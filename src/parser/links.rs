use scraper::{Html, Selector};
use tracing::{debug, warn};

const ANCHOR_SELECTOR: &str = "body a";

/// Raw `href` values of every anchor in an article body, in document order.
///
/// Markup is parsed leniently; input with no recoverable anchors yields an
/// empty list instead of an error, so one bad article never stops a run.
pub fn extract_links(rendered_body: &str) -> Vec<String> {
    let selector = match Selector::parse(ANCHOR_SELECTOR) {
        Ok(s) => s,
        Err(e) => {
            warn!("Anchor selector {:?} rejected: {:?}", ANCHOR_SELECTOR, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(rendered_body);
    if !document.errors.is_empty() {
        debug!("Markup parsed with {} recoverable errors", document.errors.len());
    }

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_in_body() {
        let html = r#"<p>see <a href="https://www.amazon.co.jp/dp/1">book</a> and
            <a href="https://example.com/">site</a></p>"#;
        assert_eq!(
            extract_links(html),
            vec!["https://www.amazon.co.jp/dp/1", "https://example.com/"]
        );
    }

    #[test]
    fn nested_and_repeated() {
        let html = r#"<div><ul><li><a href="L1">a</a></li><li><a href="L1">b</a></li></ul></div>"#;
        assert_eq!(extract_links(html), vec!["L1", "L1"]);
    }

    #[test]
    fn anchor_without_href_skipped() {
        let html = r#"<a name="top">top</a><a href="x">x</a>"#;
        assert_eq!(extract_links(html), vec!["x"]);
    }

    #[test]
    fn href_kept_raw() {
        let html = r#"<a href="https://www.amazon.com/s?k=rust%20book">q</a>"#;
        assert_eq!(extract_links(html), vec!["https://www.amazon.com/s?k=rust%20book"]);
    }

    #[test]
    fn broken_markup_does_not_panic() {
        assert!(extract_links("<<<>>> </a <a").is_empty());
        assert!(extract_links("").is_empty());
        assert!(extract_links("\u{0}\u{0}<div").is_empty());
    }

    #[test]
    fn unclosed_tags_still_yield_links() {
        let html = r#"<div><p><a href="https://www.amazon.com/x">unterminated"#;
        assert_eq!(extract_links(html), vec!["https://www.amazon.com/x"]);
    }
}
