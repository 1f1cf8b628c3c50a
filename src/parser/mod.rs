pub mod links;
pub mod unescape;

use tracing::warn;

pub use links::extract_links;
pub use unescape::unescape_href;

/// Extracted hrefs of one article after unescaping, plus how many were dropped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArticleLinks {
    pub links: Vec<String>,
    pub skipped: usize,
}

/// Extract and unescape every anchor target in an article body.
pub fn article_links(identity: &str, rendered_body: &str) -> ArticleLinks {
    let mut out = ArticleLinks::default();
    for href in extract_links(rendered_body) {
        match unescape_href(&href) {
            Ok(link) => out.links.push(link),
            Err(e) => {
                warn!("Skipping href {:?} in article {}: {}", href, identity, e);
                out.skipped += 1;
            }
        }
    }
    out
}
