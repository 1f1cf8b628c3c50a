use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::classify::LinkClassifier;
use crate::dedup::Deduplicator;
use crate::error::PipelineError;
use crate::parser;
use crate::source::{decode_page, Article, PageSource};

pub const DEFAULT_PAGE_COUNT: usize = 100;
pub const DEFAULT_PER_PAGE: usize = 100;

/// When to stop requesting pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopCondition {
    /// Always request exactly `page_count` pages, empty or not.
    #[default]
    FixedPageCount,
    /// Also stop after the first page holding fewer than `per_page` articles.
    ShortPage,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub page_count: usize,
    pub per_page: usize,
    pub stop: StopCondition,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_count: DEFAULT_PAGE_COUNT,
            per_page: DEFAULT_PER_PAGE,
            stop: StopCondition::FixedPageCount,
        }
    }
}

/// One row of the final tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCountRow {
    pub link: String,
    pub count: u64,
}

/// Link -> number of occurrences. Every stored count is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCounts {
    counts: HashMap<String, u64>,
}

impl LinkCounts {
    pub fn record(&mut self, link: String) {
        *self.counts.entry(link).or_insert(0) += 1;
    }

    #[cfg(test)]
    pub fn get(&self, link: &str) -> Option<u64> {
        self.counts.get(link).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Rows ordered by count (descending) then link, so output is repeatable.
    pub fn to_rows(&self) -> Vec<LinkCountRow> {
        let mut rows: Vec<LinkCountRow> = self
            .counts
            .iter()
            .map(|(link, &count)| LinkCountRow {
                link: link.clone(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.link.cmp(&b.link)));
        rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages: usize,
    pub articles: usize,
    pub duplicates: usize,
    pub skipped_hrefs: usize,
}

/// Per-run state: the seen set and the tally. Built fresh for every run.
pub struct Aggregator<'a> {
    classifier: &'a LinkClassifier,
    seen: Deduplicator,
    counts: LinkCounts,
    stats: RunStats,
}

impl<'a> Aggregator<'a> {
    pub fn new(classifier: &'a LinkClassifier) -> Self {
        Self {
            classifier,
            seen: Deduplicator::new(),
            counts: LinkCounts::default(),
            stats: RunStats::default(),
        }
    }

    /// Decode and absorb one page payload. Returns how many articles it held.
    pub fn ingest_page(&mut self, index: usize, payload: &str) -> Result<usize, PipelineError> {
        let articles = decode_page(payload).map_err(|source| PipelineError::Decode {
            page: index + 1,
            source,
        })?;
        self.stats.pages += 1;
        for article in &articles {
            self.ingest_article(article);
        }
        Ok(articles.len())
    }

    pub fn ingest_article(&mut self, article: &Article) {
        self.stats.articles += 1;
        if !self.seen.should_process(&article.identity) {
            debug!("Article {} already counted", article.identity);
            self.stats.duplicates += 1;
            return;
        }

        let extracted = parser::article_links(&article.identity, &article.rendered_body);
        self.stats.skipped_hrefs += extracted.skipped;
        for link in extracted.links {
            if self.classifier.is_target_link(&link) {
                self.counts.record(link);
            }
        }
    }

    pub fn finish(self) -> (LinkCounts, RunStats) {
        debug!("{} distinct articles processed", self.seen.len());
        (self.counts, self.stats)
    }
}

/// Walk every configured page, deduplicate articles and tally target links.
///
/// Any fetch or decode failure aborts the whole walk: a missing page would
/// quietly skew the counts.
pub async fn aggregate<S>(
    source: &S,
    classifier: &LinkClassifier,
    pagination: &Pagination,
) -> Result<(LinkCounts, RunStats), PipelineError>
where
    S: PageSource + ?Sized,
{
    let pb = ProgressBar::new(pagination.page_count as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut aggregator = Aggregator::new(classifier);
    for index in 0..pagination.page_count {
        let payload = source
            .fetch_page(index)
            .await
            .map_err(|reason| PipelineError::Fetch {
                page: index + 1,
                reason,
            })?;
        let received = aggregator.ingest_page(index, &payload)?;
        pb.inc(1);

        if pagination.stop == StopCondition::ShortPage && received < pagination.per_page {
            info!(
                "Page {} held {} of {} articles, stopping early",
                index + 1,
                received,
                pagination.per_page
            );
            break;
        }
    }
    pb.finish_and_clear();

    let (counts, stats) = aggregator.finish();
    info!(
        "Aggregated {} distinct links from {} articles ({} duplicates, {} hrefs skipped)",
        counts.len(),
        stats.articles - stats.duplicates,
        stats.duplicates,
        stats.skipped_hrefs
    );
    Ok((counts, stats))
}
