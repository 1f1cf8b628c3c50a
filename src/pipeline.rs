use tracing::{info, warn};

use crate::aggregate::{aggregate, Pagination, RunStats};
use crate::classify::LinkClassifier;
use crate::error::PipelineError;
use crate::sink::{HeaderRow, ResultSink};
use crate::source::PageSource;

#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub distinct_links: usize,
    pub occurrences: u64,
}

/// Aggregate every page, then hand the complete tally to the sink exactly once.
/// The sink is never reached when aggregation fails.
pub async fn run<S, K>(
    source: &S,
    sink: &K,
    classifier: &LinkClassifier,
    pagination: &Pagination,
    header: &HeaderRow,
) -> Result<RunReport, PipelineError>
where
    S: PageSource + ?Sized,
    K: ResultSink + ?Sized,
{
    let (counts, stats) = aggregate(source, classifier, pagination).await?;
    if counts.is_empty() {
        warn!("No target links found; the destination will only hold the header");
    }
    let rows = counts.to_rows();
    let occurrences = counts.total();

    info!("Persisting {} distinct links", rows.len());
    sink.persist(header, &rows)
        .await
        .map_err(|reason| PipelineError::Sink {
            rows: rows.len(),
            reason,
        })?;

    Ok(RunReport {
        stats,
        distinct_links: rows.len(),
        occurrences,
    })
}
