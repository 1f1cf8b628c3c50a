use thiserror::Error;

/// Conditions that end a run. Nothing is persisted once one of these occurs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching page {page} failed: {reason:#}")]
    Fetch { page: usize, reason: anyhow::Error },

    #[error("page {page} is not a valid article list: {source}")]
    Decode {
        page: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("persisting {rows} rows failed: {reason:#}")]
    Sink { rows: usize, reason: anyhow::Error },
}
