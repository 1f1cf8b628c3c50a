use anyhow::Result;
use async_trait::async_trait;

use crate::aggregate::LinkCountRow;

const DEFAULT_HEADER: [&str; 2] = ["link", "count"];

/// Column labels written above the data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    pub link: String,
    pub count: String,
}

impl HeaderRow {
    pub fn new(link: impl Into<String>, count: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            count: count.into(),
        }
    }
}

impl Default for HeaderRow {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER[0], DEFAULT_HEADER[1])
    }
}

/// Destination for the final tally. Each run calls `persist` once and the
/// destination is fully replaced.
#[async_trait(?Send)]
pub trait ResultSink {
    async fn persist(&self, header: &HeaderRow, rows: &[LinkCountRow]) -> Result<()>;
}

/// Header plus data rows as a two-column grid, the shape spreadsheet APIs expect.
pub fn to_value_grid(header: &HeaderRow, rows: &[LinkCountRow]) -> Vec<Vec<serde_json::Value>> {
    let mut grid = Vec::with_capacity(rows.len() + 1);
    grid.push(vec![header.link.clone().into(), header.count.clone().into()]);
    for r in rows {
        grid.push(vec![r.link.clone().into(), r.count.into()]);
    }
    grid
}
