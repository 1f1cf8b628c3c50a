use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::LinkCountRow;
use crate::sink::{to_value_grid, HeaderRow, ResultSink};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<serde_json::Value>>,
}

/// Writes the tally into a spreadsheet through the Sheets values API.
///
/// The access token is obtained out of band (service account, gcloud, ...).
pub struct SheetsSink {
    client: reqwest::Client,
    spreadsheet_id: String,
    access_token: String,
    range: String,
    clear_range: Option<String>,
}

impl SheetsSink {
    pub fn new(
        spreadsheet_id: String,
        access_token: String,
        range: String,
        clear_range: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            spreadsheet_id,
            access_token,
            range,
            clear_range,
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{}", SHEETS_API, self.spreadsheet_id, range)
    }

    /// Rows of `clear_range` left below a freshly written grid of `grid_rows` rows.
    fn stale_range(&self, grid_rows: usize) -> Option<String> {
        let clear = self.clear_range.as_deref()?;
        let (sheet, span) = match clear.rsplit_once('!') {
            Some((sheet, span)) => (format!("{}!", sheet), span),
            None => (String::new(), clear),
        };
        let (from, to) = span.split_once(':')?;
        let (from_col, to_col) = (column_of(from), column_of(to));
        if from_col.is_empty() || to_col.is_empty() {
            return None;
        }

        let first_cell = self.range.rsplit('!').next().unwrap_or("");
        let start_row: usize = first_cell
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .split(':')
            .next()
            .and_then(|r| r.parse().ok())
            .unwrap_or(1);

        Some(format!("{}{}{}:{}", sheet, from_col, start_row + grid_rows, to_col))
    }

    async fn clear(&self, range: &str) -> Result<()> {
        self.client
            .post(format!("{}:clear", self.values_url(range)))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Sheets clear request failed")?
            .error_for_status()
            .with_context(|| format!("Sheets refused to clear {}", range))?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl ResultSink for SheetsSink {
    async fn persist(&self, header: &HeaderRow, rows: &[LinkCountRow]) -> Result<()> {
        let body = ValueRange {
            range: &self.range,
            major_dimension: "ROWS",
            values: to_value_grid(header, rows),
        };
        let grid_rows = body.values.len();
        self.client
            .put(self.values_url(&self.range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("Sheets update request failed")?
            .error_for_status()
            .with_context(|| format!("Sheets refused update of {}", self.range))?;

        info!("Wrote {} rows to spreadsheet {}", grid_rows, self.spreadsheet_id);

        // Only trim what the previous run left below the new grid.
        match (&self.clear_range, self.stale_range(grid_rows)) {
            (_, Some(stale)) => self.clear(&stale).await?,
            (Some(clear), None) => warn!("Cannot derive stale rows from clear range {:?}", clear),
            (None, None) => {}
        }
        Ok(())
    }
}

fn column_of(cell: &str) -> &str {
    let end = cell
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(cell.len());
    &cell[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_body_shape() {
        let rows = vec![LinkCountRow {
            link: "https://www.amazon.co.jp/x".into(),
            count: 2,
        }];
        let body = ValueRange {
            range: "A1",
            major_dimension: "ROWS",
            values: to_value_grid(&HeaderRow::default(), &rows),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "range": "A1",
                "majorDimension": "ROWS",
                "values": [["link", "count"], ["https://www.amazon.co.jp/x", 2]]
            })
        );
    }

    fn sink(range: &str, clear: Option<&str>) -> SheetsSink {
        SheetsSink::new("abc".into(), "t".into(), range.into(), clear.map(str::to_string))
    }

    #[test]
    fn stale_rows_start_below_the_grid() {
        // header + 1 data row written at A1 leaves rows 3.. stale
        assert_eq!(sink("A1", Some("A:B")).stale_range(2).as_deref(), Some("A3:B"));
        assert_eq!(
            sink("Sheet1!A1", Some("Sheet1!A:B")).stale_range(5).as_deref(),
            Some("Sheet1!A6:B")
        );
        assert_eq!(sink("C4", Some("C1:D")).stale_range(1).as_deref(), Some("C5:D"));
    }

    #[test]
    fn no_stale_range_without_usable_clear_range() {
        assert!(sink("A1", None).stale_range(2).is_none());
        assert!(sink("A1", Some("A1")).stale_range(2).is_none());
        assert!(sink("A1", Some("1:2")).stale_range(2).is_none());
    }

    #[test]
    fn values_url_includes_sheet_and_range() {
        let sink = SheetsSink::new("abc".into(), "t".into(), "Sheet1!A1".into(), None);
        assert_eq!(
            sink.values_url("Sheet1!A1"),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/Sheet1!A1"
        );
    }
}
