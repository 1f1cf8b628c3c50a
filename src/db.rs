use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;

use crate::aggregate::LinkCountRow;
use crate::sink::{HeaderRow, ResultSink};

pub const DEFAULT_DB_PATH: &str = "data/links.sqlite";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS link_counts (
            link   TEXT PRIMARY KEY,
            count  INTEGER NOT NULL CHECK(count > 0)
        );
        CREATE INDEX IF NOT EXISTS idx_link_counts_count ON link_counts(count);

        CREATE TABLE IF NOT EXISTS runs (
            id              INTEGER PRIMARY KEY,
            link_label      TEXT NOT NULL,
            count_label     TEXT NOT NULL,
            row_count       INTEGER NOT NULL,
            occurrences     INTEGER NOT NULL,
            persisted_at    TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Replace the stored tally with `rows` and log the run, all in one transaction.
pub fn replace_counts(conn: &Connection, header: &HeaderRow, rows: &[LinkCountRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut occurrences: i64 = 0;
    {
        tx.execute("DELETE FROM link_counts", [])?;
        let mut stmt = tx.prepare("INSERT INTO link_counts (link, count) VALUES (?1, ?2)")?;
        for r in rows {
            let count = i64::try_from(r.count).context("Count does not fit in SQLite INTEGER")?;
            stmt.execute(rusqlite::params![r.link, count])?;
            occurrences += count;
        }
        tx.execute(
            "INSERT INTO runs (link_label, count_label, row_count, occurrences, persisted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                header.link,
                header.count,
                rows.len() as i64,
                occurrences,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn fetch_top(conn: &Connection, limit: usize) -> Result<Vec<LinkCountRow>> {
    let mut stmt = conn.prepare(
        "SELECT link, count FROM link_counts ORDER BY count DESC, link LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            let count: i64 = row.get(1)?;
            Ok(LinkCountRow {
                link: row.get(0)?,
                count: count as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub links: usize,
    pub occurrences: u64,
    pub runs: usize,
    pub last_run: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let links: usize = conn.query_row("SELECT COUNT(*) FROM link_counts", [], |r| r.get(0))?;
    let occurrences: i64 =
        conn.query_row("SELECT COALESCE(SUM(count), 0) FROM link_counts", [], |r| r.get(0))?;
    let runs: usize = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
    let last_run: Option<String> = conn.query_row(
        "SELECT MAX(persisted_at) FROM runs",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        links,
        occurrences: occurrences as u64,
        runs,
        last_run,
    })
}

/// Result sink backed by the local SQLite file.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn new(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait(?Send)]
impl ResultSink for SqliteSink {
    async fn persist(&self, header: &HeaderRow, rows: &[LinkCountRow]) -> Result<()> {
        let written = replace_counts(&self.conn, header, rows)?;
        tracing::info!("Stored {} link counts in SQLite", written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn row(link: &str, count: u64) -> LinkCountRow {
        LinkCountRow {
            link: link.into(),
            count,
        }
    }

    #[test]
    fn replace_overwrites_previous_run() {
        let conn = memory();
        let header = HeaderRow::default();
        replace_counts(&conn, &header, &[row("a", 3), row("b", 1)]).unwrap();
        replace_counts(&conn, &header, &[row("c", 2)]).unwrap();

        let top = fetch_top(&conn, 10).unwrap();
        assert_eq!(top, vec![row("c", 2)]);

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.links, 1);
        assert_eq!(s.occurrences, 2);
        assert_eq!(s.runs, 2);
        assert!(s.last_run.is_some());
    }

    #[test]
    fn top_orders_and_limits() {
        let conn = memory();
        replace_counts(
            &conn,
            &HeaderRow::default(),
            &[row("x", 1), row("y", 5), row("z", 5), row("w", 2)],
        )
        .unwrap();
        let top = fetch_top(&conn, 3).unwrap();
        assert_eq!(top, vec![row("y", 5), row("z", 5), row("w", 2)]);
    }

    #[test]
    fn zero_counts_rejected() {
        let conn = memory();
        assert!(replace_counts(&conn, &HeaderRow::default(), &[row("a", 0)]).is_err());
    }

    #[test]
    fn empty_store_stats() {
        let conn = memory();
        let s = get_stats(&conn).unwrap();
        assert_eq!(s.links, 0);
        assert_eq!(s.occurrences, 0);
        assert_eq!(s.runs, 0);
        assert!(s.last_run.is_none());
    }

    #[tokio::test]
    async fn sink_records_header_labels() {
        let sink = SqliteSink::new(Connection::open_in_memory().unwrap()).unwrap();
        let header = HeaderRow::new("リンク", "カウント");
        sink.persist(&header, &[row("https://www.amazon.co.jp/x", 2)])
            .await
            .unwrap();

        let (link_label, rows): (String, i64) = sink
            .connection()
            .query_row("SELECT link_label, row_count FROM runs", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(link_label, "リンク");
        assert_eq!(rows, 1);
    }
}
