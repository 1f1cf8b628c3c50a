use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;

use crate::aggregate::{Pagination, StopCondition, DEFAULT_PAGE_COUNT, DEFAULT_PER_PAGE};
use crate::classify::DEFAULT_TARGET_PREFIXES;
use crate::db::DEFAULT_DB_PATH;
use crate::sink::HeaderRow;

const DEFAULT_SOURCE_URL: &str = "https://qiita.com/api/v2/items";

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub range: String,
    pub clear_range: Option<String>,
}

/// Settings loaded from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    pub source_access_token: Option<String>,
    pub pagination: Pagination,
    pub target_prefixes: Vec<String>,
    pub header: HeaderRow,
    pub db_path: String,
    pub sheets: SheetsConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let stop = if parse_or(&get, "STOP_ON_SHORT_PAGE", false)? {
            StopCondition::ShortPage
        } else {
            StopCondition::FixedPageCount
        };
        let pagination = Pagination {
            page_count: parse_or(&get, "PAGE_COUNT", DEFAULT_PAGE_COUNT)?,
            per_page: parse_or(&get, "PER_PAGE", DEFAULT_PER_PAGE)?,
            stop,
        };

        let target_prefixes = match get("TARGET_PREFIXES") {
            Some(v) => split_list(&v),
            None => DEFAULT_TARGET_PREFIXES.iter().map(|s| s.to_string()).collect(),
        };

        let header = match get("HEADER_LABELS") {
            Some(v) => {
                let labels = split_list(&v);
                if labels.len() != 2 {
                    bail!("HEADER_LABELS must hold exactly two labels, got {:?}", v);
                }
                HeaderRow::new(labels[0].clone(), labels[1].clone())
            }
            None => HeaderRow::default(),
        };

        Ok(Self {
            source_url: get("SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            source_access_token: get("SOURCE_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            pagination,
            target_prefixes,
            header,
            db_path: get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            sheets: SheetsConfig {
                spreadsheet_id: get("SHEETS_SPREADSHEET_ID"),
                access_token: get("SHEETS_ACCESS_TOKEN"),
                range: get("SHEETS_RANGE").unwrap_or_else(|| "A1".to_string()),
                clear_range: match get("SHEETS_CLEAR_RANGE") {
                    Some(r) if r.is_empty() => None,
                    Some(r) => Some(r),
                    None => Some("A:B".to_string()),
                },
            },
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value {:?}", key, v)),
        None => Ok(default),
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = load(&[]).unwrap();
        assert_eq!(c.source_url, "https://qiita.com/api/v2/items");
        assert_eq!(c.pagination.page_count, 100);
        assert_eq!(c.pagination.per_page, 100);
        assert_eq!(c.pagination.stop, StopCondition::FixedPageCount);
        assert_eq!(c.target_prefixes, vec!["https://www.amazon.com", "https://www.amazon.co.jp"]);
        assert_eq!(c.header, HeaderRow::new("link", "count"));
        assert_eq!(c.sheets.range, "A1");
        assert_eq!(c.sheets.clear_range.as_deref(), Some("A:B"));
        assert!(c.source_access_token.is_none());
    }

    #[test]
    fn overrides() {
        let c = load(&[
            ("PAGE_COUNT", "3"),
            ("PER_PAGE", " 20 "),
            ("STOP_ON_SHORT_PAGE", "true"),
            ("TARGET_PREFIXES", "https://a.example/, ,https://b.example/"),
            ("HEADER_LABELS", "リンク,カウント"),
            ("SHEETS_CLEAR_RANGE", ""),
        ])
        .unwrap();
        assert_eq!(c.pagination.page_count, 3);
        assert_eq!(c.pagination.per_page, 20);
        assert_eq!(c.pagination.stop, StopCondition::ShortPage);
        assert_eq!(c.target_prefixes, vec!["https://a.example/", "https://b.example/"]);
        assert_eq!(c.header, HeaderRow::new("リンク", "カウント"));
        assert!(c.sheets.clear_range.is_none());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = load(&[("PAGE_COUNT", "lots")]).unwrap_err();
        assert!(err.to_string().contains("PAGE_COUNT"));
        assert!(load(&[("STOP_ON_SHORT_PAGE", "maybe")]).is_err());
    }

    #[test]
    fn header_needs_two_labels() {
        assert!(load(&[("HEADER_LABELS", "link")]).is_err());
        assert!(load(&[("HEADER_LABELS", "a,b,c")]).is_err());
    }
}
