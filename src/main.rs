mod aggregate;
mod classify;
mod config;
mod db;
mod dedup;
mod error;
mod parser;
mod pipeline;
mod sheets;
mod sink;
mod source;

use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use crate::aggregate::StopCondition;
use crate::classify::LinkClassifier;
use crate::config::Config;
use crate::sheets::SheetsSink;
use crate::source::HttpSource;

#[derive(Parser)]
#[command(name = "link_tally", about = "Count shop links embedded in published articles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all pages, tally target links and persist the result
    Run {
        /// Pages to request (default: PAGE_COUNT or 100)
        #[arg(long)]
        pages: Option<usize>,
        /// Articles per page (default: PER_PAGE or 100)
        #[arg(long)]
        per_page: Option<usize>,
        /// Stop after the first page shorter than --per-page
        #[arg(long)]
        stop_on_short_page: bool,
        /// Where the tally is written
        #[arg(long, value_enum, default_value = "sqlite")]
        sink: SinkKind,
    },
    /// Most frequent links from the last SQLite run
    Top {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Show stored tally statistics
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkKind {
    Sqlite,
    Sheets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let result = match cli.command {
        Commands::Run {
            pages,
            per_page,
            stop_on_short_page,
            sink,
        } => {
            let mut pagination = config.pagination.clone();
            if let Some(n) = pages {
                pagination.page_count = n;
            }
            if let Some(n) = per_page {
                pagination.per_page = n;
            }
            if stop_on_short_page {
                pagination.stop = StopCondition::ShortPage;
            }

            let source = HttpSource::new(
                &config.source_url,
                pagination.per_page,
                config.source_access_token.clone(),
            )?;
            let classifier = LinkClassifier::new(config.target_prefixes.clone());
            tracing::info!("Target prefixes: {:?}", classifier.prefixes());
            println!(
                "Tallying links over {} pages of {} articles...",
                pagination.page_count, pagination.per_page
            );

            let report = match sink {
                SinkKind::Sqlite => {
                    let sink = db::SqliteSink::new(db::connect(&config.db_path)?)?;
                    pipeline::run(&source, &sink, &classifier, &pagination, &config.header).await?
                }
                SinkKind::Sheets => {
                    let sink = sheets_sink(&config)?;
                    pipeline::run(&source, &sink, &classifier, &pagination, &config.header).await?
                }
            };

            let s = &report.stats;
            println!(
                "Done: {} pages, {} articles ({} duplicates), {} hrefs skipped, {} target links, {} distinct.",
                s.pages, s.articles, s.duplicates, s.skipped_hrefs, report.occurrences, report.distinct_links
            );
            Ok(())
        }
        Commands::Top { limit } => {
            let conn = db::connect(&config.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_top(&conn, limit)?;
            if rows.is_empty() {
                println!("No links stored. Run 'run' first.");
                return Ok(());
            }

            println!("{:>3} | {:>6} | {}", "#", config.header.count, config.header.link);
            println!("{}", "-".repeat(80));
            for (i, r) in rows.iter().enumerate() {
                println!("{:>3} | {:>6} | {}", i + 1, r.count, truncate(&r.link, 64));
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&config.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Links:       {}", s.links);
            println!("Occurrences: {}", s.occurrences);
            println!("Runs:        {}", s.runs);
            println!("Last run:    {}", s.last_run.as_deref().unwrap_or("-"));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn sheets_sink(config: &Config) -> anyhow::Result<SheetsSink> {
    let sheets = &config.sheets;
    let spreadsheet_id = sheets
        .spreadsheet_id
        .clone()
        .context("SHEETS_SPREADSHEET_ID must be set for the sheets sink")?;
    let access_token = sheets
        .access_token
        .clone()
        .context("SHEETS_ACCESS_TOKEN must be set for the sheets sink")?;
    Ok(SheetsSink::new(
        spreadsheet_id,
        access_token,
        sheets.range.clone(),
        sheets.clear_range.clone(),
    ))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
