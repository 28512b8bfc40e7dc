//! # kbqa-cli
//!
//! Command-line front end for the `kbqa-rag` retrieval engine.
//!
//! ```text
//! kbqa ingest [--overwrite]
//! kbqa search <query> [--top-k N] [--file NAME]...
//! kbqa ask <question> [--file NAME]... [--json] [--report]
//! kbqa chat [--file NAME]...
//! kbqa stats
//! kbqa review list|stats|set-status|export
//! ```
//!
//! Answers and JSON go to stdout; logs go to stderr.

pub mod chat;
pub mod cli;
pub mod engine;
pub mod output;
pub mod review;

use anyhow::{Context, Result, bail};
use kbqa_rag::FileFilter;
use tracing::info;

pub use cli::{Cli, Commands, EmbeddingBackend, EngineArgs, ReviewCommands};
pub use review::{ReviewEntry, ReviewLog, ReviewStats, ReviewStatus, UserFeedback};

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "kbqa=info,kbqa_cli=info,kbqa_rag=info";

/// Log filter for a `-v` count, or `None` to defer to `RUST_LOG`.
pub fn verbosity_filter(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("kbqa=debug,kbqa_cli=debug,kbqa_rag=debug"),
        _ => Some("kbqa=trace,kbqa_cli=trace,kbqa_rag=trace"),
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let engine = cli.engine;
    let review = ReviewLog::new(&engine.review_log);

    match cli.command {
        Commands::Ingest { overwrite } => {
            let pipeline = engine.retrieval_pipeline()?;
            let loaded = pipeline
                .load_knowledge_base(overwrite)
                .await
                .with_context(|| format!("failed to ingest {}", engine.docs.display()))?;
            let stats = pipeline.statistics().await?;
            println!(
                "Loaded {loaded} chunks from {} ({} documents, {} chunks in store)",
                engine.docs.display(),
                stats.documents_loaded,
                stats.total_chunks
            );
        }
        Commands::Search { query, files } => {
            let pipeline = engine.retrieval_pipeline()?;
            let results = pipeline.search(&query, engine.top_k, files).await;
            println!("{}", output::format_search_results(&results));
        }
        Commands::Ask { question, files, json, report } => {
            let pipeline = engine.answering_pipeline()?;
            let result = pipeline.answer(&question, files).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", output::format_answer(&result));
            }
            if report {
                let entry = ReviewEntry::from_answer(&result, UserFeedback::NotHelpful);
                review.log(&entry)?;
                eprintln!("Logged for review at {} ({})", entry.timestamp, review.path().display());
            }
        }
        Commands::Chat { files } => {
            let pipeline = engine.answering_pipeline()?;
            chat::run_chat(&pipeline, FileFilter::from(files), &review).await?;
        }
        Commands::Stats => {
            let stats = engine.retrieval_pipeline()?.statistics().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Review { action } => run_review(&review, action)?,
    }
    Ok(())
}

fn run_review(review: &ReviewLog, action: ReviewCommands) -> Result<()> {
    match action {
        ReviewCommands::List { status } => {
            let entries = review.entries()?;
            let mut shown = 0;
            for entry in entries.iter().filter(|e| status.is_none_or(|s| e.status == s)) {
                println!("{}  [{}]  {}", entry.timestamp, entry.status, entry.question);
                shown += 1;
            }
            if shown == 0 {
                println!("No review entries.");
            }
        }
        ReviewCommands::Stats => println!("{}", serde_json::to_string_pretty(&review.stats()?)?),
        ReviewCommands::SetStatus { timestamp, status } => {
            if !review.update_status(&timestamp, status)? {
                bail!("no review entry logged at {timestamp}");
            }
            println!("{timestamp} is now {status}");
        }
        ReviewCommands::Export { out } => {
            let count = review.export_json(&out)?;
            info!(count, out = %out.display(), "exported review log");
            println!("Exported {count} entries to {}", out.display());
        }
    }
    Ok(())
}
