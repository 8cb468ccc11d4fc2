//! Pagesmith CLI - question answering over indexed manual pages.
//!
//! # Usage
//!
//! ```bash
//! # Ask a question against a page metadata file
//! psm "how do I bleed the brakes?" --pages pages.json
//! psm "torque specs" --pages pages.json --strategy cascade -n 4
//! psm "fuse box location" --pages pages.json --json
//!
//! # Compare all search strategies on one question
//! psm "hydraulic pump checks" --pages pages.json --compare
//! ```

mod embed;
mod output;
mod qa;

use anyhow::Result;
use clap::Parser;
use pagesmith_core::search::SearchStrategy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pagesmith manual question answering.
///
/// Indexes a page metadata file in memory and answers questions with
/// page, table, and figure references.
#[derive(Parser)]
#[command(name = "psm", version, about)]
struct Cli {
    /// Question to answer
    question: String,

    /// Page metadata file (JSON array with page_number and embedding_text)
    #[arg(long)]
    pages: PathBuf,

    /// Search strategy: best_only, cascade, or parallel
    #[arg(long, default_value = "parallel")]
    strategy: SearchStrategy,

    /// Maximum results per sub-question
    #[arg(short = 'n', long, default_value = "6")]
    limit: usize,

    /// Root of the extracted page artifact tree (tables and figures)
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Run every strategy and show the rankings side by side
    #[arg(long)]
    compare: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.compare {
        let runs = qa::compare(&cli.question, &cli.pages, cli.limit, cli.artifacts).await?;
        let rendered = if cli.json {
            output::format_comparison_json(&cli.question, &runs)
        } else {
            output::format_comparison(&cli.question, &runs)
        };
        println!("{rendered}");
        return Ok(());
    }

    let response = qa::ask(
        &cli.question,
        &cli.pages,
        cli.strategy,
        cli.limit,
        cli.artifacts,
    )
    .await?;

    let rendered = if cli.json {
        output::format_json(&cli.question, &response)
    } else {
        output::format_human(&cli.question, &response)
    };
    println!("{rendered}");
    Ok(())
}
