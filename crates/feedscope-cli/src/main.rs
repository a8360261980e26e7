//! # feedscope
//!
//! Inspect a ledger fixture: list feed summaries, print the causal graph of
//! recent blocks, or materialize a mutation history. Output is pretty JSON on
//! stdout; logs go to stderr.

#![deny(unsafe_code)]

mod fixture;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use feedscope_core::{MutationRecord, PublicKey};
use feedscope_devtools::{BlockTarget, DevtoolsService};
use feedscope_feeds::{FeedStore, IdentityDirectory, SpaceManager};
use feedscope_settings::FeedscopeSettings;
use futures::StreamExt;
use serde::Serialize;

use crate::fixture::{Ledger, load_ledger};

/// Feed observability tool.
#[derive(Parser, Debug)]
#[command(name = "feedscope", about = "Inspect replicated feeds and their causal graph")]
struct Cli {
    /// Ledger fixture (JSON dump of identity, spaces and feeds).
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Settings file (defaults to `~/.feedscope/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print feed summaries.
    Feeds {
        /// Restrict to these feed keys.
        #[arg(long = "feed")]
        feeds: Vec<PublicKey>,
    },
    /// Print the causal graph of the most recent blocks.
    Graph {
        /// Read a single feed.
        #[arg(long, conflicts_with = "space", required_unless_present = "space")]
        feed: Option<PublicKey>,

        /// Read a space's control feeds.
        #[arg(long)]
        space: Option<PublicKey>,

        /// Window size (defaults to settings).
        #[arg(long)]
        max_blocks: Option<usize>,

        /// Print the raw block window instead of the graph.
        #[arg(long)]
        blocks: bool,
    },
    /// Materialize a JSON array of mutation records.
    Reduce {
        /// Records file.
        records: PathBuf,
    },
}

fn load_settings(path: Option<&Path>) -> FeedscopeSettings {
    let loaded = match path {
        Some(path) => feedscope_settings::load_settings_from_path(path),
        None => feedscope_settings::load_settings(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("warning: failed to load settings, using defaults: {e}");
        FeedscopeSettings::default()
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn service_for(ledger: &Ledger, settings: &FeedscopeSettings) -> DevtoolsService {
    DevtoolsService::from_settings(
        Arc::clone(&ledger.store) as Arc<dyn FeedStore>,
        Arc::clone(&ledger.spaces) as Arc<dyn SpaceManager>,
        Arc::clone(&ledger.identity) as Arc<dyn IdentityDirectory>,
        &settings.devtools,
    )
}

fn require_ledger(path: Option<&Path>) -> Result<Ledger> {
    let Some(path) = path else {
        bail!("--fixture is required for this command");
    };
    load_ledger(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref());
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    if settings.logging.json {
        feedscope_core::logging::init_json_subscriber(&level);
    } else {
        feedscope_core::logging::init_subscriber(&level);
    }

    match cli.command {
        Command::Feeds { feeds } => {
            let ledger = require_ledger(cli.fixture.as_deref())?;
            let service = service_for(&ledger, &settings);
            let mut stream = service.list_feeds_stream(&feeds);
            let rows = stream.next().await.unwrap_or_default();
            tracing::info!(rows = rows.len(), "feed summaries listed");
            print_json(&rows)?;
        }
        Command::Graph {
            feed,
            space,
            max_blocks,
            blocks,
        } => {
            let ledger = require_ledger(cli.fixture.as_deref())?;
            let service = service_for(&ledger, &settings);
            let target = match (feed, space) {
                (Some(feed), _) => BlockTarget::Feed(feed),
                (None, Some(space)) => BlockTarget::Space(space),
                (None, None) => bail!("one of --feed or --space is required"),
            };
            if service.resolve_targets(&target).is_empty() {
                tracing::warn!(?target, "target resolves to no feeds");
                if blocks {
                    print_json(&Vec::<feedscope_core::Block>::new())?;
                } else {
                    print_json(&feedscope_devtools::GraphData::default())?;
                }
                return Ok(());
            }
            if blocks {
                let mut stream = service.recent_blocks_stream(&target, max_blocks);
                let window = stream.next().await.unwrap_or_default();
                tracing::info!(blocks = window.len(), "block window read");
                print_json(&window)?;
            } else {
                let mut stream = service.block_graph_stream(&target, max_blocks);
                let graph = stream.next().await.unwrap_or_default();
                tracing::info!(
                    nodes = graph.nodes.len(),
                    edges = graph.edges.len(),
                    "block graph built"
                );
                print_json(&graph)?;
            }
        }
        Command::Reduce { records } => {
            let content = std::fs::read_to_string(&records)
                .with_context(|| format!("Failed to read records: {}", records.display()))?;
            let records: Vec<MutationRecord> =
                serde_json::from_str(&content).context("Invalid mutation records")?;
            let map = feedscope_devtools::reduce_mutations(&records)?;
            tracing::info!(records = records.len(), objects = map.len(), "mutations reduced");
            print_json(&map)?;
        }
    }

    Ok(())
}
