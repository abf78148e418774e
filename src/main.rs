//! Insight API Server
//!
//! Run with: cargo run --bin insight -- [--config config.toml]
//!
//! Loads the configuration, seeds datasets from `[datasets] dir` when set,
//! and serves the query API until Ctrl-C or SIGTERM.

use anyhow::Context;
use clap::Parser;
use insight::api::{serve, ApiConfig, AppState};
use insight::config::Config;
use insight::dataset::DatasetStore;
use insight::query::QueryExecutor;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "insight")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query server for course section and campus room datasets")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    insight::logging::init(&config.logging)?;

    tracing::info!("Starting Insight API server v{}", env!("CARGO_PKG_VERSION"));

    let mut datasets = DatasetStore::new();
    if let Some(dir) = &config.datasets.dir {
        let count = datasets
            .load_dir(Path::new(dir))
            .with_context(|| format!("loading datasets from {}", dir))?;
        tracing::info!("Seeded {} datasets from {}", count, dir);
    }

    let executor = QueryExecutor::new(config.query.max_result_rows);
    tracing::info!("Result row cap: {}", executor.max_result_rows());

    let api_config = ApiConfig::from(&config.api);
    let state = AppState::new(datasets, executor, api_config.clone());

    serve(state, &api_config).await?;

    tracing::info!("Insight API server stopped");
    Ok(())
}
