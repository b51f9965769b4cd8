mod api;
mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod display;
mod event;
mod list_query;
mod logging;
mod query;
mod scoring;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use api::{ApiClient, CachedClient, ResourceKind};
use cache::QueryStore;

#[derive(Parser, Debug)]
#[command(name = "courseterm")]
#[command(about = "A terminal client for a learning-management backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./courseterm.yaml, then $XDG_CONFIG_HOME/courseterm/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Resource shown when the TUI starts
  #[arg(short, long)]
  resource: Option<ResourceKind>,

  /// Run one command and exit instead of starting the TUI
  #[command(subcommand)]
  command: Option<cli::Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config)?;

  let store = Arc::new(QueryStore::new());
  let client = CachedClient::new(ApiClient::from_config(&config)?, store);

  if let Some(command) = args.command {
    return cli::run(command, &client).await;
  }

  let root = args
    .resource
    .or(config.default_resource)
    .unwrap_or(ResourceKind::Courses);

  // Initialize and run the app
  let mut app = app::App::new(client, config.display_title(), root)?;
  app.run().await?;

  Ok(())
}
