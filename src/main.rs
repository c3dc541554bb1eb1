mod app;
mod commands;
mod config;
mod event;
mod filters;
mod grid;
mod query;
mod store;
mod tmdb;
mod ui;

#[cfg(test)]
mod test_support;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "A terminal UI for discovering movies on TMDB, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/marquee/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Region for now-playing and upcoming listings (e.g. GB)
  #[arg(short, long)]
  region: Option<String>,

  /// Directory for log files (default: $XDG_DATA_HOME/marquee/logs)
  #[arg(long)]
  log_file_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Stdout belongs to the terminal UI, so logs go to a file
  let _log_guard = init_logging(args.log_file_dir.as_deref())?;

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(region) = args.region {
    config.tmdb.region = region.to_uppercase();
  }
  tracing::info!(region = %config.tmdb.region, language = %config.tmdb.language, "starting marquee");

  let mut app = app::App::new(config).await?;
  app.run().await?;

  Ok(())
}

fn init_logging(dir: Option<&Path>) -> Result<WorkerGuard> {
  let dir = match dir {
    Some(d) => d.to_path_buf(),
    None => dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?
      .join("marquee")
      .join("logs"),
  };
  std::fs::create_dir_all(&dir).map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "marquee.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("MARQUEE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
