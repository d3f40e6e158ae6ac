mod api;
mod app;
mod config;
mod engine;
mod event;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jobdash")]
#[command(about = "A terminal UI for browsing and managing compute jobs")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jobdash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the jobs API
  #[arg(short, long)]
  api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  let config = if let Some(url) = args.api_url {
    config::Config {
      api: config::ApiConfig {
        url,
        ..config.api.clone()
      },
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

/// Log to a file in the state directory; the terminal belongs to the UI.
/// Returns the guard keeping the background writer alive.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let dir = dirs::state_dir().or_else(dirs::data_dir)?.join("jobdash");
  std::fs::create_dir_all(&dir).ok()?;

  let appender = tracing_appender::rolling::never(dir, "jobdash.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobdash=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Some(guard)
}
