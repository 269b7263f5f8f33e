mod api;
mod app;
mod cache;
mod config;
mod error;
mod logging;
mod table;
mod timeline;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shotboard")]
#[command(about = "Production tracker for VFX projects, shots and wiki tables")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shotboard/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: app::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;

  // Held until exit so the file writer flushes
  let _guard = logging::init(&config.log)?;

  let app = app::App::new(config)?;
  let output = app.execute(args.command).await?;
  println!("{}", output);

  Ok(())
}
