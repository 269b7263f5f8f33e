use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

const LOG_ENV: &str = "SHOTBOARD_LOG";

/// Install the global subscriber.
///
/// SHOTBOARD_LOG takes precedence over `log.level`. With `log.directory` set,
/// output goes to a daily rolling file and the returned guard must be held
/// until exit so buffered lines are flushed. Otherwise output goes to stderr,
/// leaving stdout to command results.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = build_filter(config)?;

  match &config.directory {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "shotboard.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(None)
    }
  }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
  match std::env::var(LOG_ENV) {
    Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(&directive)
      .map_err(|e| eyre!("Invalid {} directive '{}': {}", LOG_ENV, directive, e)),
    _ => EnvFilter::try_new(&config.level)
      .map_err(|e| eyre!("Invalid log level '{}': {}", config.level, e)),
  }
}
