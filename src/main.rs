use std::{fs, path::Path};

use clap::Parser;
use nightwatch::cli::{commands::run, flags::Cli};
use nightwatch::core::error::EngineError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli)?;

    if let Err(err) = run(cli).await {
        tracing::error!("{:#}", err);
        return Err(err);
    }
    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<(), EngineError> {
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_path = Path::new(&cli.log_file);
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| EngineError::Config(e.to_string()))?;
        }
    }
    if log_path.exists() {
        if let Ok(meta) = fs::metadata(log_path) {
            if meta.len() > 1_000_000 {
                let rotated = log_path.with_extension("log.1");
                let _ = fs::rename(log_path, rotated);
            }
        }
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| EngineError::Config(e.to_string()))?;

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(false);

    // stdout carries command output; logs go to stderr
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| EngineError::Config(e.to_string()))
}
