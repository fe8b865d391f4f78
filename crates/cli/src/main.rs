mod shell;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use samansetu_core::{
    config::{self, AppConfig},
    events::{NotificationRelay, Notifier, Severity},
    Marketplace,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let market = Marketplace::new(&config)?;
    market.restore();

    let relay = NotificationRelay::spawn(market.events().subscribe(), Arc::new(TerminalNotifier));
    let _watcher = match market.watch_session(&config.storage_dir) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            tracing::warn!(?err, "session watcher unavailable; changes from other processes go unnoticed");
            None
        }
    };

    let result = shell::Shell::new(market).run().await;
    relay.abort();
    result
}

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        let tag = match severity {
            Severity::Success => "ok",
            Severity::Info => "--",
            Severity::Error => "!!",
        };
        println!("[{tag}] {message}");
    }
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("samansetu.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::from_default_env();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
