//! taskpass - a terminal front-end for the taskpass session server.
//!
//! Signs in against the session server, shows the signed-in user's profile,
//! keeps a local task list and exercises local and push notifications.

mod app;

use std::io;

use anyhow::Result;
use taskpass_core::config::Config;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Prefix for the daily log files
const LOG_FILE_PREFIX: &str = "taskpass.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a daily rolling file under the data directory so they don't
/// interleave with the shell. Falls back to stderr when that directory is
/// unavailable. The returned guard must be held until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = Config::log_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn print_usage() {
    eprintln!("Usage: taskpass [--ephemeral]");
    eprintln!();
    eprintln!("  --ephemeral   keep the session and tasks in memory only");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TASKPASS_BASE_URL    session server URL");
    eprintln!("  TASKPASS_USERNAME    username for `login`");
    eprintln!("  TASKPASS_PASSWORD    password for `login`");
    eprintln!("  RUST_LOG             log filter (default: warn)");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut ephemeral = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--ephemeral" => ephemeral = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    let _guard = init_tracing();
    info!(ephemeral, "taskpass starting");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
    .with_env_overrides();

    let mut app = App::new(config, ephemeral).await?;
    app::print_help();

    let result = app.run().await;
    // Dropping the app cancels pending notifications and discards late results
    drop(app);

    if let Err(ref e) = result {
        eprintln!("Error: {}", e);
    }

    info!("taskpass shutting down");
    result
}
