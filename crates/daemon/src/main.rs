// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gantry daemon (gantryd)
//!
//! Serves the pipeline API and coordinates versions through their stages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use gantry_daemon::{lifecycle, Config};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gantryd", version, about = "Gantry delivery pipeline daemon")]
struct Args {
    /// Path to gantry.toml
    #[arg(long, env = "GANTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    foreground: bool,
}

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- gantryd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- gantryd: starting (pid: ";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;

    let _log_guard = if args.foreground {
        setup_stderr_logging();
        None
    } else {
        let log_path = config.log_path()?;
        write_startup_marker(&log_path)?;
        Some(setup_file_logging(&log_path)?)
    };

    info!(
        config = ?args.config,
        projects = config.projects.len(),
        "starting gantryd"
    );

    let shutdown = shutdown_signal()?;
    if let Err(e) = lifecycle::run(&config, shutdown).await {
        error!("gantryd failed: {}", e);
        if !args.foreground {
            if let Ok(log_path) = config.log_path() {
                write_startup_error(&log_path, &e);
            }
        }
        return Err(e.into());
    }

    info!("gantryd stopped");
    Ok(())
}

/// Resolves on SIGTERM or SIGINT
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()> + Send + 'static> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
    })
}

/// Append the startup marker to the log file
fn write_startup_marker(log_path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write a fatal error synchronously; the non-blocking writer may not flush
/// before the process exits
fn write_startup_error(log_path: &Path, error: &lifecycle::LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR gantryd failed: {}", error);
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn setup_stderr_logging() {
    use tracing_subscriber::{fmt, prelude::*};

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn setup_file_logging(log_path: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*};

    let dir = log_path
        .parent()
        .context("log path has no parent directory")?;
    let file_name = log_path.file_name().context("log path has no file name")?;
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}
