// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry - operator CLI for the Gantry daemon

mod client;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gantry_core::{HelmOverrides, Quantity};
use gantry_daemon::protocol::InitiateRequest;

use crate::client::{ApiClient, DEFAULT_SERVER, DEFAULT_TIMEOUT};
use crate::output::{Created, OutputFormat};

#[derive(Parser)]
#[command(name = "gantry", version, about = "Gantry - delivery pipeline coordinator")]
struct Cli {
    /// Base URL of gantryd
    #[arg(long, global = true, env = "GANTRY_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a version and start its checks
    Create(CreateArgs),
    /// Show a version's status
    Status { version: String },
    /// Approve a version for deployment
    Approve { version: String },
    /// Reject a version
    Reject { version: String },
    /// Restart a version's failed stages
    Retry { version: String },
}

#[derive(Args)]
struct CreateArgs {
    /// Project id
    project: String,

    /// Branch to build
    #[arg(long)]
    branch: String,

    /// Replica count override
    #[arg(long)]
    replicas: Option<u32>,

    /// CPU request override, e.g. 250m
    #[arg(long)]
    cpu: Option<Quantity>,

    /// Memory request override, e.g. 256Mi
    #[arg(long)]
    memory: Option<Quantity>,
}

impl CreateArgs {
    fn into_request(self) -> InitiateRequest {
        InitiateRequest {
            branch: self.branch,
            helm_overrides: HelmOverrides {
                replica_count: self.replicas,
                cpu_request: self.cpu,
                memory_request: self.memory,
            },
        }
    }
}

fn main() {
    setup_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    tracing::debug!(server = %cli.server, "using gantryd");
    let client = ApiClient::new(&cli.server, DEFAULT_TIMEOUT)?;
    let format = cli.format;

    match cli.command {
        Commands::Create(args) => {
            let project = args.project.clone();
            let initiated = client.create_version(&project, &args.into_request())?;
            output::print(&Created(initiated), format);
        }
        Commands::Status { version } => output::print(&client.status(&version)?, format),
        Commands::Approve { version } => output::print(&client.decide(&version, true)?, format),
        Commands::Reject { version } => output::print(&client.decide(&version, false)?, format),
        Commands::Retry { version } => output::print(&client.retry(&version)?, format),
    }
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
