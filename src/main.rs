// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use kube::Client;
use rodoo::config::{Cli, Command, OperatorConfig};
use rodoo::constants::TOKIO_WORKER_THREADS;
use rodoo::{controller, health};
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("rodoo-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_tracing() {
    // Respects RUST_LOG, defaulting to INFO, and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    init_tracing();

    let Command::Start(args) = cli.command;
    let config = OperatorConfig::try_from(args)?;

    info!(
        "Starting RunOnceDurationOverride operator {} (operand {} in {})",
        env!("CARGO_PKG_VERSION"),
        config.operand.image(),
        config.operand.namespace()
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let health_addr = config.health_addr;

    // The controller stops on SIGTERM/SIGINT and the health server is dropped with it
    tokio::select! {
        result = controller::run(client, config) => {
            result?;
            info!("Controller shut down");
            Ok(())
        }
        result = health::serve(health_addr, std::future::pending()) => {
            error!("CRITICAL: health server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("health server exited unexpectedly without error")
        }
    }
}
