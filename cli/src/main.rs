// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Arbor Server CLI
//!
//! `arbor serve` wires the engine together: environment configuration,
//! store backend, model provider, run executor, workflow runner, and the
//! axum HTTP surface. A single process serves JSON-RPC on `/rpc` and the
//! A2A well-known card endpoint.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use arbor_core::application::bootstrap::seed_directory_agent;
use arbor_core::application::executor::RunExecutor;
use arbor_core::application::workflow_runner::WorkflowRunner;
use arbor_core::infrastructure::config::EngineConfig;
use arbor_core::infrastructure::llm::provider_from_config;
use arbor_core::infrastructure::store::create_store;
use arbor_core::presentation::http::{app, AppState};

/// Arbor - agent orchestration engine
#[derive(Parser)]
#[command(name = "arbor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ARBOR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON-RPC server
    Serve {
        /// HTTP port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    match cli.command {
        Commands::Serve { port } => serve(port).await,
    }
}

async fn serve(port_override: Option<u16>) -> Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(port) = port_override {
        config.port = port;
    }

    let store = create_store(&config.storage_backend())
        .await
        .context("Failed to initialize store")?;
    seed_directory_agent(&store, &config.main_router_slug, &config.main_router_name)
        .await
        .context("Failed to seed directory agent")?;

    let provider = provider_from_config(&config);
    let executor = Arc::new(RunExecutor::new(
        store.clone(),
        provider,
        config.executor_settings(),
    ));
    let workflows = WorkflowRunner::new(store.clone(), executor.clone());

    let state = Arc::new(AppState {
        store,
        executor,
        workflows,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!(
        "{} {}",
        "arbor".green().bold(),
        format!("listening on http://{addr}").white()
    );
    info!(port = config.port, model = %config.model_name, "server started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
