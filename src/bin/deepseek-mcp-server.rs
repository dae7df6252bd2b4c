// ABOUTME: Server binary exposing the DeepSeek API as MCP tools over stdio or streamable HTTP
// ABOUTME: Loads configuration, initializes logging and runs the selected transport or a smoke check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # DeepSeek MCP Server Binary
//!
//! Configuration comes from the environment (and `.env`); the flags below
//! override the transport section.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use deepseek_mcp_server::config::environment::normalize_http_path;
use deepseek_mcp_server::config::{ServerConfig, TransportMode};
use deepseek_mcp_server::llm::{DeepSeekApi, DeepSeekClient};
use deepseek_mcp_server::logging;
use deepseek_mcp_server::mcp::{ServerResources, TransportManager};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "deepseek-mcp-server")]
#[command(about = "DeepSeek API exposed as MCP tools, resources and prompts")]
#[command(version)]
struct Args {
    /// Transport: `stdio` or `streamable-http`
    #[arg(long)]
    transport: Option<TransportMode>,

    /// HTTP bind host
    #[arg(long)]
    http_host: Option<String>,

    /// HTTP bind port
    #[arg(long)]
    http_port: Option<u16>,

    /// HTTP path of the MCP endpoint
    #[arg(long)]
    http_path: Option<String>,

    /// Call `/models` once, print the model ids and exit
    #[arg(long)]
    smoke: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Seed the environment first so RUST_LOG and LOG_FORMAT from .env apply
    let env_file = dotenvy::dotenv().ok();
    logging::init_from_env()?;
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    apply_overrides(&mut config, args.transport, args.http_host, args.http_port, args.http_path);
    info!("{}", config.summary());

    if args.smoke {
        return Ok(run_smoke(&config).await);
    }

    let resources = Arc::new(ServerResources::from_config(&config)?);
    let manager = TransportManager::new(resources);
    if let Err(e) = manager.run(&config.transport).await {
        error!("Transport failed: {e}");
        return Err(e.into());
    }
    info!("DeepSeek MCP Server stopped");
    Ok(ExitCode::SUCCESS)
}

fn apply_overrides(
    config: &mut ServerConfig,
    transport: Option<TransportMode>,
    http_host: Option<String>,
    http_port: Option<u16>,
    http_path: Option<String>,
) {
    if let Some(mode) = transport {
        config.transport.mode = mode;
    }
    if let Some(host) = http_host {
        config.transport.http_host = host;
    }
    if let Some(port) = http_port {
        config.transport.http_port = port;
    }
    if let Some(path) = http_path {
        config.transport.http_path = normalize_http_path(&path);
    }
}

/// List models once; stdout carries the human-readable report
async fn run_smoke(config: &ServerConfig) -> ExitCode {
    let client = match DeepSeekClient::new(config.deepseek.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Smoke test failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    match client.list_models().await {
        Ok(models) => {
            println!("DeepSeek MCP smoke test OK. Available models:");
            for model in &models.data {
                println!("- {}", model.id);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Smoke test failed: {e}");
            ExitCode::FAILURE
        }
    }
}
