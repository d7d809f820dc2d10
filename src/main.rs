//! # SOPS Secrets Manager Provider
//!
//! Command-line entry point.
//!
//! ## Usage
//!
//! ```bash
//! # Handle one lifecycle event read from stdin, print the response to stdout
//! sops-secretsmanager-provider handle < event.json
//!
//! # Handle an event stored in a file
//! sops-secretsmanager-provider handle --event event.json
//!
//! # Serve POST /events plus metrics and probes
//! sops-secretsmanager-provider serve --port 8080
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sops_secretsmanager_provider::config::ProviderConfig;
use sops_secretsmanager_provider::runtime::initialize;
use sops_secretsmanager_provider::server::{start_server, ServerState};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Custom resource provider writing SOPS-decrypted S3 files to AWS Secrets Manager
#[derive(Parser)]
#[command(name = "sops-secretsmanager-provider", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a single lifecycle event
    Handle {
        /// Event JSON file, stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Serve lifecycle events over HTTP
    Serve {
        /// Listen port, overrides HTTP_PORT
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ProviderConfig::from_env()?;
    let handler = initialize(&config).await?;

    match cli.command {
        Commands::Handle { event } => {
            let raw = read_event(event.as_ref())?;
            let response = handler.on_payload(&raw).await?;
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.http_port);
            start_server(port, Arc::new(ServerState::new(handler))).await
        }
    }
}

fn read_event(path: Option<&PathBuf>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read event from {}", path.display())),
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("Failed to read event from stdin")?;
            Ok(raw)
        }
    }
}
