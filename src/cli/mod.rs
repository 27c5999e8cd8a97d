//! Command line entry points
//!
//! - `serve`: HTTP API
//! - `ask`: index local files and answer one question

pub mod ask;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Self-correcting RAG - answers questions about your documents
#[derive(Parser)]
#[command(name = "self-correcting-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Index documents and answer a single question
    Ask(ask::AskArgs),
}

/// Load `.env` and layered configuration, then install the subscriber
fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    logging::init_logging(&config.logging, &config.observability.tracing);

    config
}
