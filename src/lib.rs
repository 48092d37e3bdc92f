//! Client for the Docker Engine HTTP API.
//!
//! Responses are decoded leniently: missing, null or mistyped fields fall
//! back to defaults, and list responses drop only the elements that cannot be
//! decoded at all (see [`decode::Batch`]). Only transport failures and
//! unexpected HTTP statuses surface as [`Error`]s.

pub mod cli;
pub mod compose;
pub mod config;
pub mod container;
pub mod container_manager;
pub mod decode;
pub mod docker_client;
pub mod error;
pub mod image_manager;
pub mod logs;
pub mod mapper;
pub mod network_manager;
pub mod transport;
pub mod types;

use clap::Parser;
use cli::dispatch;
pub use cli::CLI;
pub use config::{Config, Endpoint};
pub use docker_client::DockerClient;
pub use error::{Error, Result};
use tracing_subscriber::EnvFilter;

pub async fn run() {
    let cli = CLI::parse();
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
    dispatch(&cli).await;
}
