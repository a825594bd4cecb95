pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod location;
pub mod models;
pub mod render;
pub mod settings;
pub mod triage;
mod utils;

use clap::Parser;

pub use config::AppConfig;
pub use dispatch::{
    project, DispatchEvent, FallbackPolicy, Projection, SessionController, SessionSnapshot,
    SessionState, StatusLabel,
};
pub use error::{ClassifierError, DispatchError};
pub use models::{DispatchRecord, Priority, TriageResponse, UserProfile};

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    let config = AppConfig::from_env();

    log::info!("ResQ starting up...");
    cli::execute(cli, config).await
}
