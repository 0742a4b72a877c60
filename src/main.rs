//! Donation tracker cli

use clap::Parser;
use donation_tracker::*;
use migration::{Migrator, MigratorTrait};
use std::path::PathBuf;
use tracing::{info, warn};

/// Cli
#[derive(Debug, Parser)]
#[command(name = "donation-tracker", about = "donation tracker server.", version)]
pub struct Cli {
    /// config file path
    #[arg(short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "INFO");
    }
    // try to load config from .env
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let state: AppState = AppState::create(args.config, Some("DONATION".to_string())).await?;
    match state.service.db() {
        Ok(db) => Migrator::up(db, None).await?,
        Err(_) => warn!("Skip migrations, the donation store is not configured"),
    }
    info!("Start donation tracker server");
    start(state).await?;
    info!("Server shutdown");
    Ok(())
}
