mod app;
mod form;
mod views;

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use rentacar_core::{
    config::{self, AppConfig},
    RentalSystem,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    tracing::info!(
        config = %config_path.display(),
        data_dir = %config.data_dir.display(),
        "Starting rentacar"
    );

    let system = RentalSystem::open(&config)?;
    let mut app = app::RentacarApp::new(system);
    let result = app.run().await;
    if let Some(notice) = app.exit_notice() {
        eprintln!("{notice}");
    }
    result
}

// The terminal is in raw mode while the app runs, so diagnostics only go to a file.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("rentacar.log"))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
