//! # `till` Entry Point
//!
//! Starts the service and prints where the store stands.
//!
//! ```text
//! till [CONFIG]
//!
//!   CONFIG   path to a till.toml (default: platform config dir, optional)
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (defaults → file → `TILL_*` env)
//! 3. Connect to database & run migrations
//! 4. Restore the open cashbox session, if any
//! 5. Print a status summary (store, session, last closing)

use std::path::PathBuf;
use std::process::ExitCode;

use till_service::commands::cashbox;
use till_service::error::StartupError;
use till_service::state::ConfigState;
use till_service::{init_tracing, TillService};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ConfigState::load(config_path.as_deref())?;
    let service = TillService::start(config).await?;

    print_status(&service).await;

    service.shutdown().await;
    Ok(())
}

async fn print_status(service: &TillService) {
    let config = &service.config;
    println!("{}", config.store.name);

    match cashbox::current_session(&service.cashbox).await {
        Ok(Some(session)) => println!(
            "  session  open since {} ({} sales, expected {})",
            session.opened_at.format("%Y-%m-%d %H:%M"),
            session.sales.len(),
            config.format_currency(session.expected_total().cents())
        ),
        _ => println!("  session  closed"),
    }

    match cashbox::last_closing(&service.db).await {
        Ok(Some(closing)) => println!(
            "  last     closed {} (difference {})",
            closing.closed_at.format("%Y-%m-%d %H:%M"),
            config.format_currency(closing.difference.cents())
        ),
        Ok(None) => println!("  last     no closings yet"),
        Err(err) => println!("  last     unavailable: {}", err.message),
    }
}
