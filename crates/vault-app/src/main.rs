//! Secure Data Vault binary.
//!
//! Opens the record store, then either runs the interactive menu (stdin is a
//! terminal) or serves the REST API.

mod cli;
mod menu;

use std::io::IsTerminal;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vault_api::{start_server, AppState};
use vault_core::config::VaultConfig;
use vault_storage::{Database, RecordService};

use crate::cli::{CliArgs, Mode};
use crate::menu::{Menu, FAREWELL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mode = args.resolve_mode(
        std::io::stdin().is_terminal(),
        std::env::var_os("DOCKER_ENV").is_some(),
    );

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.resolve_log_level(mode))),
        )
        .init();

    tracing::info!(?mode, "Starting Secure Data Vault v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = VaultConfig::load_or_default(&config_file);
    config.apply_env();
    args.apply_overrides(&mut config);
    config.validate()?;
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    println!("=== Secure Data Vault ===");

    // Storage.
    let location = config.database_location();
    let db = match Database::open(&location, &config.database.table) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(error = %e, ?location, "Failed to connect to the record store");
            return Err(e.into());
        }
    };
    let service = Arc::new(RecordService::from_config(db, &config));

    let total = service.count()?;
    tracing::info!(total, table = %config.database.table, "Record store ready");
    if total == 0 {
        println!("No existing records found, starting fresh.");
    } else {
        println!("Loaded {} records from database", total);
    }

    match mode {
        Mode::Interactive => run_menu(service).await,
        Mode::Server => run_server(config, service).await,
    }
}

/// Run the menu on a blocking thread until it ends or a signal arrives.
async fn run_menu(service: Arc<RecordService>) -> Result<(), Box<dyn std::error::Error>> {
    let menu = tokio::task::spawn_blocking(move || {
        Menu::new(&service, std::io::stdin().lock(), std::io::stdout()).run()
    });

    tokio::select! {
        result = menu => {
            result??;
            Ok(())
        }
        _ = shutdown_signal() => {
            println!("\n{}", FAREWELL);
            // The menu thread is parked in a blocking stdin read.
            std::process::exit(0);
        }
    }
}

async fn run_server(
    config: VaultConfig,
    service: Arc<RecordService>,
) -> Result<(), Box<dyn std::error::Error>> {
    print_endpoints(&config);

    let state = AppState::new(config, service);
    start_server(state, async {
        shutdown_signal().await;
        println!("\nShutting down gracefully...");
    })
    .await?;

    println!("{}", FAREWELL);
    Ok(())
}

fn print_endpoints(config: &VaultConfig) {
    println!("API available at: http://localhost:{}", config.server.port);
    println!("Available endpoints:");
    println!("   GET    /                    - API status");
    println!("   GET    /records             - View all records (?sort=name|date&order=asc|desc)");
    println!("   POST   /records             - Add new record");
    println!("   GET    /records/{{id}}        - View one record");
    println!("   PUT    /records/{{id}}        - Update a record");
    println!("   DELETE /records/{{id|name}}   - Delete a record");
    println!("   GET    /search?keyword=term - Search records");
    println!("   GET    /stats               - View statistics");
    println!("   GET    /export              - Export data to file");
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
