pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod mirror;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

pub use config::Config;
use scheduler::Scheduler;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Loads configuration, builds the runtime, and dispatches the CLI verb.
pub fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if config.general.worker_threads > 0 {
        builder.worker_threads(config.general.worker_threads);
    }

    let runtime = builder.build()?;
    runtime.block_on(run_command(config))
}

async fn run_command(config: Config) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "daemon" | "-d" | "--daemon" => run_daemon(config).await,

        "clone" => {
            let endpoint = args.get(2).map(String::as_str);
            run_clone(config, endpoint).await
        }

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Ludarr - IGDB Mirror & Metadata Matcher");
    println!("Serves game metadata lookups from a local catalog mirror");
    println!();
    println!("USAGE:");
    println!("  ludarr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  daemon            Serve the HTTP API and keep the mirror fresh");
    println!("  clone [endpoint]  Clone all collections, or a single one");
    println!("                    (games, alternative_names, external_games,");
    println!("                    game_localizations, companies)");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  ludarr init                # Write config.toml");
    println!("  ludarr clone               # Full mirror clone");
    println!("  ludarr clone games         # Re-clone only the games collection");
    println!("  ludarr daemon              # Start the service");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure IGDB credentials, MongoDB, webhooks.");
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Ludarr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let shared = Arc::new(SharedState::new(config.clone()).await?);

    if config.webhooks.register_on_startup {
        let current = mirror::list_registered_webhooks(&shared.igdb).await?;
        shared
            .mirrors
            .configure_all_webhooks(&config.webhooks, &current)
            .await?;
    }

    if config.scheduler.clone_on_startup {
        let mirrors = shared.mirrors.clone();
        tokio::spawn(async move {
            if let Err(e) = mirrors.clone_all().await {
                error!("Startup clone failed: {e:#}");
            }
        });
    }

    let scheduler = Scheduler::new(Arc::clone(&shared), config.scheduler.clone());
    let scheduler_handle = tokio::spawn(async move {
        scheduler.start().await;
    });

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        let app_state = Arc::new(api::AppState::new(Arc::clone(&shared)));
        let app = api::router(app_state).await;

        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("Web API running at http://{addr}");
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {e}");
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {e}");
        }
    }

    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}

async fn run_clone(config: Config, endpoint: Option<&str>) -> anyhow::Result<()> {
    let shared = SharedState::new(config).await?;

    match endpoint {
        Some(endpoint) => {
            let total = shared.mirrors.clone_endpoint(endpoint).await?;
            println!("✓ Cloned {endpoint}: {total} items");
        }
        None => {
            shared.mirrors.clone_all().await?;
            println!("✓ All collections cloned.");
        }
    }

    Ok(())
}
