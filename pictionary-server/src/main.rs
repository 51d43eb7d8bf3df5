use std::net::IpAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use pictionary_core::WordCatalog;
use pictionary_persistence::{connection::connect_and_migrate, repositories::SettingsRepository};
use pictionary_server::{
    config::Config, create_routes, recognition::RecognitionClient, round_manager::RoundManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Air Pictionary server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = match &config.words_file {
        Some(path) => {
            info!("Loading words from {}", path);
            WordCatalog::load(path)
        }
        None => WordCatalog::builtin(),
    };
    let catalog = match catalog {
        Ok(catalog) if !catalog.is_empty() => catalog,
        Ok(_) => {
            error!("Word catalog is empty, the server needs at least one word");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load word catalog: {}", e);
            std::process::exit(1);
        }
    };
    info!("Word catalog ready with {} words", catalog.word_count());

    // Initialize database connection and run migrations
    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let settings_repository = SettingsRepository::new(db);

    let recognizer = RecognitionClient::new(config.recognition_config());

    let round_manager = Arc::new(RoundManager::new(
        Arc::new(catalog),
        Arc::new(recognizer),
        settings_repository.clone(),
        config.arbitration_timing(),
        config.round_duration_seconds,
    ));

    let routes = create_routes(round_manager.clone(), Arc::new(settings_repository));

    let host = match config.host.parse::<IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            error!("Invalid HOST {:?}: {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((host, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;

    if let Ok(outcome) = round_manager.abandon_round().await {
        info!("Abandoned round for {} on shutdown", outcome.word);
    }
    info!("Server shutdown complete.");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                if let Err(e) = signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
