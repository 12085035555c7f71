//!
//! OCPP 2.0.1 WebSocket server for managing EV charging stations.
//! Reads configuration from TOML file (~/.config/ocpp-csms/config.toml).

use std::sync::Arc;

use tracing::{error, info};

use ocpp_csms::application::validation::{ChargerIdentityValidator, TokenValidator};
use ocpp_csms::{default_config_path, AppConfig, OcppServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("OCPP_CSMS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Initialize logging with configured level
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting OCPP 2.0.1 Central System...");

    // ── Admission policy ───────────────────────────────────────
    // A malformed serial number pattern is a startup failure: validation
    // must stay total once the server is accepting connections.
    let charger_validator = Arc::new(ChargerIdentityValidator::from_entries(
        &app_cfg.accepted_chargers,
    )?);
    let token_validator = Arc::new(TokenValidator::new(app_cfg.accepted_tokens.clone()));

    info!(
        accepted_chargers = app_cfg.accepted_chargers.len(),
        accepted_tokens = app_cfg.accepted_tokens.len(),
        allow_multiple_serial_numbers = app_cfg.security.allow_multiple_serial_numbers,
        "Admission policy loaded"
    );

    // ── WebSocket server ───────────────────────────────────────
    let server = OcppServer::new(Arc::new(app_cfg), charger_validator, token_validator);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("WebSocket server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("OCPP Central System shutdown complete");
    Ok(())
}
