//! # OCPP CSMS
//!
//! OCPP 2.0.1 Central System core for managing EV charging stations over
//! persistent WebSocket connections: admission control, token and charger
//! identity validation, and the per-connection transaction state machine.
//!
//! ## Architecture
//!
//! - **domain**: charge point identity and per-connection session state
//! - **application**: validators and OCPP 2.0.1 message handlers
//! - **session**: connection admission ledger shared across connections
//! - **support**: OCPP-J frame codec
//! - **server**: WebSocket accept loop and per-connection tasks
//! - **config**: TOML configuration (allow-lists and admission policy)

pub mod application;
pub mod config;
pub mod domain;
pub mod server;
pub mod session;
pub mod support;

pub use config::{default_config_path, AppConfig};
pub use server::OcppServer;
