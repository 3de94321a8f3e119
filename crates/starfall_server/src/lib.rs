//! # Starfall Server
//!
//! WebSocket front end for the Starfall simulation.
//!
//! Clients connect to `/ws?clientId=<id>`, log in, and send commands as
//! JSON. A single world task owns the [`GameLoop`], applies client input
//! between ticks and broadcasts a [`protocol::WorldUpdate`] after each one.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clients;
pub mod config;
pub mod net;
pub mod protocol;
pub mod world;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use starfall_core::data::DataTables;
use starfall_core::error::GameError;
use starfall_core::game_loop::{GameConfig, GameLoop};
use starfall_core::rng::SeededRandom;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::clients::ClientManager;
use crate::config::{ServerConfig, INPUT_CHANNEL_CAPACITY};
use crate::net::{ws_handler, AppState};
use crate::world::run_world;

/// Failures while preparing the simulation.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Data tables could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Data tables are malformed or inconsistent.
    #[error(transparent)]
    Data(#[from] GameError),
}

/// Build the simulation described by `config`.
///
/// # Errors
///
/// Returns an error when the configured data tables cannot be read or
/// fail validation.
pub fn build_game(config: &ServerConfig) -> Result<GameLoop, ServerError> {
    let tables = match &config.data_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
                path: path.clone(),
                source,
            })?;
            DataTables::from_ron_str(&path.display().to_string(), &text)?.validated()?
        }
        None => DataTables::builtin(),
    };
    let rng = config
        .seed
        .map_or_else(SeededRandom::from_entropy, SeededRandom::new);
    tracing::info!(seed = ?config.seed, "Simulation ready");
    Ok(GameLoop::new(GameConfig::default(), tables, Box::new(rng)))
}

/// Routes served by the game server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve `game` on `listener` until the listener fails.
///
/// # Errors
///
/// Returns the listener's I/O error.
pub async fn run(listener: TcpListener, config: ServerConfig, game: GameLoop) -> std::io::Result<()> {
    let (inputs, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    let clients = Arc::new(ClientManager::new());

    tokio::spawn(run_world(game, input_rx, Arc::clone(&clients), config));

    let app = router(AppState { inputs, clients });
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, app).await
}
