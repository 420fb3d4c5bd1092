//! Studyplan · Timetable Wizard Backend
//!
//! - Axum HTTP + WebSocket API for the configuration wizard
//! - File-backed draft persistence (resume-anywhere)
//! - Optional external timetable-generation service (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   PLANNER_DATA_DIR        : draft storage directory (default ./data)
//!   PLANNER_CONFIG_PATH     : path to TOML config (wizard defaults)
//!   GENERATION_API_URL      : enables the generation service if present
//!   GENERATION_API_KEY      : optional bearer token for that service
//!   GENERATION_TIMEOUT_SECS : request timeout (default 20)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod persist;
mod allocation;
mod suggest;
mod wizard;
mod generation;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (draft store, defaults, generation client).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "studyplan_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
