//! CodeQuest · Coding Game Backend
//!
//! - Axum HTTP API for AI-generated content (challenges, battle questions,
//!   code verification, tutor chat) backed by an OpenAI-compatible model
//! - Local textual grading of code submissions (no code is executed)
//! - Built-in challenge bank and in-memory player progress
//!
//! Important env variables:
//!   PORT               : u16 (default 3001)
//!   OPENAI_API_KEY     : enables the AI endpoints if present
//!   OPENAI_BASE_URL    : default "https://api.openai.com/v1"
//!   OPENAI_MODEL       : default "gpt-4o-mini"
//!   MODEL_TIMEOUT_SECS : per-call model timeout (default 30)
//!   AGENT_CONFIG_PATH  : path to TOML config (prompts + extra challenge bank entries)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod validator;
mod llm;
mod openai;
mod gateway;
mod progress;
mod seeds;
mod state;
mod protocol;
mod routes;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();

  // Shared application state (gateway, challenge bank, progress store).
  let state = AppState::new(&settings);

  // HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "codequest_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "codequest_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "codequest_backend", "Shutdown signal received");
}
