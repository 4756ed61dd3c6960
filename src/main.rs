//! Assessment generator backend
//!
//! - Axum HTTP API for generating, editing, listing and deleting assessments
//! - Optional OpenAI-compatible generation (via environment variables)
//! - Static SPA fallback (STATIC_DIR, default ./static)
//!
//! Important env variables:
//!   PORT                 : u16 (default 5000)
//!   OPENAI_API_KEY       : enables generation if present
//!   OPENAI_BASE_URL      : default "https://api.openai.com/v1"
//!   OPENAI_MODEL         : default "gpt-4o-mini"
//!   LLM_TIMEOUT          : seconds (default 300)
//!   PROMPTS_CONFIG_PATH  : path to TOML prompt overrides
//!   STATIC_DIR           : built frontend directory
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod assessment;
mod config;
mod error;
mod extract;
mod generator;
mod option_id;
mod protocol;
mod question;
mod routes;
mod state;
mod store;
mod telemetry;
mod user_input;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: document store handle, prompts, optional generator.
  let state = Arc::new(AppState::from_env());

  let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "./static".into());
  let app = build_router(state, &static_dir);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "assessment_backend", %addr, %static_dir, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
