//! Documentation of a content-site counter and feed backend.
//!
//! A single spreadsheet-like table holds the articles of the site and the
//! tallies of its trolley poll. This server decodes the table, serves the feed
//! and owns the like and vote counters. The browser client lives in the
//! `client` crate, the operator tooling in `process`.
//!
//!
//!
//! # General Infrastructure
//! - Browser loads the static frontend, then talks to this server only
//! - Server talks to the table through a sheets-style values API (or a local JSON file in development)
//! - Editors change titles, dates and bodies directly in the table
//! - Counts are written back to the table one cell at a time
//!
//!
//!
//! # Consistency
//!
//! **Goal**: never lose an increment inside one process, and never let a failed write turn into a visible rollback.
//!
//! - Each process keeps the authoritative count of every key in memory
//! - Increments of one key are serialized, then written through to the table
//! - A failed write keeps the new count and is retried by a background resync
//! - Two server processes sharing a table can still overwrite each other, the table has no compare-and-swap
//! - Keys missing from the table are rejected, rows are never appended
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET | `/articles` | | `[ArticleRecord]` |
//! | GET | `/feed` | query string | `{ pageItems, totalPages, page, totalItems }` |
//! | POST | `/like` | `{ articleId }` | `{ likes }` |
//! | POST | `/vote`, `/trolley-vote` | `{ option }` | `{ votes: { A, B } }` |
//! | GET | `/votes`, `/trolley-votes` | | `{ votes: { A, B } }` |
//!
//! Errors are `{ error }` with 400, 404, 409 or 503.
//!
//!
//!
//! # Setup
//!
//! Run against a local table.
//! ```sh
//! cargo run -p process -- seed table.json
//! TABLE_FILE=table.json RUST_LOG=info cargo run
//! ```
//!
//! Run against a real sheet.
//! ```sh
//! SPREADSHEET_ID=... SHEETS_TOKEN=... RUST_LOG=info cargo run
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod counters;
pub mod error;
pub mod routes;
pub mod state;
pub mod sync;
pub mod utils;

use config::Config;
use error::StartupError;
use routes::{
    articles_handler, feed_handler, like_handler, not_found_handler, vote_handler, votes_handler,
};
use state::AppState;
use sync::spawn_resync;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/articles", get(articles_handler))
        .route("/feed", get(feed_handler))
        .route("/like", post(like_handler))
        .route("/vote", post(vote_handler))
        .route("/votes", get(votes_handler))
        .route("/trolley-vote", post(vote_handler))
        .route("/trolley-votes", get(votes_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), StartupError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    let resync = spawn_resync(state.clone());

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    resync.abort();

    let flushed = state.counters.flush_pending().await;
    if !state.counters.pending().is_empty() {
        warn!("Shutting down with unsynced counters: {:?}", state.counters.pending());
    } else if flushed > 0 {
        info!("Flushed {flushed} pending counters before exit");
    }

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
