//! authburst -- brute-force burst detection for SSH authentication logs.
//!
//! This crate parses auth-log lines, groups failed attempts by origin,
//! clusters them into incidents against a count/window threshold, and ranks
//! origins by how many attempts their incidents cover.

pub mod analysis;
pub mod api;
pub mod config;
pub mod detect;
pub mod export;
pub mod parse;
pub mod storage;

use anyhow::Result;
use std::path::Path;

/// Serve stored analysis results over HTTP.
pub async fn serve(bind: &str, db_path: &Path) -> Result<()> {
    tracing::info!(db_path = %db_path.display(), "Initializing database");
    let pool = storage::open_pool(db_path)?;

    let addr: std::net::SocketAddr = bind.parse()?;
    let app = api::router(api::state::AppState::new(pool));

    tracing::info!(%addr, "authburst API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
