pub mod error;
pub mod pages;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, response::Html, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::aggregate::Aggregator;
use crate::chart;
use error::PageError;
use pages::LiveUpdates;

/// Shared by every request. Read-only after startup.
pub struct AppState {
    pub aggregator: Aggregator,
    /// Tracker base URL, used to link issue keys.
    pub browse_url: String,
    pub live: Option<LiveUpdates>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/idle_pbi", get(idle_pbi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, PageError> {
    let chart = state.aggregator.sprints_with_tech_debt().await?;
    let json = chart::to_json(&chart)?;
    Ok(Html(pages::dashboard(&json, state.live.as_ref())?))
}

async fn idle_pbi(State(state): State<Arc<AppState>>) -> Result<Html<String>, PageError> {
    let idle = state.aggregator.idle_pbis().await?;
    Ok(Html(pages::idle_pbis(&idle, &state.browse_url)?))
}

pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    tracing::info!(%addr, "dashboard listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}
