//! ldd-hub library - limestone detection hub
//!
//! Collects size-classification readings from sensing nodes, keeps running
//! totals, serves 24-hour and 7-day trend views and pushes refresh events to
//! open live streams.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod aggregate;
pub mod api;
pub mod broadcaster;
pub mod db;
pub mod error;
pub mod hub;
pub mod model;
pub mod trend;

pub use error::{HubError, HubResult};
pub use hub::{Credentials, Hub, HubSettings, IngestReceipt};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Create new application state
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

/// Build application router
///
/// Ingest and reset check their bearer credentials inside the hub; the
/// read views, live stream and health endpoint are open.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let writes = Router::new()
        .route("/update", post(api::ingest))
        .route("/api/reset", post(api::reset));

    let views = Router::new()
        .route("/api/totals", get(api::get_totals))
        .route("/api/trend/daily", get(api::get_daily_trend))
        .route("/api/trend/weekly", get(api::get_weekly_history))
        .route("/api/history", get(api::get_history))
        .route("/api/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(writes)
        .merge(views)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
