//! HTTP API handlers for ldd-hub

pub mod auth;
pub mod buildinfo;
pub mod health;
pub mod ingest;
pub mod sse;
pub mod views;

pub use auth::presented_token;
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use ingest::{ingest, reset};
pub use sse::{event_stream, live_stream};
pub use views::{get_daily_trend, get_history, get_totals, get_weekly_history};
