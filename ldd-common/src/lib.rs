//! # LDD Common Library
//!
//! Shared code for the limestone detection services:
//! - Error and Result types
//! - Bootstrap configuration and data folder resolution
//! - Credential checking for ingest and admin operations
//! - Injected clock
//! - SQLite pool setup and schema

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
