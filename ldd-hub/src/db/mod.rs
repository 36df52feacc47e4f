//! Reading Store
//!
//! The single source of truth for readings and the last-update marker.
//! [`ReadingStore`] lists the operations any backend must support;
//! [`SqliteReadingStore`] is the SQLite implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::HubResult;
use crate::model::{Reading, ReadingBatch, SizeCategory};

mod readings;
pub use readings::SqliteReadingStore;

/// node → category → summed count
pub type NodeTotals = BTreeMap<String, BTreeMap<SizeCategory, i64>>;

/// Operations a storage backend must support
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist every row of `batch` and advance the last-update marker
    ///
    /// All rows and the marker commit together or not at all. Returns the
    /// number of rows written.
    async fn insert_batch(&self, batch: &ReadingBatch) -> HubResult<usize>;

    /// Summed counts per node and category
    ///
    /// Only combinations that have rows are present.
    async fn grouped_totals(&self) -> HubResult<NodeTotals>;

    /// Instant of the latest committed batch, if any
    async fn last_update(&self) -> HubResult<Option<DateTime<Utc>>>;

    /// Delete all readings and clear the last-update marker atomically
    async fn reset(&self) -> HubResult<()>;

    /// Readings with `start <= timestamp < end`, oldest first
    async fn readings_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HubResult<Vec<Reading>>;

    /// Most recent readings, newest first
    async fn recent_readings(&self, limit: u32) -> HubResult<Vec<Reading>>;
}
