//! Hub facade
//!
//! The operations the presentation layer calls. Credentials and the clock
//! are injected; the store is the single source of truth and the
//! broadcaster is told about every committed write.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use ldd_common::api::CredentialCheck;
use ldd_common::time::Clock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregate::{self, TotalsView};
use crate::broadcaster::{Broadcaster, HubEvent, Subscriber, DEFAULT_QUEUE_CAPACITY, KEEP_ALIVE_INTERVAL};
use crate::db::ReadingStore;
use crate::error::{HubError, HubResult};
use crate::model::{IngestRequest, Reading, ReadingBatch};
use crate::trend::{self, DailyTrend, WeeklyHistory};

/// Upper bound on a single history request
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// Tunables for a [`Hub`]
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Zone whose midnights bound the weekly days
    pub local_offset: FixedOffset,
    /// Silence after which a live stream emits a keep-alive
    pub keep_alive: Duration,
    /// Rows returned by the history view when no limit is given
    pub history_limit: u32,
    /// Pending events buffered per subscriber
    pub subscriber_queue: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            local_offset: Utc.fix(),
            keep_alive: KEEP_ALIVE_INTERVAL,
            history_limit: 100,
            subscriber_queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Credential checks for the two protected operations
#[derive(Clone)]
pub struct Credentials {
    pub ingest: Arc<dyn CredentialCheck>,
    pub admin: Arc<dyn CredentialCheck>,
}

/// Result of a successful ingest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReceipt {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub batch_id: Uuid,
    pub rows: usize,
}

/// Core service: ingestion, aggregate and trend views, live updates
pub struct Hub {
    store: Arc<dyn ReadingStore>,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
    settings: HubSettings,
}

impl Hub {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        clock: Arc<dyn Clock>,
        credentials: Credentials,
        settings: HubSettings,
    ) -> Self {
        let broadcaster = Broadcaster::new(settings.subscriber_queue);
        Self {
            store,
            broadcaster,
            clock,
            credentials,
            settings,
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    fn authorize(check: &dyn CredentialCheck, credential: Option<&str>, operation: &str) -> HubResult<()> {
        if check.verify(credential) {
            Ok(())
        } else {
            warn!(operation, presented = credential.is_some(), "Rejected credential");
            Err(HubError::Unauthorized)
        }
    }

    /// Ingest a raw JSON body
    ///
    /// The credential is checked before the body is looked at.
    pub async fn ingest_json(&self, credential: Option<&str>, body: &[u8]) -> HubResult<IngestReceipt> {
        Self::authorize(self.credentials.ingest.as_ref(), credential, "ingest")?;
        let request = IngestRequest::from_json_slice(body)?;
        self.store_batch(request).await
    }

    /// Validate, persist and announce one batch of readings
    pub async fn ingest(&self, credential: Option<&str>, request: IngestRequest) -> HubResult<IngestReceipt> {
        Self::authorize(self.credentials.ingest.as_ref(), credential, "ingest")?;
        self.store_batch(request).await
    }

    async fn store_batch(&self, request: IngestRequest) -> HubResult<IngestReceipt> {
        let batch = ReadingBatch::new(request, self.clock.now())?;

        let rows = self.store.insert_batch(&batch).await.map_err(|e| {
            error!(node = batch.node(), "Failed to store batch: {}", e);
            e
        })?;

        info!(
            batch_id = %batch.batch_id(),
            node = batch.node(),
            status = batch.status(),
            rows,
            "Stored readings"
        );

        self.broadcaster.publish(HubEvent::ReadingsIngested {
            batch_id: batch.batch_id(),
            node: batch.node().to_string(),
            rows,
            timestamp: batch.timestamp(),
        });

        Ok(IngestReceipt {
            message: "Data saved.".to_string(),
            timestamp: batch.timestamp(),
            batch_id: batch.batch_id(),
            rows,
        })
    }

    /// Totals per node and category plus the last update instant
    pub async fn totals(&self) -> HubResult<TotalsView> {
        aggregate::compute_totals(self.store.as_ref()).await
    }

    /// Per-minute category percentages for the last 24 hours
    pub async fn daily_trend(&self) -> HubResult<DailyTrend> {
        trend::compute_daily(self.store.as_ref(), self.clock.now()).await
    }

    /// Per-day small/large percentages for the last 7 local days
    pub async fn weekly_history(&self) -> HubResult<WeeklyHistory> {
        trend::compute_weekly(self.store.as_ref(), self.clock.now(), &self.settings.local_offset).await
    }

    /// Most recent readings, newest first
    pub async fn history(&self, limit: Option<u32>) -> HubResult<Vec<Reading>> {
        let limit = limit
            .unwrap_or(self.settings.history_limit)
            .min(MAX_HISTORY_LIMIT);
        self.store.recent_readings(limit).await
    }

    /// Wipe all readings and the last-update marker
    pub async fn reset(&self, credential: Option<&str>) -> HubResult<()> {
        Self::authorize(self.credentials.admin.as_ref(), credential, "reset")?;

        self.store.reset().await.map_err(|e| {
            error!("Failed to reset reading store: {}", e);
            e
        })?;
        info!("Reading store reset");

        self.broadcaster.publish(HubEvent::ReadingsReset {
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Register a live-view subscriber
    pub fn open_live_stream(&self) -> Subscriber {
        let subscriber = self.broadcaster.subscribe();
        info!(
            subscriber = subscriber.id(),
            subscribers = self.broadcaster.subscriber_count(),
            "Live stream opened"
        );
        subscriber
    }
}
