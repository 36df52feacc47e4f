//! SQLite-backed Reading Store
//!
//! Timestamps are stored as epoch milliseconds so range filters compare
//! integers rather than formatted strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ldd_common::db::init::META_LAST_UPDATE;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{NodeTotals, ReadingStore};
use crate::error::{HubError, HubResult};
use crate::model::{Reading, ReadingBatch, SizeCategory};

type ReadingRow = (String, String, String, i64, String, i64);

/// Reading Store over a SQLite pool
///
/// Writers are serialized in-process before they reach SQLite, so a batch
/// never waits on the busy timeout behind another batch from this process.
pub struct SqliteReadingStore {
    pool: SqlitePool,
    write_gate: Mutex<()>,
}

impl SqliteReadingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Mutex::new(()),
        }
    }
}

fn from_millis(ms: i64) -> HubResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| HubError::StorageFailure(format!("Timestamp out of range: {}", ms)))
}

fn row_to_reading(row: ReadingRow) -> HubResult<Reading> {
    let (batch_id, node, status, recorded_at_ms, size_category, count) = row;
    let batch_id = Uuid::parse_str(&batch_id)
        .map_err(|e| HubError::StorageFailure(format!("Corrupt batch id {}: {}", batch_id, e)))?;
    let size_category = size_category
        .parse::<SizeCategory>()
        .map_err(|e| HubError::StorageFailure(format!("Corrupt row: {}", e)))?;

    Ok(Reading {
        batch_id,
        node,
        status,
        timestamp: from_millis(recorded_at_ms)?,
        size_category,
        count,
    })
}

#[async_trait]
impl ReadingStore for SqliteReadingStore {
    async fn insert_batch(&self, batch: &ReadingBatch) -> HubResult<usize> {
        let _guard = self.write_gate.lock().await;
        let recorded_at_ms = batch.timestamp().timestamp_millis();
        let batch_id = batch.batch_id().to_string();

        let mut tx = self.pool.begin().await?;
        let mut rows = 0;

        for (category, count) in batch.counts() {
            sqlx::query(
                r#"
                INSERT INTO readings (batch_id, node, status, recorded_at_ms, size_category, count)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&batch_id)
            .bind(batch.node())
            .bind(batch.status())
            .bind(recorded_at_ms)
            .bind(category.as_str())
            .bind(*count)
            .execute(&mut *tx)
            .await?;
            rows += 1;
        }

        // Never moves backwards, even if a slower clock stamped this batch
        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)
            "#,
        )
        .bind(META_LAST_UPDATE)
        .bind(recorded_at_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            batch_id = %batch_id,
            node = batch.node(),
            rows,
            "Committed reading batch"
        );
        Ok(rows)
    }

    async fn grouped_totals(&self) -> HubResult<NodeTotals> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT node, size_category, SUM(count)
            FROM readings
            GROUP BY node, size_category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut totals = NodeTotals::new();
        for (node, label, sum) in rows {
            match label.parse::<SizeCategory>() {
                Ok(category) => {
                    totals.entry(node).or_default().insert(category, sum);
                }
                Err(_) => warn!(node = %node, label = %label, "Skipping rows with unknown category"),
            }
        }
        Ok(totals)
    }

    async fn last_update(&self) -> HubResult<Option<DateTime<Utc>>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM meta WHERE key = ?")
            .bind(META_LAST_UPDATE)
            .fetch_optional(&self.pool)
            .await?;

        value.map(from_millis).transpose()
    }

    async fn reset(&self) -> HubResult<()> {
        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM readings")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM meta WHERE key = ?")
            .bind(META_LAST_UPDATE)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(deleted, "Reading store reset");
        Ok(())
    }

    async fn readings_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HubResult<Vec<Reading>> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT batch_id, node, status, recorded_at_ms, size_category, count
            FROM readings
            WHERE recorded_at_ms >= ? AND recorded_at_ms < ?
            ORDER BY recorded_at_ms ASC, id ASC
            "#,
        )
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_reading).collect()
    }

    async fn recent_readings(&self, limit: u32) -> HubResult<Vec<Reading>> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT batch_id, node, status, recorded_at_ms, size_category, count
            FROM readings
            ORDER BY recorded_at_ms DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_reading).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IngestRequest;
    use chrono::TimeZone;
    use ldd_common::db::init::init_database;
    use serde_json::json;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteReadingStore) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("reports.db")).await.unwrap();
        (temp_dir, SqliteReadingStore::new(pool))
    }

    fn batch(node: &str, stats: serde_json::Value, at: DateTime<Utc>) -> ReadingBatch {
        let request: IngestRequest =
            serde_json::from_value(json!({"node": node, "status": "ok", "rock_stats": stats})).unwrap();
        ReadingBatch::new(request, at).unwrap()
    }

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_batch_sums_per_node_and_category() {
        let (_dir, store) = store().await;

        let rows = store
            .insert_batch(&batch("N1", json!({"<30mm": 5, "50-80mm": 3}), t(8, 0, 0)))
            .await
            .unwrap();
        assert_eq!(rows, 2);
        store
            .insert_batch(&batch("N1", json!({"<30mm": 2}), t(8, 1, 0)))
            .await
            .unwrap();
        store
            .insert_batch(&batch("N2", json!({">150mm": 9}), t(8, 2, 0)))
            .await
            .unwrap();

        let totals = store.grouped_totals().await.unwrap();
        assert_eq!(totals["N1"][&SizeCategory::Under30], 7);
        assert_eq!(totals["N1"][&SizeCategory::From50To80], 3);
        assert_eq!(totals["N2"][&SizeCategory::Over150], 9);
        assert!(!totals["N2"].contains_key(&SizeCategory::Under30));
    }

    #[tokio::test]
    async fn test_last_update_tracks_latest_batch() {
        let (_dir, store) = store().await;
        assert_eq!(store.last_update().await.unwrap(), None);

        store.insert_batch(&batch("N1", json!({"<30mm": 1}), t(9, 0, 0))).await.unwrap();
        assert_eq!(store.last_update().await.unwrap(), Some(t(9, 0, 0)));

        store.insert_batch(&batch("N1", json!({"<30mm": 1}), t(9, 5, 0))).await.unwrap();
        assert_eq!(store.last_update().await.unwrap(), Some(t(9, 5, 0)));
    }

    #[tokio::test]
    async fn test_last_update_never_moves_backwards() {
        let (_dir, store) = store().await;

        store.insert_batch(&batch("N1", json!({"<30mm": 1}), t(9, 5, 0))).await.unwrap();
        store.insert_batch(&batch("N1", json!({"<30mm": 1}), t(9, 0, 0))).await.unwrap();
        assert_eq!(store.last_update().await.unwrap(), Some(t(9, 5, 0)));
    }

    #[tokio::test]
    async fn test_reset_clears_rows_and_marker() {
        let (_dir, store) = store().await;
        store.insert_batch(&batch("N1", json!({"<30mm": 1}), t(9, 0, 0))).await.unwrap();

        store.reset().await.unwrap();
        assert!(store.grouped_totals().await.unwrap().is_empty());
        assert_eq!(store.last_update().await.unwrap(), None);

        // Idempotent on an empty store
        store.reset().await.unwrap();
        assert!(store.grouped_totals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_is_inclusive_start_exclusive_end() {
        let (_dir, store) = store().await;
        store.insert_batch(&batch("N1", json!({"<30mm": 1}), t(10, 0, 0))).await.unwrap();
        store.insert_batch(&batch("N1", json!({"<30mm": 2}), t(10, 30, 0))).await.unwrap();
        store.insert_batch(&batch("N1", json!({"<30mm": 3}), t(11, 0, 0))).await.unwrap();

        let readings = store.readings_in_range(t(10, 0, 0), t(11, 0, 0)).await.unwrap();
        let counts: Vec<i64> = readings.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![1, 2]);
        assert_eq!(readings[0].timestamp, t(10, 0, 0));
        assert_eq!(readings[0].node, "N1");
        assert_eq!(readings[0].status, "ok");
    }

    #[tokio::test]
    async fn test_recent_readings_newest_first_with_limit() {
        let (_dir, store) = store().await;
        for (i, minute) in [0u32, 1, 2].iter().enumerate() {
            store
                .insert_batch(&batch("N1", json!({"<30mm": i}), t(12, *minute, 0)))
                .await
                .unwrap();
        }

        let recent = store.recent_readings(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, t(12, 2, 0));
        assert_eq!(recent[1].timestamp, t(12, 1, 0));
    }

    #[tokio::test]
    async fn test_concurrent_batches_are_not_lost() {
        let (_dir, store) = store().await;
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..20u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_batch(&batch("N1", json!({"<30mm": 1, "30-50mm": 2}), t(13, 0, i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let totals = store.grouped_totals().await.unwrap();
        assert_eq!(totals["N1"][&SizeCategory::Under30], 20);
        assert_eq!(totals["N1"][&SizeCategory::From30To50], 40);
        assert_eq!(store.last_update().await.unwrap(), Some(t(13, 0, 19)));
    }
}
