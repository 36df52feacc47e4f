//! Tests for database creation and schema setup

use ldd_common::db::init::{create_schema, init_database};
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("reports.db");

    let pool = init_database(&db_path).await.expect("database should initialize");

    assert!(db_path.exists(), "Database file was not created");
    assert_eq!(table_names(&pool).await, vec!["meta", "readings"]);
}

#[tokio::test]
async fn test_database_opens_existing_and_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("reports.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO readings (batch_id, node, status, recorded_at_ms, size_category, count)
         VALUES ('b', 'N1', 'ok', 0, '<30mm', 4)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.expect("existing database should open");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("reports.db")).await.unwrap();

    create_schema(&pool).await.expect("second schema pass should succeed");
    create_schema(&pool).await.expect("third schema pass should succeed");
    assert_eq!(table_names(&pool).await.len(), 2);
}

#[tokio::test]
async fn test_negative_counts_rejected_by_schema() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("reports.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO readings (batch_id, node, status, recorded_at_ms, size_category, count)
         VALUES ('b', 'N1', 'ok', 0, '<30mm', -1)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_oversized_counts_rejected_by_schema() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("reports.db")).await.unwrap();

    let insert = |count: i64| {
        sqlx::query(
            "INSERT INTO readings (batch_id, node, status, recorded_at_ms, size_category, count)
             VALUES ('b', 'N1', 'ok', 0, '<30mm', ?)",
        )
        .bind(count)
    };

    assert!(insert(4_294_967_295).execute(&pool).await.is_ok());
    assert!(insert(4_294_967_296).execute(&pool).await.is_err());
    assert!(insert(i64::MAX).execute(&pool).await.is_err());
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("reports.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
