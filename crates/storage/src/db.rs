use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn parse_stored_date(text: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| StorageError::InvalidData(format!("date '{text}': {e}")))
}

pub(crate) fn parse_stored_datetime(text: &str) -> Result<NaiveDateTime, StorageError> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .map_err(|e| StorageError::InvalidData(format!("timestamp '{text}': {e}")))
}

/// Opens (creating if needed) the SQLite database at `path` and applies the schema.
pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    tracing::debug!(path = %path.display(), "database ready");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leases (
            id TEXT PRIMARY KEY,
            landlord_id TEXT NOT NULL,
            tenant_name TEXT NOT NULL,
            tenant_phone TEXT,
            account_ref TEXT,
            monthly_rent_cents INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leases_phone ON leases (tenant_phone)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payment_channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            landlord_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            number TEXT NOT NULL,
            UNIQUE (landlord_id, kind, number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY,
            lease_id TEXT NOT NULL,
            amount_due_cents INTEGER NOT NULL,
            due_date TEXT NOT NULL,
            external_reference TEXT,
            status TEXT NOT NULL DEFAULT 'outstanding',
            FOREIGN KEY (lease_id) REFERENCES leases(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payment_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider TEXT NOT NULL,
            external_transaction_id TEXT NOT NULL,
            landlord_id TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            occurred_at TEXT NOT NULL,
            narrative TEXT NOT NULL,
            payer_phone TEXT,
            payer_paybill TEXT,
            payer_account_ref TEXT,
            reconciliation_status TEXT NOT NULL DEFAULT 'unmatched',
            matched_invoice_id TEXT,
            matched_lease_id TEXT,
            confidence INTEGER,
            method TEXT,
            reasons_json TEXT NOT NULL DEFAULT '[]',
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (provider, external_transaction_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT NOT NULL,
            dialect TEXT NOT NULL,
            provider TEXT NOT NULL,
            landlord_id TEXT NOT NULL,
            content_hash TEXT,
            total INTEGER NOT NULL,
            matched INTEGER NOT NULL,
            unmatched INTEGER NOT NULL,
            duplicates INTEGER NOT NULL,
            errors INTEGER NOT NULL,
            details_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_db_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kodi.db");
        let pool = create_db(&path).await.unwrap();
        pool.close().await;
        // Re-opening runs the migrations again against existing tables.
        let pool = create_db(&path).await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(
            names,
            vec!["invoices", "leases", "payment_channels", "payment_events", "upload_runs"]
        );
    }

    #[test]
    fn stored_dates_round_trip_through_text() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(parse_stored_date(&date.format(DATE_FORMAT).to_string()).unwrap(), date);
        assert!(matches!(parse_stored_datetime("yesterday"), Err(StorageError::InvalidData(_))));
    }
}
