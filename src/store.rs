//! Feature store - read-only SQLite lookup
//!
//! The store artifact is produced entirely offline; at serving time it is a
//! keyed read-only collection. Retrieval is an indexed point query on the
//! client id, never a scan, so lookup cost does not grow with store size.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::ScoringError;
use crate::scoring::record::FeatureRecord;

/// Table holding one row per client, indexed on `client_id`
const FEATURES_TABLE: &str = "features";

/// Id column; excluded from the feature columns handed to the pipeline
const ID_COLUMN: &str = "client_id";

pub struct FeatureStore {
    pool: SqlitePool,
}

impl FeatureStore {
    /// Open the store. The URL should carry `mode=ro`; the serving process
    /// never writes here.
    pub async fn connect(store_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(store_url)
            .await?;

        tracing::info!("Feature store opened: {}", store_url);
        Ok(Self { pool })
    }

    /// Resolve a client id to its pre-computed feature record.
    ///
    /// An absent row is `NotFound`; any failure to read the store is
    /// `StoreUnavailable`. The two are never conflated.
    pub async fn lookup(&self, client_id: i64) -> Result<FeatureRecord, ScoringError> {
        let query = format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT 1",
            FEATURES_TABLE, ID_COLUMN
        );

        let row = sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ScoringError::StoreUnavailable(e.to_string()))?
            .ok_or(ScoringError::NotFound(client_id))?;

        decode_row(&row).map_err(|e| ScoringError::StoreUnavailable(e.to_string()))
    }
}

/// Decode a dynamic-schema row into a feature record.
///
/// SQLite storage classes map as: INTEGER/REAL -> value, NULL -> missing,
/// TEXT -> numeric parse (unparseable text is missing and later gets the
/// uniform fill, like any other gap).
fn decode_row(row: &SqliteRow) -> Result<FeatureRecord, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.columns().len());
    let mut values = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        if column.name() == ID_COLUMN {
            continue;
        }
        columns.push(column.name().to_string());
        values.push(decode_value(row, column.ordinal())?);
    }

    Ok(FeatureRecord::new(columns, values))
}

fn decode_value(row: &SqliteRow, ordinal: usize) -> Result<Option<f64>, sqlx::Error> {
    let raw = row.try_get_raw(ordinal)?;
    if raw.is_null() {
        return Ok(None);
    }

    let value = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => Some(row.try_get::<i64, _>(ordinal)? as f64),
        "REAL" => Some(row.try_get::<f64, _>(ordinal)?),
        "TEXT" => row.try_get::<String, _>(ordinal)?.trim().parse::<f64>().ok(),
        other => {
            tracing::debug!("Ignoring column with storage class {}", other);
            None
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a store file with a few representative rows
    async fn seeded_store(dir: &std::path::Path) -> FeatureStore {
        let path = dir.join("feature_store.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE features (
                client_id INTEGER PRIMARY KEY,
                credit_amount REAL,
                income_total REAL,
                annuity REAL,
                days_birth INTEGER,
                days_employed INTEGER,
                occupation TEXT,
                ext_source_1 REAL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE INDEX idx_features_client_id ON features (client_id)")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO features VALUES
                (100002, 500000.0, 150000.0, 20000.0, -12000, -2000, '3.5', 0.55),
                (100025, 1132573.5, 202500.0, NULL, -14815, -1652, 'Manager', NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let ro_url = format!("sqlite://{}?mode=ro", path.display());
        FeatureStore::connect(&ro_url).await.unwrap()
    }

    #[tokio::test]
    async fn test_lookup_decodes_typed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path()).await;

        let record = store.lookup(100002).await.unwrap();
        assert!(!record.has_column("client_id"));
        assert_eq!(record.get("credit_amount"), Some(500_000.0));
        assert_eq!(record.get("days_birth"), Some(-12_000.0));
        // Numeric text parses; the id column is gone
        assert_eq!(record.get("occupation"), Some(3.5));
    }

    #[tokio::test]
    async fn test_lookup_treats_null_and_junk_text_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path()).await;

        let record = store.lookup(100025).await.unwrap();
        assert_eq!(record.get("annuity"), None);
        assert_eq!(record.get("occupation"), None);
        assert!(record.has_column("occupation"));
    }

    #[tokio::test]
    async fn test_unknown_client_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path()).await;

        let err = store.lookup(999_999_999).await.unwrap_err();
        assert!(matches!(err, ScoringError::NotFound(999_999_999)));
    }

    #[tokio::test]
    async fn test_missing_store_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/no_such.db?mode=ro", dir.path().display());
        assert!(FeatureStore::connect(&url).await.is_err());
    }
}
