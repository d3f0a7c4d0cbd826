use crate::error::StoreError;
use crate::models::{open_sqlite, sql_stmnt};
use chrono::{DateTime, TimeZone, Utc};
use elevator_core::FeatureValue;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;

/// Latest feature values of one entity in one view.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineRow {
    pub entity_key: i64,
    pub event_timestamp: DateTime<Utc>,
    pub features: BTreeMap<String, FeatureValue>,
}

#[derive(sqlx::FromRow)]
struct OnlineRecord {
    entity_key: i64,
    event_timestamp: i64,
    features: String,
}

impl TryFrom<OnlineRecord> for OnlineRow {
    type Error = StoreError;

    fn try_from(record: OnlineRecord) -> Result<Self, Self::Error> {
        let event_timestamp = Utc
            .timestamp_micros(record.event_timestamp)
            .single()
            .ok_or_else(|| StoreError::Column("event_timestamp".to_owned()))?;
        Ok(OnlineRow {
            entity_key: record.entity_key,
            event_timestamp,
            features: serde_json::from_str(&record.features)?,
        })
    }
}

/// Key/value store serving the newest features per entity.
#[derive(Clone)]
pub struct OnlineStore {
    pool: SqlitePool,
}

impl OnlineStore {
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = open_sqlite(url).await?;
        sql_stmnt!(
            r#"CREATE TABLE IF NOT EXISTS online_features (
                feature_view TEXT NOT NULL,
                entity_key INTEGER NOT NULL,
                event_timestamp INTEGER NOT NULL,
                features TEXT NOT NULL,
                PRIMARY KEY (feature_view, entity_key)
            )"#
        )
        .execute(&pool)
        .await?;
        Ok(OnlineStore { pool })
    }

    /// Upserts `rows`, a stored row is only replaced by a newer one.
    ///
    /// Returns the number of rows that were written.
    pub async fn write(&self, view: &str, rows: &[OnlineRow]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for row in rows {
            let features = serde_json::to_string(&row.features)?;
            let res = sql_stmnt!(
                r#"INSERT INTO online_features (feature_view, entity_key, event_timestamp, features)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (feature_view, entity_key) DO UPDATE SET
                        event_timestamp = excluded.event_timestamp,
                        features = excluded.features
                    WHERE excluded.event_timestamp >= online_features.event_timestamp"#,
                view,
                row.entity_key,
                row.event_timestamp.timestamp_micros(),
                features
            )
            .execute(&mut *tx)
            .await?;
            written += res.rows_affected();
        }
        tx.commit().await?;
        debug!(view, written, "Wrote online rows");
        Ok(written)
    }

    pub async fn read(&self, view: &str, entity_key: i64) -> Result<Option<OnlineRow>, StoreError> {
        let record = sql_stmnt!(
            OnlineRecord,
            r#"SELECT entity_key, event_timestamp, features FROM online_features
                WHERE feature_view = ? AND entity_key = ?"#,
            view,
            entity_key
        )
        .fetch_optional(&self.pool)
        .await?;
        record.map(OnlineRow::try_from).transpose()
    }
}
