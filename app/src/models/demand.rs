use super::CountRecord;
use crate::error::DBError;
use chrono::{DateTime, Utc};
use elevator_core::DemandReading;
use sqlx::SqlitePool;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct DemandDao {
    pub(crate) id: i64,
    pub(crate) timestamp: Option<DateTime<Utc>>,
    pub(crate) floor: i64,
    pub(crate) source_address: String,
}

impl DemandDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn floor(&self) -> i64 {
        self.floor
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }
}

impl From<DemandDao> for DemandReading {
    fn from(val: DemandDao) -> Self {
        DemandReading {
            timestamp: val.timestamp,
            floor: val.floor,
            source_address: val.source_address,
        }
    }
}

pub async fn insert(
    conn: &SqlitePool,
    floor: i64,
    source_address: &str,
    timestamp: DateTime<Utc>,
) -> Result<DemandDao, DBError> {
    // RETURNING rows are drained so the insert is committed on return
    let mut rows = sql_stmnt!(
        DemandDao,
        "INSERT INTO elevator_demand (timestamp, floor, source_address) VALUES (?, ?, ?) RETURNING *",
        timestamp,
        floor,
        source_address
    )
    .fetch_all(conn)
    .await?;
    Ok(rows.pop().ok_or(sqlx::Error::RowNotFound)?)
}

/// READ elevator_demand, in insertion order
pub async fn read(conn: &SqlitePool) -> Result<Vec<DemandDao>, DBError> {
    Ok(
        sql_stmnt!(DemandDao, "SELECT * FROM elevator_demand ORDER BY id ASC")
            .fetch_all(conn)
            .await?,
    )
}

pub async fn count(conn: &SqlitePool) -> Result<i64, DBError> {
    let rows = sql_stmnt!(CountRecord, "SELECT count(*) as count FROM elevator_demand")
        .fetch_one(conn)
        .await?;
    Ok(rows.count())
}
