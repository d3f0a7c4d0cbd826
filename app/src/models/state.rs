use super::CountRecord;
use crate::error::DBError;
use chrono::{DateTime, Utc};
use elevator_core::StateReading;
use sqlx::SqlitePool;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct StateDao {
    pub(crate) id: i64,
    pub(crate) timestamp: Option<DateTime<Utc>>,
    pub(crate) floor: i64,
    pub(crate) vacant: bool,
    pub(crate) source_address: String,
}

impl StateDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn floor(&self) -> i64 {
        self.floor
    }

    pub fn vacant(&self) -> bool {
        self.vacant
    }
}

impl From<StateDao> for StateReading {
    fn from(val: StateDao) -> Self {
        StateReading {
            timestamp: val.timestamp,
            floor: val.floor,
            vacant: val.vacant,
            source_address: val.source_address,
        }
    }
}

pub async fn insert(
    conn: &SqlitePool,
    floor: i64,
    vacant: bool,
    source_address: &str,
    timestamp: DateTime<Utc>,
) -> Result<StateDao, DBError> {
    // RETURNING rows are drained so the insert is committed on return
    let mut rows = sql_stmnt!(
        StateDao,
        r#"INSERT INTO elevator_state (timestamp, floor, vacant, source_address)
            VALUES (?, ?, ?, ?) RETURNING *"#,
        timestamp,
        floor,
        vacant,
        source_address
    )
    .fetch_all(conn)
    .await?;
    Ok(rows.pop().ok_or(sqlx::Error::RowNotFound)?)
}

// READ elevator_state
pub async fn read(conn: &SqlitePool) -> Result<Vec<StateDao>, DBError> {
    Ok(
        sql_stmnt!(StateDao, "SELECT * FROM elevator_state ORDER BY id ASC")
            .fetch_all(conn)
            .await?,
    )
}

pub async fn count(conn: &SqlitePool) -> Result<i64, DBError> {
    let rows = sql_stmnt!(CountRecord, "SELECT count(*) as count FROM elevator_state")
        .fetch_one(conn)
        .await?;
    Ok(rows.count())
}
