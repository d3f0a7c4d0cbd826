use crate::error::DBError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

macro_rules! sql_stmnt {
    ($ret:ident, $stmt:expr) => {
        sqlx::query_as::<_ ,$ret>($stmt)
    };
    ($stmt:expr) => {
        sqlx::query($stmt)
    };
    ($ret:ident, $stmt:expr, $($bind:expr),*) => {
        sqlx::query_as::<_ ,$ret>($stmt)$(.bind($bind))*
    };
    ($stmt:expr, $($bind:expr),*) => {
        sqlx::query($stmt)$(.bind($bind))*
    };
}

pub(crate) use sql_stmnt;

/// Opens a pool on a SQLite file, creating the file and its directory.
pub(crate) async fn open_sqlite(database_url: &str) -> Result<SqlitePool, DBError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let db_path = options.clone().get_filename();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqlitePoolOptions::new().connect_with(options).await?)
}

/// Connects to the reading store and creates missing tables.
pub async fn establish_db_connection(database_url: &str) -> Result<SqlitePool, DBError> {
    let pool = open_sqlite(database_url).await?;
    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}

pub async fn check_schema(conn: &SqlitePool) -> Result<(), DBError> {
    sql_stmnt!("SELECT count(*) as count FROM elevator_demand")
        .fetch_one(conn)
        .await?;
    sql_stmnt!("SELECT count(*) as count FROM elevator_state")
        .fetch_one(conn)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
pub(crate) struct CountRecord {
    pub count: Option<i64>,
}

impl CountRecord {
    pub fn count(self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Fresh migrated database below a temporary directory.
#[cfg(test)]
pub(crate) async fn temp_db() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("db/elevator.db").display());
    let conn = establish_db_connection(&url).await.unwrap();
    (dir, conn)
}

pub mod demand;
pub mod state;

#[cfg(test)]
mod test;
