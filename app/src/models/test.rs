use chrono::{Duration, Utc};

use super::demand;
use super::state;
use super::*;

#[tokio::test]
async fn test_db_connection() {
    let (_dir, conn) = temp_db().await;
    check_schema(&conn).await.unwrap();
}

#[tokio::test]
async fn test_reconnect_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("elevator.db").display());

    let conn = establish_db_connection(&url).await.unwrap();
    demand::insert(&conn, 3, "10.0.0.1", Utc::now()).await.unwrap();
    conn.close().await;

    let conn = establish_db_connection(&url).await.unwrap();
    assert_eq!(1, demand::count(&conn).await.unwrap());
}

#[tokio::test]
async fn crud_demand() {
    let (_dir, conn) = temp_db().await;
    let now = Utc::now();

    // create
    let dao = demand::insert(&conn, 5, "10.0.0.7", now).await.unwrap();
    assert_eq!(5, dao.floor());
    assert_eq!("10.0.0.7", dao.source_address());

    // duplicates are accepted
    demand::insert(&conn, 5, "10.0.0.7", now).await.unwrap();

    // read
    let rows = demand::read(&conn).await.unwrap();
    assert_eq!(2, rows.len());
    assert!(rows[0].id() < rows[1].id());
    let stored = rows[0].timestamp().unwrap();
    assert!((stored - now).abs() < Duration::milliseconds(1));
    assert_eq!(2, demand::count(&conn).await.unwrap());
}

#[tokio::test]
async fn crud_state() {
    let (_dir, conn) = temp_db().await;

    // create
    let dao = state::insert(&conn, 2, true, "10.0.0.7", Utc::now())
        .await
        .unwrap();
    assert_eq!(2, dao.floor());
    assert!(dao.vacant());

    // read
    let rows = state::read(&conn).await.unwrap();
    assert_eq!(1, rows.len());
    assert_eq!(dao.id(), rows[0].id());
    assert_eq!(1, state::count(&conn).await.unwrap());
}

#[tokio::test]
async fn test_null_timestamps_load_as_missing() {
    let (_dir, conn) = temp_db().await;
    sqlx::query("INSERT INTO elevator_demand (floor, source_address) VALUES (4, 'a')")
        .execute(&conn)
        .await
        .unwrap();

    let rows = demand::read(&conn).await.unwrap();
    let reading: elevator_core::DemandReading = rows[0].clone().into();
    assert_eq!(None, reading.timestamp);
    assert_eq!(4, reading.floor);
}

#[tokio::test]
async fn test_insert_visible_to_other_connections() {
    // prepare
    let (_dir, conn) = temp_db().await;
    let mut reader = conn.acquire().await.unwrap();

    for expected in 1..=50_i64 {
        // execute
        demand::insert(&conn, expected, "10.0.0.7", Utc::now())
            .await
            .unwrap();
        state::insert(&conn, expected, expected % 2 == 0, "10.0.0.7", Utc::now())
            .await
            .unwrap();

        // validate
        let demands: i64 = sqlx::query_scalar("SELECT count(*) FROM elevator_demand")
            .fetch_one(&mut *reader)
            .await
            .unwrap();
        let states: i64 = sqlx::query_scalar("SELECT count(*) FROM elevator_state")
            .fetch_one(&mut *reader)
            .await
            .unwrap();
        assert_eq!((expected, expected), (demands, states));
    }
}
