use super::*;
use crate::config::Config;
use crate::models::{self, demand, state};
use crate::rest::{self, dto};
use crate::store::{self as feature_store, snapshot, FeatureStore};
use chrono::Duration;
use elevator_core::error::ModelError;
use elevator_core::CombinedFeatureRow;
use tempfile::TempDir;

fn snapshot_row(second: u32, floor_demand: i64, floor_state: i64) -> CombinedFeatureRow {
    CombinedFeatureRow {
        timestamp: fixed_timestamp(second).unwrap(),
        source_address: TARGET_ENTITY,
        floor_demand,
        floor_state,
        vacant: floor_state % 2 == 0,
        second: second as i64,
        minute: 9,
        hour: 20,
        day: 21,
        day_of_week: 6,
        month: 7,
        year: 2024,
        is_working_day: false,
        is_holiday: false,
    }
}

/// Registers the combined view over the given snapshot rows.
async fn seeded_store(rows: &[CombinedFeatureRow]) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    snapshot::write_snapshot(config.snapshot_path(), rows).unwrap();
    let mut store = FeatureStore::open(&config).await.unwrap();
    store
        .apply(
            feature_store::source_entity(),
            feature_store::combined_features_view(&config),
        )
        .unwrap();
    (dir, config)
}

#[test]
fn test_model_feature_names() {
    let names = model_feature_names();
    assert_eq!(13, names.len());
    assert_eq!(["source_address", "event_timestamp", "floor_state"], names[..3]);
    assert!(!names.contains(&LABEL));
}

#[test]
fn test_fixed_timestamp() {
    let ts = fixed_timestamp(30).unwrap();
    assert_eq!("2024-07-21T20:09:30+00:00", ts.to_rfc3339());
    assert!(matches!(fixed_timestamp(60), Err(JobError::Timestamp(60))));
}

#[tokio::test]
async fn test_ingest_then_engineer_features() {
    // prepare
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    let pool = models::establish_db_connection(config.database_url())
        .await
        .unwrap();
    let routes = rest::routes(&pool);
    let client = "10.0.0.7:41000".parse().unwrap();

    let res = warp::test::request()
        .path("/demand")
        .method("POST")
        .remote_addr(client)
        .json(&dto::DemandCreateDto { floor: 5 })
        .reply(&routes)
        .await;
    assert_eq!(200, res.status());
    let res = warp::test::request()
        .path("/state")
        .method("POST")
        .remote_addr(client)
        .json(&dto::StateCreateDto {
            floor: 2,
            vacant: true,
        })
        .reply(&routes)
        .await;
    assert_eq!(200, res.status());
    pool.close().await;

    // execute
    let report = features::run(&config, Utc::now()).await.unwrap();

    // validate
    assert_eq!(1, report.rows);
    assert_eq!(1, report.materialized.rows);
    let rows = snapshot::read_snapshot(config.snapshot_path()).unwrap();
    assert_eq!(1, rows.len());
    let row = &rows[0];
    assert_eq!((5, 2, true), (row.floor_demand, row.floor_state, row.vacant));
    assert_eq!(0, row.source_address);
    assert_eq!(0, row.timestamp.timestamp() % 10);

    let store = FeatureStore::open(&config).await.unwrap();
    assert_eq!(Some(0), store.entity_encoding().code("10.0.0.7"));
    let online = store
        .get_online_features(&["combined_features:floor_state"], &[0])
        .await
        .unwrap();
    assert_eq!(Some(elevator_core::FeatureValue::Int(2)), online[0].get("floor_state"));
}

#[tokio::test]
async fn test_feature_job_keeps_entity_codes() {
    // prepare
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    let pool = models::establish_db_connection(config.database_url())
        .await
        .unwrap();
    let now = Utc::now();
    demand::insert(&pool, 3, "10.0.0.9", now).await.unwrap();
    state::insert(&pool, 1, false, "10.0.0.9", now).await.unwrap();
    features::run(&config, now).await.unwrap();

    // execute
    demand::insert(&pool, 4, "10.0.0.1", now).await.unwrap();
    state::insert(&pool, 2, true, "10.0.0.1", now).await.unwrap();
    let report = features::run(&config, now).await.unwrap();

    // validate
    assert_eq!(1, report.pipeline.new_entities);
    let store = FeatureStore::open(&config).await.unwrap();
    assert_eq!(Some(0), store.entity_encoding().code("10.0.0.9"));
    assert_eq!(Some(1), store.entity_encoding().code("10.0.0.1"));
}

#[tokio::test]
async fn test_feature_job_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());

    let res = features::run(&config, Utc::now()).await;

    assert!(matches!(
        res,
        Err(JobError::Feature(elevator_core::error::FeatureError::EmptyTable(_)))
    ));
    assert!(!config.snapshot_path().exists());
}

#[tokio::test]
async fn test_training_needs_two_samples() {
    // prepare, only the last training timestamp sees a row
    let (_dir, config) = seeded_store(&[snapshot_row(50, 5, 2)]).await;

    // execute
    let res = training::run(&config).await;

    // validate
    assert!(matches!(
        res,
        Err(JobError::Model(ModelError::InsufficientSamples { .. }))
    ));
    assert!(!config.model_path().exists());
}

#[tokio::test]
async fn test_train_then_predict() {
    // prepare
    let rows = vec![
        snapshot_row(30, 5, 2),
        snapshot_row(40, 6, 3),
        snapshot_row(50, 7, 4),
    ];
    let (_dir, config) = seeded_store(&rows).await;

    // execute
    let report = training::run(&config).await.unwrap();

    // validate
    assert_eq!(3, report.retrieved);
    assert_eq!(3, report.samples);
    assert_eq!((2, 1), (report.train, report.test));
    assert!(report.mse >= 0.0);
    let model = load_model(config.model_path()).unwrap();
    assert_eq!(model_feature_names(), model.feature_names());

    // nothing materialized yet, all inputs fall back to 0
    let predictions = prediction::run(&config).await.unwrap();
    assert_eq!(1, predictions.len());

    let mut store = FeatureStore::open(&config).await.unwrap();
    store
        .materialize_incremental(fixed_timestamp(50).unwrap() + Duration::seconds(10))
        .await
        .unwrap();
    let predictions = prediction::run(&config).await.unwrap();
    assert_eq!(1, predictions.len());
    assert!((5.0..=7.0).contains(&predictions[0]));
}

#[tokio::test]
async fn test_prediction_without_model() {
    let (_dir, config) = seeded_store(&[snapshot_row(30, 5, 2)]).await;

    let res = prediction::run(&config).await;

    assert!(matches!(res, Err(JobError::Io(_))));
}
