use super::{feature_refs, fixed_timestamp, model_feature_names, model_input, save_model, TARGET_ENTITY};
use crate::config::Config;
use crate::error::JobError;
use crate::store::{EntityRow, FeatureStore};
use elevator_core::model::{mean_squared_error, train_test_split, RandomForestRegressor, Regressor};
use elevator_core::{FEATURE_NAMES, LABEL};
use tracing::{debug, info};

const TEST_SIZE: f64 = 0.2;
const SEED: u64 = 42;
const N_ESTIMATORS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub retrieved: usize,
    pub samples: usize,
    pub train: usize,
    pub test: usize,
    pub mse: f64,
}

fn training_entity_rows() -> Result<Vec<EntityRow>, JobError> {
    [30, 40, 50]
        .into_iter()
        .map(|second| {
            Ok(EntityRow {
                entity: TARGET_ENTITY,
                event_timestamp: fixed_timestamp(second)?,
            })
        })
        .collect()
}

/// Fits the demand model on point-in-time features and persists it.
#[tracing::instrument(skip(config))]
pub async fn run(config: &Config) -> Result<TrainingReport, JobError> {
    let store = FeatureStore::open(config).await?;
    let entity_rows = training_entity_rows()?;
    let refs = feature_refs(FEATURE_NAMES);
    let refs: Vec<&str> = refs.iter().map(String::as_str).collect();
    let rows = store.get_historical_features(&entity_rows, &refs)?;

    let names = model_feature_names();
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    for (row, entity_row) in rows.iter().zip(entity_rows.iter()) {
        let label = row.get(LABEL).map(|value| value.as_f64());
        let sample: Option<Vec<f64>> = names
            .iter()
            .map(|name| model_input(name, row, entity_row.event_timestamp))
            .collect();
        match (sample, label) {
            (Some(sample), Some(label)) => {
                x.push(sample);
                y.push(label);
            }
            _ => debug!(timestamp = %entity_row.event_timestamp, "Dropped incomplete row"),
        }
    }
    info!(retrieved = rows.len(), samples = x.len(), "Retrieved training data");

    let (train, test) = train_test_split(x.len(), TEST_SIZE, SEED)?;
    let x_train: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();
    let x_test: Vec<Vec<f64>> = test.iter().map(|&i| x[i].clone()).collect();
    let y_test: Vec<f64> = test.iter().map(|&i| y[i]).collect();

    let mut model = RandomForestRegressor::new(N_ESTIMATORS, SEED).with_feature_names(names);
    model.fit(&x_train, &y_train)?;
    let mse = mean_squared_error(&y_test, &model.predict(&x_test)?)?;
    info!(mse, "Evaluated model");

    save_model(config.model_path(), &model)?;
    info!(path = %config.model_path().display(), "Model training completed");

    Ok(TrainingReport {
        retrieved: rows.len(),
        samples: x.len(),
        train: train.len(),
        test: test.len(),
        mse,
    })
}
