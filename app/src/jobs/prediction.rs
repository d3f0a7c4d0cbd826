use super::{feature_refs, fixed_timestamp, load_model, model_input, TARGET_ENTITY};
use crate::config::Config;
use crate::error::JobError;
use crate::store::FeatureStore;
use elevator_core::model::Regressor;
use elevator_core::{FEATURE_NAMES, LABEL};
use tracing::{debug, info};

/// Predicts the demanded floor of the target entity from online features.
///
/// Missing features are filled with zero.
#[tracing::instrument(skip(config))]
pub async fn run(config: &Config) -> Result<Vec<f64>, JobError> {
    let model = load_model(config.model_path())?;
    let store = FeatureStore::open(config).await?;
    let event_timestamp = fixed_timestamp(30)?;

    let refs = feature_refs(FEATURE_NAMES.iter().copied().filter(|name| *name != LABEL));
    let refs: Vec<&str> = refs.iter().map(String::as_str).collect();
    let rows = store.get_online_features(&refs, &[TARGET_ENTITY]).await?;

    let mut predictions = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        if !row.is_complete() {
            debug!(entity = row.entity, "Filling missing online features with 0");
        }
        let sample: Vec<f64> = model
            .feature_names()
            .iter()
            .map(|name| model_input(name, row, event_timestamp).unwrap_or(0.0))
            .collect();
        predictions.push(model.predict_one(&sample)?);
    }
    info!(?predictions, "Prediction completed");
    Ok(predictions)
}
