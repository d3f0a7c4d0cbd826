//! Batch jobs run from the command line.

use crate::error::JobError;
use crate::store::{FeatureRow, COMBINED_VIEW};
use chrono::{DateTime, TimeZone, Utc};
use elevator_core::model::RandomForestRegressor;
use elevator_core::{timestamp_feature, FEATURE_NAMES, LABEL};
use std::path::Path;

pub mod features;
pub mod prediction;
pub mod training;

/// Entity the training and prediction jobs look at.
pub const TARGET_ENTITY: i64 = 0;

/// Timestamp at `second` of the minute the jobs look at.
pub(crate) fn fixed_timestamp(second: u32) -> Result<DateTime<Utc>, JobError> {
    Utc.with_ymd_and_hms(2024, 7, 21, 20, 9, second)
        .single()
        .ok_or(JobError::Timestamp(second))
}

/// `combined_features:<name>` references for the given feature names.
pub(crate) fn feature_refs<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| format!("{}:{}", COMBINED_VIEW, name))
        .collect()
}

/// Model input columns, the label excluded.
pub fn model_feature_names() -> Vec<&'static str> {
    let mut names = vec!["source_address", "event_timestamp"];
    names.extend(FEATURE_NAMES.iter().copied().filter(|name| *name != LABEL));
    names
}

/// Numeric value of one model input, `None` if the row lacks it.
pub(crate) fn model_input(
    name: &str,
    row: &FeatureRow,
    event_timestamp: DateTime<Utc>,
) -> Option<f64> {
    match name {
        "source_address" => Some(row.entity as f64),
        "event_timestamp" => Some(timestamp_feature(event_timestamp)),
        _ => row.get(name).map(|value| value.as_f64()),
    }
}

pub fn save_model(path: &Path, model: &RandomForestRegressor) -> Result<(), JobError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec(model)?)?;
    Ok(())
}

pub fn load_model(path: &Path) -> Result<RandomForestRegressor, JobError> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

#[cfg(test)]
mod test;
