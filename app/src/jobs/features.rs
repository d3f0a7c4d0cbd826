use crate::config::Config;
use crate::error::JobError;
use crate::models::{self, demand, state};
use crate::store::{self, snapshot, FeatureStore, MaterializeReport};
use chrono::{DateTime, Utc};
use elevator_core::{DemandReading, FeaturePipeline, PipelineReport, StateReading, UnitedStates};
use tracing::info;

#[derive(Debug, Clone)]
pub struct FeatureJobReport {
    pub pipeline: PipelineReport,
    pub rows: usize,
    pub materialized: MaterializeReport,
}

/// Rebuilds the combined feature snapshot from both reading tables and
/// materializes rows up to `materialize_until` into the online store.
#[tracing::instrument(skip(config))]
pub async fn run(
    config: &Config,
    materialize_until: DateTime<Utc>,
) -> Result<FeatureJobReport, JobError> {
    let conn = models::establish_db_connection(config.database_url()).await?;
    let demand: Vec<DemandReading> = demand::read(&conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let state: Vec<StateReading> = state::read(&conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    conn.close().await;
    info!(demand = demand.len(), state = state.len(), "Loaded readings");

    let mut store = FeatureStore::open(config).await?;
    let pipeline = FeaturePipeline::new(
        config.resample_interval(),
        UnitedStates,
        config.calendar_tz(),
    );
    let table = pipeline.run(demand, state, store.entity_encoding_mut())?;

    snapshot::write_snapshot(config.snapshot_path(), &table.rows)?;
    store.apply(
        store::source_entity(),
        store::combined_features_view(config),
    )?;
    let materialized = store.materialize_incremental(materialize_until).await?;

    info!(
        rows = table.rows.len(),
        dropped = table.report.join.dropped(),
        materialized = materialized.rows,
        "Feature engineering completed"
    );
    Ok(FeatureJobReport {
        rows: table.rows.len(),
        pipeline: table.report,
        materialized,
    })
}
