//! Local feature store.
//!
//! Views are declared in a JSON registry, their offline data lives in a
//! Parquet snapshot and the newest values per entity are materialized into a
//! SQLite online store.

use crate::config::Config;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use elevator_core::{CombinedFeatureRow, EntityEncoding, FeatureValue, FEATURE_NAMES};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, instrument};

pub mod online;
pub mod registry;
pub mod snapshot;

pub use online::{OnlineRow, OnlineStore};
pub use registry::{Entity, FeatureView, Field, FileSource, Registry, ValueType};

pub const SOURCE_ENTITY: &str = "source_address";
pub const COMBINED_VIEW: &str = "combined_features";

/// A `"<view>:<feature>"` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRef {
    pub view: String,
    pub feature: String,
}

impl FromStr for FeatureRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((view, feature)) if !view.is_empty() && !feature.is_empty() => Ok(FeatureRef {
                view: view.to_owned(),
                feature: feature.to_owned(),
            }),
            _ => Err(StoreError::FeatureRef(s.to_owned())),
        }
    }
}

/// Entity and point in time to retrieve features for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRow {
    pub entity: i64,
    pub event_timestamp: DateTime<Utc>,
}

/// Retrieved features keyed by feature name, `None` when nothing qualified.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub entity: i64,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub values: BTreeMap<String, Option<FeatureValue>>,
}

impl FeatureRow {
    pub fn get(&self, feature: &str) -> Option<FeatureValue> {
        self.values.get(feature).copied().flatten()
    }

    pub fn is_complete(&self) -> bool {
        self.values.values().all(Option::is_some)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MaterializeReport {
    pub views: usize,
    pub rows: u64,
}

pub fn source_entity() -> Entity {
    Entity {
        name: SOURCE_ENTITY.to_owned(),
        value_type: ValueType::Int64,
    }
}

/// The combined demand/state view backed by the configured snapshot.
pub fn combined_features_view(config: &Config) -> FeatureView {
    let schema = FEATURE_NAMES
        .iter()
        .map(|name| {
            let dtype = if snapshot::is_bool_feature(name) {
                ValueType::Bool
            } else {
                ValueType::Int64
            };
            Field::new(name, dtype)
        })
        .collect();

    FeatureView {
        name: COMBINED_VIEW.to_owned(),
        entities: vec![SOURCE_ENTITY.to_owned()],
        ttl_secs: config.feature_ttl().num_seconds(),
        schema,
        online: true,
        source: FileSource {
            path: config.snapshot_path().display().to_string(),
            event_timestamp_column: snapshot::TIMESTAMP_COLUMN.to_owned(),
        },
    }
}

pub struct FeatureStore {
    registry_path: PathBuf,
    registry: Registry,
    online: OnlineStore,
}

impl FeatureStore {
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let registry = Registry::load(config.registry_path())?;
        let online = OnlineStore::open(config.online_store_url()).await?;
        Ok(FeatureStore {
            registry_path: config.registry_path().to_owned(),
            registry,
            online,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn entity_encoding(&self) -> &EntityEncoding {
        &self.registry.entity_encoding
    }

    pub fn entity_encoding_mut(&mut self) -> &mut EntityEncoding {
        &mut self.registry.entity_encoding
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.registry.save(&self.registry_path)
    }

    /// Registers or replaces the entity and the view, then persists the registry.
    pub fn apply(&mut self, entity: Entity, view: FeatureView) -> Result<(), StoreError> {
        self.registry.apply_entity(entity);
        self.registry.apply_view(view);
        self.save()
    }

    fn resolve(&self, feature_refs: &[&str]) -> Result<Vec<(&FeatureView, String)>, StoreError> {
        feature_refs
            .iter()
            .map(|raw| {
                let feature_ref: FeatureRef = raw.parse()?;
                let view = self.registry.view(&feature_ref.view)?;
                if view.field(&feature_ref.feature).is_none() {
                    return Err(StoreError::UnknownFeature(
                        feature_ref.view,
                        feature_ref.feature,
                    ));
                }
                Ok((view, feature_ref.feature))
            })
            .collect()
    }

    /// Point-in-time lookup against the offline snapshots.
    ///
    /// Per entity row the newest snapshot row of that entity inside
    /// `[event_timestamp - ttl, event_timestamp]` is used. The output keeps the
    /// order of `entity_rows`.
    #[instrument(skip_all, fields(entity_rows = entity_rows.len()))]
    pub fn get_historical_features(
        &self,
        entity_rows: &[EntityRow],
        feature_refs: &[&str],
    ) -> Result<Vec<FeatureRow>, StoreError> {
        let resolved = self.resolve(feature_refs)?;

        let mut snapshots: HashMap<&str, Vec<CombinedFeatureRow>> = HashMap::new();
        for (view, _) in resolved.iter() {
            if !snapshots.contains_key(view.name.as_str()) {
                let rows = snapshot::read_snapshot(Path::new(&view.source.path))?;
                snapshots.insert(view.name.as_str(), rows);
            }
        }

        let rows = entity_rows
            .iter()
            .map(|entity_row| {
                let values = resolved
                    .iter()
                    .map(|(view, feature)| {
                        let value = snapshots
                            .get(view.name.as_str())
                            .and_then(|rows| point_in_time(rows, entity_row, view.ttl()))
                            .and_then(|row| row.value(feature));
                        (feature.clone(), value)
                    })
                    .collect();
                FeatureRow {
                    entity: entity_row.entity,
                    event_timestamp: Some(entity_row.event_timestamp),
                    values,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Loads the newest rows since the last run into the online store.
    ///
    /// The window is `(watermark, end]`, or `(end - ttl, end]` for a view
    /// never materialized before.
    #[instrument(skip(self))]
    pub async fn materialize_incremental(
        &mut self,
        end: DateTime<Utc>,
    ) -> Result<MaterializeReport, StoreError> {
        let mut report = MaterializeReport::default();
        let views: Vec<FeatureView> = self
            .registry
            .feature_views
            .iter()
            .filter(|view| view.online)
            .cloned()
            .collect();

        for view in views {
            let start = self
                .registry
                .materialized_until
                .get(&view.name)
                .copied()
                .unwrap_or(end - view.ttl());

            let mut latest: BTreeMap<i64, CombinedFeatureRow> = BTreeMap::new();
            for row in snapshot::read_snapshot(Path::new(&view.source.path))? {
                if row.timestamp <= start || row.timestamp > end {
                    continue;
                }
                let newer = latest
                    .get(&row.source_address)
                    .map_or(true, |current| row.timestamp > current.timestamp);
                if newer {
                    latest.insert(row.source_address, row);
                }
            }

            let rows: Vec<OnlineRow> = latest
                .into_values()
                .map(|row| OnlineRow {
                    entity_key: row.source_address,
                    event_timestamp: row.timestamp,
                    features: view
                        .schema
                        .iter()
                        .filter_map(|field| Some((field.name.clone(), row.value(&field.name)?)))
                        .collect(),
                })
                .collect();

            let written = self.online.write(&view.name, &rows).await?;
            info!(view = %view.name, %start, %end, written, "Materialized view");
            self.registry
                .materialized_until
                .insert(view.name.clone(), end);
            report.views += 1;
            report.rows += written;
        }

        self.save()?;
        Ok(report)
    }

    /// Newest materialized values, one row per entity key.
    pub async fn get_online_features(
        &self,
        feature_refs: &[&str],
        entity_keys: &[i64],
    ) -> Result<Vec<FeatureRow>, StoreError> {
        let resolved = self.resolve(feature_refs)?;
        let by_view = features_by_view(&resolved);

        let mut rows = Vec::with_capacity(entity_keys.len());
        for &entity in entity_keys {
            let mut event_timestamp = None;
            let mut values = BTreeMap::new();
            for (view, features) in by_view.iter() {
                let stored = self.online.read(view, entity).await?;
                if let Some(stored) = stored.as_ref() {
                    event_timestamp = event_timestamp.max(Some(stored.event_timestamp));
                }
                for feature in features {
                    let value = stored
                        .as_ref()
                        .and_then(|row| row.features.get(*feature).copied());
                    values.insert((*feature).to_owned(), value);
                }
            }
            rows.push(FeatureRow {
                entity,
                event_timestamp,
                values,
            });
        }
        Ok(rows)
    }
}

/// Requested features per view, each view is read once per entity.
fn features_by_view<'a>(resolved: &'a [(&FeatureView, String)]) -> BTreeMap<&'a str, Vec<&'a str>> {
    let mut by_view: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (view, feature) in resolved {
        let features = by_view.entry(view.name.as_str()).or_default();
        if !features.contains(&feature.as_str()) {
            features.push(feature.as_str());
        }
    }
    by_view
}

fn point_in_time<'a>(
    rows: &'a [CombinedFeatureRow],
    entity_row: &EntityRow,
    ttl: chrono::Duration,
) -> Option<&'a CombinedFeatureRow> {
    let earliest = entity_row.event_timestamp - ttl;
    rows.iter()
        .filter(|row| row.source_address == entity_row.entity)
        .filter(|row| row.timestamp >= earliest && row.timestamp <= entity_row.event_timestamp)
        .max_by_key(|row| row.timestamp)
}
