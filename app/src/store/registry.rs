use crate::error::StoreError;
use chrono::{DateTime, Utc};
use elevator_core::EntityEncoding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Int64,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: ValueType,
}

impl Field {
    pub fn new(name: &str, dtype: ValueType) -> Self {
        Field {
            name: name.to_owned(),
            dtype,
        }
    }
}

/// A Parquet file holding the offline rows of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSource {
    pub path: String,
    pub event_timestamp_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureView {
    pub name: String,
    pub entities: Vec<String>,
    pub ttl_secs: i64,
    pub schema: Vec<Field>,
    pub online: bool,
    pub source: FileSource,
}

impl FeatureView {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.schema.iter().find(|field| field.name == name)
    }
}

/// Everything the feature store knows besides the data itself.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub entities: Vec<Entity>,
    pub feature_views: Vec<FeatureView>,
    /// Upper bound of the last materialization, per view
    pub materialized_until: BTreeMap<String, DateTime<Utc>>,
    pub entity_encoding: EntityEncoding,
}

impl Registry {
    /// Loads the registry, a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "No registry yet");
            return Ok(Registry::default());
        }
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn apply_entity(&mut self, entity: Entity) {
        match self.entities.iter_mut().find(|e| e.name == entity.name) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
    }

    pub fn apply_view(&mut self, view: FeatureView) {
        match self.feature_views.iter_mut().find(|v| v.name == view.name) {
            Some(existing) => *existing = view,
            None => self.feature_views.push(view),
        }
    }

    pub fn view(&self, name: &str) -> Result<&FeatureView, StoreError> {
        self.feature_views
            .iter()
            .find(|view| view.name == name)
            .ok_or_else(|| StoreError::UnknownView(name.to_owned()))
    }
}
