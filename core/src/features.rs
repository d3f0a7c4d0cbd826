use crate::calendar::WorkCalendar;
use crate::error::FeatureError;
use crate::merge::{self, JoinReport, JoinedRow};
use crate::reading::{self, DemandReading, Reading, StateReading};
use crate::resample;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const LABEL: &str = "floor_demand";

/// Feature columns of the combined view, in snapshot order.
pub const FEATURE_NAMES: [&str; 12] = [
    "floor_demand",
    "floor_state",
    "vacant",
    "second",
    "minute",
    "hour",
    "day",
    "day_of_week",
    "month",
    "year",
    "is_working_day",
    "is_holiday",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
}

impl FeatureValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Bool(b) => *b as i64 as f64,
            FeatureValue::Int(i) => *i as f64,
        }
    }
}

/// Numeric representation of a timestamp feature, nanoseconds since epoch.
pub fn timestamp_feature(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 * 1_000.0
}

/// One engineered row of the combined demand/state view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedFeatureRow {
    pub timestamp: DateTime<Utc>,
    pub source_address: i64,
    pub floor_demand: i64,
    pub floor_state: i64,
    pub vacant: bool,
    pub second: i64,
    pub minute: i64,
    pub hour: i64,
    pub day: i64,
    pub day_of_week: i64,
    pub month: i64,
    pub year: i64,
    pub is_working_day: bool,
    pub is_holiday: bool,
}

impl CombinedFeatureRow {
    pub fn derive<C: WorkCalendar>(row: &JoinedRow, entity: i64, calendar: &C, tz: Tz) -> Self {
        let local = row.key.bucket.with_timezone(&tz);
        let date = local.date_naive();
        CombinedFeatureRow {
            timestamp: row.key.bucket,
            source_address: entity,
            floor_demand: row.demand.floor,
            floor_state: row.state.floor,
            vacant: row.state.vacant,
            second: local.second() as i64,
            minute: local.minute() as i64,
            hour: local.hour() as i64,
            day: local.day() as i64,
            day_of_week: local.weekday().num_days_from_monday() as i64,
            month: local.month() as i64,
            year: local.year() as i64,
            is_working_day: calendar.is_working_day(date),
            is_holiday: calendar.is_holiday(date),
        }
    }

    pub fn value(&self, name: &str) -> Option<FeatureValue> {
        let value = match name {
            "floor_demand" => FeatureValue::Int(self.floor_demand),
            "floor_state" => FeatureValue::Int(self.floor_state),
            "vacant" => FeatureValue::Bool(self.vacant),
            "second" => FeatureValue::Int(self.second),
            "minute" => FeatureValue::Int(self.minute),
            "hour" => FeatureValue::Int(self.hour),
            "day" => FeatureValue::Int(self.day),
            "day_of_week" => FeatureValue::Int(self.day_of_week),
            "month" => FeatureValue::Int(self.month),
            "year" => FeatureValue::Int(self.year),
            "is_working_day" => FeatureValue::Bool(self.is_working_day),
            "is_holiday" => FeatureValue::Bool(self.is_holiday),
            _ => return None,
        };
        Some(value)
    }
}

/// Persisted mapping of source addresses to entity codes.
///
/// Assigned codes never change. Addresses seen for the first time get the
/// next free codes in lexicographic order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEncoding {
    codes: BTreeMap<String, i64>,
}

impl EntityEncoding {
    pub fn code(&self, source_address: &str) -> Option<i64> {
        self.codes.get(source_address).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Registers all unknown addresses, returns how many were new.
    pub fn extend<'a, I>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut next = self.codes.values().max().map_or(0, |max| max + 1);
        let mut unknown: Vec<&str> = addresses
            .into_iter()
            .filter(|addr| !self.codes.contains_key(*addr))
            .collect();
        unknown.sort_unstable();
        unknown.dedup();

        for addr in unknown.iter() {
            self.codes.insert((*addr).to_owned(), next);
            next += 1;
        }
        unknown.len()
    }
}

/// Counters of a single pipeline run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineReport {
    pub demand_rows: usize,
    pub state_rows: usize,
    pub demand_incomplete: usize,
    pub state_incomplete: usize,
    pub demand_resampled: usize,
    pub state_resampled: usize,
    pub new_entities: usize,
    pub join: JoinReport,
}

#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub rows: Vec<CombinedFeatureRow>,
    pub report: PipelineReport,
}

/// Turns raw demand and state readings into the combined feature table.
pub struct FeaturePipeline<C> {
    interval: Duration,
    calendar: C,
    timezone: Tz,
}

impl<C: WorkCalendar> FeaturePipeline<C> {
    pub fn new(interval: Duration, calendar: C, timezone: Tz) -> Self {
        FeaturePipeline {
            interval,
            calendar,
            timezone,
        }
    }

    pub fn run(
        &self,
        demand: Vec<DemandReading>,
        state: Vec<StateReading>,
        encoding: &mut EntityEncoding,
    ) -> Result<FeatureTable, FeatureError> {
        let mut report = PipelineReport {
            demand_rows: demand.len(),
            state_rows: state.len(),
            ..Default::default()
        };

        let (demand, demand_incomplete) = reading::forward_fill(demand);
        let (state, state_incomplete) = reading::forward_fill(state);
        report.demand_incomplete = demand_incomplete;
        report.state_incomplete = state_incomplete;
        if demand.is_empty() {
            return Err(FeatureError::EmptyTable("elevator_demand"));
        }
        if state.is_empty() {
            return Err(FeatureError::EmptyTable("elevator_state"));
        }

        let horizon = demand
            .iter()
            .filter_map(Reading::timestamp)
            .chain(state.iter().filter_map(Reading::timestamp))
            .max();
        let demand = resample::resample(&demand, self.interval, horizon)?;
        let state = resample::resample(&state, self.interval, horizon)?;
        report.demand_resampled = demand.len();
        report.state_resampled = state.len();
        debug!(
            demand = report.demand_resampled,
            state = report.state_resampled,
            "Resampled readings"
        );

        let (joined, join) = merge::inner_join(demand, state);
        if join.dropped() > 0 {
            warn!(
                unmatched_demand = join.unmatched_demand.len(),
                unmatched_state = join.unmatched_state.len(),
                "Inner join dropped rows without counterpart"
            );
        }
        report.join = join;

        report.new_entities =
            encoding.extend(joined.iter().map(|row| row.key.source_address.as_str()));
        let rows = joined
            .iter()
            .map(|row| {
                let entity = encoding
                    .code(&row.key.source_address)
                    .ok_or_else(|| FeatureError::UnknownEntity(row.key.source_address.clone()))?;
                Ok(CombinedFeatureRow::derive(
                    row,
                    entity,
                    &self.calendar,
                    self.timezone,
                ))
            })
            .collect::<Result<Vec<_>, FeatureError>>()?;

        info!(rows = rows.len(), "Derived combined features");
        Ok(FeatureTable { rows, report })
    }
}
