use crate::reading::{DemandReading, Reading, StateReading};
use crate::resample::Resampled;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Join key of a resampled row: its bucket and the reporting address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeKey {
    pub bucket: DateTime<Utc>,
    pub source_address: String,
}

impl MergeKey {
    pub fn of<T: Reading>(row: &Resampled<T>) -> Self {
        MergeKey {
            bucket: row.bucket,
            source_address: row.reading.source_address().to_owned(),
        }
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.bucket.format("%Y-%m-%d %H:%M:%S%:z"),
            self.source_address
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub key: MergeKey,
    pub demand: DemandReading,
    pub state: StateReading,
}

/// What the inner join kept and what it threw away.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JoinReport {
    pub matched: usize,
    pub unmatched_demand: Vec<MergeKey>,
    pub unmatched_state: Vec<MergeKey>,
}

impl JoinReport {
    pub fn dropped(&self) -> usize {
        self.unmatched_demand.len() + self.unmatched_state.len()
    }
}

/// Inner join of both resampled series on their `MergeKey`.
///
/// Keys are unique per side as long as the input comes from
/// `resample::resample`. Rows without a counterpart are dropped and listed
/// in the report. The joined rows are ordered by key.
pub fn inner_join(
    demand: Vec<Resampled<DemandReading>>,
    state: Vec<Resampled<StateReading>>,
) -> (Vec<JoinedRow>, JoinReport) {
    let mut state_by_key: HashMap<MergeKey, StateReading> = state
        .into_iter()
        .map(|row| (MergeKey::of(&row), row.reading))
        .collect();

    let mut report = JoinReport::default();
    let mut joined = BTreeMap::new();
    for row in demand {
        let key = MergeKey::of(&row);
        match state_by_key.remove(&key) {
            Some(state) => {
                joined.insert(
                    key.clone(),
                    JoinedRow {
                        key,
                        demand: row.reading,
                        state,
                    },
                );
            }
            None => report.unmatched_demand.push(key),
        }
    }

    report.matched = joined.len();
    report.unmatched_state = state_by_key.into_keys().collect();
    report.unmatched_state.sort();
    (joined.into_values().collect(), report)
}
