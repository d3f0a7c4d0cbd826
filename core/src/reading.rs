use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sensor reading as it was loaded from the store.
///
/// The timestamp column is nullable in the store, every other column isn't.
pub trait Reading: Clone {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
    fn set_timestamp(&mut self, timestamp: DateTime<Utc>);
    fn source_address(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandReading {
    pub timestamp: Option<DateTime<Utc>>,
    pub floor: i64,
    pub source_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReading {
    pub timestamp: Option<DateTime<Utc>>,
    pub floor: i64,
    pub vacant: bool,
    pub source_address: String,
}

impl Reading for DemandReading {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }

    fn source_address(&self) -> &str {
        &self.source_address
    }
}

impl Reading for StateReading {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }

    fn source_address(&self) -> &str {
        &self.source_address
    }
}

/// Fills missing timestamps from the previous row, in load order.
///
/// Rows in front of the first known timestamp can't be filled and are
/// discarded. Returns the filled rows and the number of discarded ones.
pub fn forward_fill<T: Reading>(readings: Vec<T>) -> (Vec<T>, usize) {
    let mut last_seen: Option<DateTime<Utc>> = None;
    let mut discarded = 0;
    let mut filled = Vec::with_capacity(readings.len());

    for mut reading in readings {
        match (reading.timestamp(), last_seen) {
            (Some(ts), _) => {
                last_seen = Some(ts);
                filled.push(reading);
            }
            (None, Some(prev)) => {
                reading.set_timestamp(prev);
                filled.push(reading);
            }
            (None, None) => discarded += 1,
        }
    }
    (filled, discarded)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn demand(ts: Option<i64>, floor: i64) -> DemandReading {
        DemandReading {
            timestamp: ts.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
            floor,
            source_address: "10.0.0.1".to_owned(),
        }
    }

    #[test]
    fn test_forward_fill_timestamps() {
        // prepare
        let readings = vec![demand(None, 1), demand(Some(100), 2), demand(None, 3)];

        // execute
        let (filled, discarded) = forward_fill(readings);

        // validate
        assert_eq!(1, discarded);
        assert_eq!(2, filled.len());
        assert_eq!(filled[0].timestamp, filled[1].timestamp);
        assert_eq!(3, filled[1].floor);
    }

    #[test]
    fn test_forward_fill_complete_rows_untouched() {
        let readings = vec![demand(Some(1), 1), demand(Some(2), 2)];
        let (filled, discarded) = forward_fill(readings.clone());

        assert_eq!(0, discarded);
        assert_eq!(readings, filled);
    }
}
