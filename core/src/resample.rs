use crate::error::FeatureError;
use crate::reading::Reading;
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::BTreeMap;

/// A reading placed on the resample grid.
///
/// `bucket` is the start of the interval the reading represents, the reading
/// keeps its original timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled<T> {
    pub bucket: DateTime<Utc>,
    pub reading: T,
}

/// Truncates `timestamp` onto an epoch aligned grid of `interval`.
pub fn align(timestamp: DateTime<Utc>, interval: Duration) -> Result<DateTime<Utc>, FeatureError> {
    timestamp
        .duration_trunc(interval)
        .map_err(|_| FeatureError::Alignment(timestamp))
}

/// Resamples every source address of `readings` onto a fixed grid.
///
/// Each bucket `[t, t + interval)` holds the last reading at or before its
/// end. A series starts at the bucket of its first reading and is carried
/// forward until `until` (or its own last bucket, whichever is later).
/// Readings without a timestamp are ignored, see `reading::forward_fill`.
///
/// The result is ordered by bucket, then source address.
pub fn resample<T: Reading>(
    readings: &[T],
    interval: Duration,
    until: Option<DateTime<Utc>>,
) -> Result<Vec<Resampled<T>>, FeatureError> {
    if interval <= Duration::zero() {
        return Err(FeatureError::InvalidInterval(interval.to_string()));
    }

    let mut by_address: BTreeMap<&str, Vec<(DateTime<Utc>, &T)>> = BTreeMap::new();
    for reading in readings {
        if let Some(ts) = reading.timestamp() {
            by_address
                .entry(reading.source_address())
                .or_default()
                .push((ts, reading));
        }
    }
    let horizon = until.map(|ts| align(ts, interval)).transpose()?;

    let mut resampled = Vec::new();
    for (_, mut series) in by_address {
        // stable, equal timestamps keep load order
        series.sort_by_key(|(ts, _)| *ts);
        let first = align(series[0].0, interval)?;
        let last = align(series[series.len() - 1].0, interval)?;
        let end = horizon.map_or(last, |h| h.max(last));

        let mut cursor = 0;
        let mut current: Option<&T> = None;
        let mut bucket = first;
        while bucket <= end {
            let bucket_end = bucket + interval;
            while cursor < series.len() && series[cursor].0 < bucket_end {
                current = Some(series[cursor].1);
                cursor += 1;
            }
            if let Some(reading) = current {
                resampled.push(Resampled {
                    bucket,
                    reading: reading.clone(),
                });
            }
            bucket = bucket_end;
        }
    }

    resampled.sort_by(|a, b| {
        a.bucket
            .cmp(&b.bucket)
            .then_with(|| a.reading.source_address().cmp(b.reading.source_address()))
    });
    Ok(resampled)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reading::{DemandReading, StateReading};
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 21, h, m, s).unwrap() + Duration::milliseconds(ms as i64)
    }

    fn demand(ts: DateTime<Utc>, floor: i64, addr: &str) -> DemandReading {
        DemandReading {
            timestamp: Some(ts),
            floor,
            source_address: addr.to_owned(),
        }
    }

    #[test]
    fn test_align_to_epoch_grid() {
        let aligned = align(at(20, 9, 33, 750), Duration::seconds(10)).unwrap();
        assert_eq!(at(20, 9, 30, 0), aligned);
    }

    #[test]
    fn test_last_reading_in_bucket_wins() {
        // prepare
        let readings = vec![
            demand(at(20, 9, 31, 0), 5, "a"),
            demand(at(20, 9, 38, 0), 6, "a"),
        ];

        // execute
        let res = resample(&readings, Duration::seconds(10), None).unwrap();

        // validate
        assert_eq!(1, res.len());
        assert_eq!(at(20, 9, 30, 0), res[0].bucket);
        assert_eq!(6, res[0].reading.floor);
    }

    #[test]
    fn test_resample_has_no_gaps() {
        let interval = Duration::seconds(10);
        let fixtures = vec![
            vec![demand(at(20, 9, 31, 0), 5, "a")],
            vec![
                demand(at(20, 9, 31, 0), 5, "a"),
                demand(at(20, 10, 52, 400), 6, "a"),
                demand(at(20, 9, 59, 999), 7, "a"),
            ],
            vec![
                demand(at(20, 0, 0, 0), 1, "a"),
                demand(at(20, 3, 17, 0), 2, "b"),
                demand(at(20, 1, 5, 0), 3, "b"),
            ],
        ];

        for readings in fixtures {
            let res = resample(&readings, interval, None).unwrap();
            assert!(!res.is_empty());
            for addr in ["a", "b"] {
                let buckets: Vec<_> = res
                    .iter()
                    .filter(|r| r.reading.source_address == addr)
                    .map(|r| r.bucket)
                    .collect();
                for pair in buckets.windows(2) {
                    assert_eq!(interval, pair[1] - pair[0]);
                }
            }
        }
    }

    #[test]
    fn test_forward_fill_between_readings() {
        let readings = vec![
            demand(at(20, 9, 31, 0), 5, "a"),
            demand(at(20, 10, 2, 0), 8, "a"),
        ];

        let res = resample(&readings, Duration::seconds(10), None).unwrap();
        let floors: Vec<i64> = res.iter().map(|r| r.reading.floor).collect();

        assert_eq!(vec![5, 5, 5, 8], floors);
    }

    #[test]
    fn test_carry_until_horizon() {
        let readings = vec![StateReading {
            timestamp: Some(at(20, 9, 31, 0)),
            floor: 2,
            vacant: true,
            source_address: "a".to_owned(),
        }];

        let res = resample(&readings, Duration::seconds(10), Some(at(20, 10, 5, 0))).unwrap();

        assert_eq!(4, res.len());
        assert_eq!(at(20, 10, 0, 0), res[3].bucket);
        assert!(res.iter().all(|r| r.reading.vacant));
    }

    #[test]
    fn test_ordered_by_bucket_then_address() {
        let readings = vec![
            demand(at(20, 9, 41, 0), 1, "b"),
            demand(at(20, 9, 31, 0), 2, "b"),
            demand(at(20, 9, 32, 0), 3, "a"),
        ];

        let res = resample(&readings, Duration::seconds(10), None).unwrap();
        let order: Vec<_> = res
            .iter()
            .map(|r| (r.bucket, r.reading.source_address.as_str()))
            .collect();

        assert_eq!(
            vec![
                (at(20, 9, 30, 0), "a"),
                (at(20, 9, 30, 0), "b"),
                (at(20, 9, 40, 0), "b"),
            ],
            order
        );
    }

    #[test]
    fn test_empty_input() {
        let readings: Vec<DemandReading> = vec![];
        assert!(resample(&readings, Duration::seconds(10), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_interval() {
        let readings = vec![demand(at(20, 9, 31, 0), 5, "a")];
        assert!(resample(&readings, Duration::zero(), None).is_err());
    }
}
