//! Parquet snapshot of the combined feature table.
//!
//! One file holds the full table: `timestamp` (UTC, microseconds),
//! `source_address` (entity code) and the feature columns in
//! `FEATURE_NAMES` order.

use crate::error::StoreError;
use arrow::array::{Array, ArrayRef, BooleanArray, Int64Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{TimeZone, Utc};
use elevator_core::{CombinedFeatureRow, FeatureValue, FEATURE_NAMES};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info_span;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const ENTITY_COLUMN: &str = "source_address";

pub fn is_bool_feature(name: &str) -> bool {
    matches!(name, "vacant" | "is_working_day" | "is_holiday")
}

pub fn snapshot_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new(ENTITY_COLUMN, DataType::Int64, false),
    ];
    for name in FEATURE_NAMES {
        let dtype = if is_bool_feature(name) {
            DataType::Boolean
        } else {
            DataType::Int64
        };
        fields.push(Field::new(name, dtype, false));
    }
    Arc::new(Schema::new(fields))
}

fn feature_column(rows: &[CombinedFeatureRow], name: &str) -> ArrayRef {
    if is_bool_feature(name) {
        Arc::new(
            rows.iter()
                .map(|row| match row.value(name) {
                    Some(FeatureValue::Bool(b)) => Some(b),
                    _ => None,
                })
                .collect::<BooleanArray>(),
        )
    } else {
        Arc::new(
            rows.iter()
                .map(|row| match row.value(name) {
                    Some(FeatureValue::Int(i)) => Some(i),
                    _ => None,
                })
                .collect::<Int64Array>(),
        )
    }
}

/// Writes `rows` to `path`, replacing an existing snapshot.
pub fn write_snapshot(path: &Path, rows: &[CombinedFeatureRow]) -> Result<(), StoreError> {
    let span = info_span!("snapshot.write", rows = rows.len(), path = %path.display());
    let _enter = span.enter();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let schema = snapshot_schema();
    let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp.timestamp_micros()).collect();
    let entities: Vec<i64> = rows.iter().map(|r| r.source_address).collect();
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        Arc::new(Int64Array::from(entities)),
    ];
    for name in FEATURE_NAMES {
        columns.push(feature_column(rows, name));
    }
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<T>())
        .ok_or_else(|| StoreError::Column(name.to_owned()))
}

/// Reads a snapshot written by `write_snapshot`.
pub fn read_snapshot(path: &Path) -> Result<Vec<CombinedFeatureRow>, StoreError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        let timestamp = column::<TimestampMicrosecondArray>(&batch, TIMESTAMP_COLUMN)?;
        let entity = column::<Int64Array>(&batch, ENTITY_COLUMN)?;
        let floor_demand = column::<Int64Array>(&batch, "floor_demand")?;
        let floor_state = column::<Int64Array>(&batch, "floor_state")?;
        let vacant = column::<BooleanArray>(&batch, "vacant")?;
        let second = column::<Int64Array>(&batch, "second")?;
        let minute = column::<Int64Array>(&batch, "minute")?;
        let hour = column::<Int64Array>(&batch, "hour")?;
        let day = column::<Int64Array>(&batch, "day")?;
        let day_of_week = column::<Int64Array>(&batch, "day_of_week")?;
        let month = column::<Int64Array>(&batch, "month")?;
        let year = column::<Int64Array>(&batch, "year")?;
        let is_working_day = column::<BooleanArray>(&batch, "is_working_day")?;
        let is_holiday = column::<BooleanArray>(&batch, "is_holiday")?;

        for i in 0..batch.num_rows() {
            let ts = Utc
                .timestamp_micros(timestamp.value(i))
                .single()
                .ok_or_else(|| StoreError::Column(TIMESTAMP_COLUMN.to_owned()))?;
            rows.push(CombinedFeatureRow {
                timestamp: ts,
                source_address: entity.value(i),
                floor_demand: floor_demand.value(i),
                floor_state: floor_state.value(i),
                vacant: vacant.value(i),
                second: second.value(i),
                minute: minute.value(i),
                hour: hour.value(i),
                day: day.value(i),
                day_of_week: day_of_week.value(i),
                month: month.value(i),
                year: year.value(i),
                is_working_day: is_working_day.value(i),
                is_holiday: is_holiday.value(i),
            });
        }
    }
    Ok(rows)
}
