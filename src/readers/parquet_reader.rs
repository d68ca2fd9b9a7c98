use crate::error::{ProcessingError, Result};
use crate::models::{Column, ColumnType, Table, Value};
use crate::utils::constants::DEFAULT_BATCH_SIZE;
use crate::utils::paths::absolute_path;
use crate::utils::temporal::{datetime_from_epoch, time_from_nanos, unix_epoch};
use arrow::array::*;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Duration;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Reads a Parquet file into a table.
pub struct ParquetTableReader {
    batch_size: usize,
}

impl ParquetTableReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn read_table(&self, path: &Path) -> Result<Table> {
        self.read_limited(path, None)
    }

    /// Read at most `limit` rows.
    pub fn read_sample(&self, path: &Path, limit: usize) -> Result<Table> {
        self.read_limited(path, Some(limit))
    }

    fn read_limited(&self, path: &Path, limit: Option<usize>) -> Result<Table> {
        if !path.exists() {
            return Err(ProcessingError::MissingSource {
                path: absolute_path(path),
            });
        }

        let file = File::open(path)?;
        let mut builder =
            ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(self.batch_size);
        if let Some(limit) = limit {
            builder = builder.with_limit(limit);
        }

        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }

        debug!(batches = batches.len(), path = %path.display(), "Read Parquet file");
        batches_to_table(&schema, &batches)
    }
}

impl Default for ParquetTableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert Arrow record batches sharing `schema` into a table.
pub fn batches_to_table(schema: &Schema, batches: &[RecordBatch]) -> Result<Table> {
    let mut columns = Vec::with_capacity(schema.fields().len());

    for (idx, field) in schema.fields().iter().enumerate() {
        let dtype = column_type_for(field.data_type());
        let mut values = Vec::new();
        for batch in batches {
            values.extend(array_values(batch.column(idx), field.name())?);
        }
        columns.push(Column::new(field.name().clone(), dtype, values));
    }

    Table::from_columns(columns)
}

fn column_type_for(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Boolean => ColumnType::Bool,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Int,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Float,
        DataType::Dictionary(_, _) => ColumnType::Category,
        DataType::Date32 | DataType::Date64 => ColumnType::Date,
        DataType::Time32(_) | DataType::Time64(_) => ColumnType::Time,
        DataType::Timestamp(_, _) => ColumnType::Timestamp,
        _ => ColumnType::Text,
    }
}

fn array_values(array: &ArrayRef, name: &str) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        DataType::Boolean => {
            let arr = downcast::<BooleanArray>(array, name)?;
            collect(arr, |i| Value::Bool(arr.value(i)))
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let casted = cast(array, &DataType::Int64)?;
            let arr = downcast::<Int64Array>(&casted, name)?;
            collect(arr, |i| Value::Int(arr.value(i)))
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let casted = cast(array, &DataType::Float64)?;
            let arr = downcast::<Float64Array>(&casted, name)?;
            collect(arr, |i| Value::Float(arr.value(i)))
        }
        DataType::Date32 | DataType::Date64 => {
            let casted = cast(array, &DataType::Date32)?;
            let arr = downcast::<Date32Array>(&casted, name)?;
            let epoch = unix_epoch();
            collect(arr, |i| {
                epoch
                    .checked_add_signed(Duration::days(i64::from(arr.value(i))))
                    .map_or(Value::Null, Value::Date)
            })
        }
        DataType::Timestamp(unit, _) => {
            let nanos_per_unit = nanos_per(unit);
            let raw = timestamp_raw(array, unit, name)?;
            raw.into_iter()
                .map(|v| {
                    v.and_then(|v| {
                        let nanos = i128::from(v) * i128::from(nanos_per_unit);
                        let secs = i64::try_from(nanos.div_euclid(1_000_000_000)).ok()?;
                        let frac = nanos.rem_euclid(1_000_000_000) as u32;
                        datetime_from_epoch(secs, frac)
                    })
                    .map_or(Value::Null, Value::Timestamp)
                })
                .collect()
        }
        DataType::Time32(unit) | DataType::Time64(unit) => {
            let nanos_per_unit = nanos_per(unit);
            let raw = time_raw(array, unit, name)?;
            raw.into_iter()
                .map(|v| {
                    v.and_then(|v| v.checked_mul(nanos_per_unit))
                        .and_then(time_from_nanos)
                        .map_or(Value::Null, Value::Time)
                })
                .collect()
        }
        _ => {
            let casted = cast(array, &DataType::Utf8).map_err(|_| {
                ProcessingError::InvalidFormat(format!(
                    "Unsupported column type {} for '{}'",
                    array.data_type(),
                    name
                ))
            })?;
            let arr = downcast::<StringArray>(&casted, name)?;
            collect(arr, |i| Value::Text(arr.value(i).to_string()))
        }
    };

    Ok(values)
}

fn nanos_per(unit: &TimeUnit) -> i64 {
    match unit {
        TimeUnit::Second => 1_000_000_000,
        TimeUnit::Millisecond => 1_000_000,
        TimeUnit::Microsecond => 1_000,
        TimeUnit::Nanosecond => 1,
    }
}

fn timestamp_raw(array: &ArrayRef, unit: &TimeUnit, name: &str) -> Result<Vec<Option<i64>>> {
    Ok(match unit {
        TimeUnit::Second => downcast::<TimestampSecondArray>(array, name)?.iter().collect(),
        TimeUnit::Millisecond => downcast::<TimestampMillisecondArray>(array, name)?
            .iter()
            .collect(),
        TimeUnit::Microsecond => downcast::<TimestampMicrosecondArray>(array, name)?
            .iter()
            .collect(),
        TimeUnit::Nanosecond => downcast::<TimestampNanosecondArray>(array, name)?
            .iter()
            .collect(),
    })
}

fn time_raw(array: &ArrayRef, unit: &TimeUnit, name: &str) -> Result<Vec<Option<i64>>> {
    Ok(match unit {
        TimeUnit::Second => downcast::<Time32SecondArray>(array, name)?
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        TimeUnit::Millisecond => downcast::<Time32MillisecondArray>(array, name)?
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        TimeUnit::Microsecond => downcast::<Time64MicrosecondArray>(array, name)?
            .iter()
            .collect(),
        TimeUnit::Nanosecond => downcast::<Time64NanosecondArray>(array, name)?
            .iter()
            .collect(),
    })
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("Invalid column type for '{}'", name))
    })
}

fn collect<A: Array, F>(array: &A, mut value_at: F) -> Vec<Value>
where
    F: FnMut(usize) -> Value,
{
    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                Value::Null
            } else {
                value_at(i)
            }
        })
        .collect()
}
