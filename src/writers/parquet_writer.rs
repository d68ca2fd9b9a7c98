use crate::error::{ProcessingError, Result};
use crate::models::{Column, ColumnType, Table, Value};
use crate::utils::constants::*;
use crate::utils::filename::street_partition_paths;
use crate::utils::temporal::unix_epoch;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Timelike;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write a table to a Parquet file. Returns false, without creating a
    /// file, when the table has no columns.
    pub fn write_table(&self, table: &Table, path: &Path) -> Result<bool> {
        if table.width() == 0 {
            debug!(path = %path.display(), "Skipping table without columns");
            return Ok(false);
        }

        let batch = table_to_batch(table)?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        debug!(rows = table.height(), path = %path.display(), "Wrote Parquet file");
        Ok(true)
    }

    /// Write one file per street partition into `dir`. Returns the files
    /// actually written.
    pub fn write_partitions(
        &self,
        partitions: &BTreeMap<String, Table>,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let paths = street_partition_paths(dir, partitions.keys().map(String::as_str));

        let mut written = Vec::with_capacity(partitions.len());
        for (table, path) in partitions.values().zip(paths) {
            if self.write_table(table, &path)? {
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        let columns = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
            columns,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a table into a single Arrow record batch.
pub fn table_to_batch(table: &Table) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(c.name(), arrow_type(c.dtype()), true))
        .collect();
    let arrays: Vec<ArrayRef> = table.columns().iter().map(column_to_array).collect();

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn arrow_type(dtype: ColumnType) -> DataType {
    match dtype {
        ColumnType::Int | ColumnType::Count => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Text | ColumnType::Category => DataType::Utf8,
        ColumnType::Date => DataType::Date32,
        ColumnType::Time => DataType::Time64(TimeUnit::Microsecond),
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
    }
}

fn column_to_array(column: &Column) -> ArrayRef {
    let values = column.values();
    match column.dtype() {
        ColumnType::Int | ColumnType::Count => Arc::new(Int64Array::from(
            values.iter().map(Value::as_int).collect::<Vec<_>>(),
        )),
        ColumnType::Float => Arc::new(Float64Array::from(
            values.iter().map(Value::as_float).collect::<Vec<_>>(),
        )),
        ColumnType::Bool => Arc::new(BooleanArray::from(
            values.iter().map(Value::as_bool).collect::<Vec<_>>(),
        )),
        ColumnType::Text | ColumnType::Category => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect::<Vec<_>>(),
        )),
        ColumnType::Date => {
            let epoch = unix_epoch();
            Arc::new(Date32Array::from(
                values
                    .iter()
                    .map(|v| {
                        v.as_date()
                            .and_then(|d| i32::try_from((d - epoch).num_days()).ok())
                    })
                    .collect::<Vec<_>>(),
            ))
        }
        ColumnType::Time => Arc::new(Time64MicrosecondArray::from(
            values
                .iter()
                .map(|v| {
                    v.as_time().map(|t| {
                        i64::from(t.num_seconds_from_midnight()) * 1_000_000
                            + i64::from(t.nanosecond() / 1_000)
                    })
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Timestamp => Arc::new(TimestampMicrosecondArray::from(
            values
                .iter()
                .map(|v| v.as_timestamp().map(|ts| ts.and_utc().timestamp_micros()))
                .collect::<Vec<_>>(),
        )),
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
    pub columns: Vec<String>,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / f64::from(self.row_groups)
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.columns.join(", "),
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}
