pub mod csv_reader;
pub mod parquet_reader;

pub use csv_reader::CsvTableReader;
pub use parquet_reader::{batches_to_table, ParquetTableReader};
