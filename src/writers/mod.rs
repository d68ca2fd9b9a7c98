pub mod parquet_writer;

pub use parquet_writer::{table_to_batch, ParquetFileInfo, ParquetWriter};
