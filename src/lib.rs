pub mod cli;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod settings;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
pub use models::{Column, ColumnType, Table, Value};
pub use processors::{PipelineOutput, TrafficPipeline};
pub use settings::{JoinType, PipelineConfig};
