pub mod schema;
pub mod table;
pub mod weekday;

pub use schema::ColumnType;
pub use table::{Column, Table, Value};
pub use weekday::Weekday;
