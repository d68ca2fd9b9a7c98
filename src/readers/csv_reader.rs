use crate::error::{ProcessingError, Result};
use crate::models::{Column, ColumnType, Table, Value};
use crate::utils::constants::NULL_TOKENS;
use crate::utils::paths::absolute_path;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::path::Path;
use tracing::debug;

/// Reads a delimited file into a table of text columns.
pub struct CsvTableReader {
    delimiter: u8,
}

impl CsvTableReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Read the whole file. Empty cells and NA tokens become `Null`.
    pub fn read_table(&self, path: &Path) -> Result<Table> {
        if !path.exists() {
            return Err(ProcessingError::MissingSource {
                path: absolute_path(path),
            });
        }

        let bytes = std::fs::read(path)?;
        let text = decode(&bytes);
        self.parse_str(&text)
    }

    /// Parse already decoded CSV text.
    pub fn parse_str(&self, text: &str) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (idx, cell) in record.iter().enumerate() {
                columns[idx].push(parse_cell(cell));
            }
        }

        debug!(
            columns = headers.len(),
            rows = columns.first().map_or(0, Vec::len),
            "Parsed CSV"
        );

        Table::from_columns(
            headers
                .into_iter()
                .zip(columns)
                .map(|(name, values)| Column::new(name, ColumnType::Text, values))
                .collect(),
        )
    }
}

impl Default for CsvTableReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_cell(cell: &str) -> Value {
    if NULL_TOKENS.contains(&cell.trim()) {
        Value::Null
    } else {
        Value::Text(cell.to_string())
    }
}

/// Decode raw bytes, honouring a BOM, then UTF-8, then Windows-1252.
fn decode(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}
