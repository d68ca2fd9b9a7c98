use crate::error::Result;
use crate::models::schema::*;
use crate::models::{Column, ColumnType, Table, Value};
use crate::readers::ParquetTableReader;
use crate::settings::PipelineConfig;
use chrono::{Datelike, NaiveDateTime};
use std::path::PathBuf;
use tracing::{debug, info};

/// Cleans the measurement-station source: typed columns, time features
/// derived from the start timestamp, one year, one locality (substring).
pub struct MeasurementNormalizer {
    path: PathBuf,
    locality: String,
    target_year: i32,
    drop_station_id: bool,
}

impl MeasurementNormalizer {
    pub fn new(path: impl Into<PathBuf>, locality: impl Into<String>, target_year: i32) -> Self {
        Self {
            path: path.into(),
            locality: locality.into(),
            target_year,
            drop_station_id: false,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            config.measurement_path()?,
            config.locality_filter.clone(),
            config.target_year,
        )
        .with_drop_station_id(config.drop_station_id))
    }

    pub fn with_drop_station_id(mut self, drop_station_id: bool) -> Self {
        self.drop_station_id = drop_station_id;
        self
    }

    pub fn run(&self) -> Result<Table> {
        let table = self.load()?;
        self.normalize(table)
    }

    pub fn load(&self) -> Result<Table> {
        info!(path = %self.path.display(), "Loading station measurements");
        ParquetTableReader::new().read_table(&self.path)
    }

    pub fn normalize(&self, table: Table) -> Result<Table> {
        let table = self.cast_types(table)?;
        let table = self.drop_station_id(table);
        let table = self.derive_time_features(table)?;
        let table = self.filter_year(table)?;
        let table = self.filter_locality(table)?;

        info!(
            rows = table.height(),
            columns = table.width(),
            "Station measurements normalised"
        );
        Ok(table)
    }

    pub fn cast_types(&self, mut table: Table) -> Result<Table> {
        for (column, target) in MEASUREMENT_SOURCE_CASTS {
            table.transform_column(column, |c| c.cast(*target))?;
        }
        Ok(table)
    }

    pub fn drop_station_id(&self, table: Table) -> Table {
        if self.drop_station_id {
            table.drop_columns(&[STATION_ID])
        } else {
            table
        }
    }

    /// Parse the start timestamp and derive year, month, day, time of day and
    /// date from it. Existing columns of those names are overwritten.
    pub fn derive_time_features(&self, mut table: Table) -> Result<Table> {
        table.transform_column(START_TIME, |c| c.cast(ColumnType::Timestamp))?;

        let starts: Vec<Option<NaiveDateTime>> = table
            .require_column(START_TIME)?
            .values()
            .iter()
            .map(Value::as_timestamp)
            .collect();

        let derive = |f: fn(&NaiveDateTime) -> Value| -> Vec<Value> {
            starts
                .iter()
                .map(|ts| ts.as_ref().map_or(Value::Null, f))
                .collect()
        };

        let derived = [
            Column::new(
                YEAR,
                ColumnType::Int,
                derive(|ts| Value::Int(i64::from(ts.year()))),
            ),
            Column::new(
                MONTH,
                ColumnType::Int,
                derive(|ts| Value::Int(i64::from(ts.month()))),
            ),
            Column::new(
                DAY,
                ColumnType::Int,
                derive(|ts| Value::Int(i64::from(ts.day()))),
            ),
            Column::new(
                TIME_FROM,
                ColumnType::Time,
                derive(|ts| Value::Time(ts.time())),
            ),
            Column::new(
                DATE,
                ColumnType::Date,
                derive(|ts| Value::Date(ts.date())),
            ),
        ];

        for column in derived {
            table.upsert_column(column)?;
        }
        Ok(table)
    }

    pub fn filter_year(&self, table: Table) -> Result<Table> {
        let target = i64::from(self.target_year);
        let mask = table.mask(YEAR, |v| v.as_int() == Some(target))?;
        Ok(table.filter(&mask))
    }

    /// Case-insensitive substring match on the station name.
    pub fn filter_locality(&self, table: Table) -> Result<Table> {
        let needle = self.locality.to_lowercase();
        let mask = table.mask(STATION_NAME, |v| {
            v.as_str()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })?;
        let filtered = table.filter(&mask);

        debug!(
            kept = filtered.height(),
            dropped = table.height() - filtered.height(),
            locality = %self.locality,
            "Filtered stations by locality"
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    fn raw_table(rows: &[(&str, &str)]) -> Table {
        Table::from_columns(vec![
            Column::new(
                STATION_NAME,
                ColumnType::Text,
                rows.iter().map(|(name, _)| Value::text(*name)).collect(),
            ),
            Column::new(
                STATION_ID,
                ColumnType::Int,
                rows.iter().map(|_| Value::Int(4711)).collect(),
            ),
            Column::new(
                INDICATOR,
                ColumnType::Text,
                rows.iter().map(|_| Value::text("NO2")).collect(),
            ),
            Column::new(
                START_TIME,
                ColumnType::Text,
                rows.iter().map(|(_, ts)| Value::text(*ts)).collect(),
            ),
            Column::new(
                YEAR,
                ColumnType::Int,
                rows.iter().map(|_| Value::Int(1999)).collect(),
            ),
        ])
        .unwrap()
    }

    fn normalizer() -> MeasurementNormalizer {
        MeasurementNormalizer::new("unused.parquet", "Weinfelden", 2024)
    }

    #[test]
    fn test_full_normalisation() {
        let table = normalizer()
            .normalize(raw_table(&[
                ("Weinfelden Zentrum", "2024-03-01 08:00:00"),
                ("WEINFELDEN Bahnhof", "2024-07-14 17:45:00"),
                ("Frauenfeld", "2024-03-01 08:00:00"),
                ("Weinfelden Zentrum", "2023-12-31 23:45:00"),
                ("Weinfelden Zentrum", "kaputt"),
            ]))
            .unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.get(0, YEAR), Some(&Value::Int(2024)));
        assert_eq!(table.get(0, MONTH), Some(&Value::Int(3)));
        assert_eq!(table.get(0, DAY), Some(&Value::Int(1)));
        assert_eq!(
            table.get(0, DATE),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
        );
        assert_eq!(
            table.get(1, TIME_FROM),
            Some(&Value::Time(NaiveTime::from_hms_opt(17, 45, 0).unwrap()))
        );
        assert_eq!(table.get(0, STATION_ID), Some(&Value::text("4711")));
        assert_eq!(
            table.column(STATION_NAME).unwrap().dtype(),
            ColumnType::Category
        );
    }

    #[test]
    fn test_time_features_always_follow_start_time() {
        let n = normalizer();
        let table = n
            .derive_time_features(raw_table(&[("Weinfelden", "2024-05-02 06:30:00")]))
            .unwrap();

        // The stale year from the file is replaced
        assert_eq!(table.get(0, YEAR), Some(&Value::Int(2024)));
        let start = table.get(0, START_TIME).and_then(Value::as_timestamp).unwrap();
        assert_eq!(table.get(0, DATE).and_then(Value::as_date), Some(start.date()));
        assert_eq!(table.get(0, TIME_FROM).and_then(Value::as_time), Some(start.time()));
    }

    #[test]
    fn test_drop_station_id_toggle() {
        let n = normalizer().with_drop_station_id(true);
        let table = n
            .normalize(raw_table(&[("Weinfelden", "2024-05-02 06:30:00")]))
            .unwrap();
        assert!(!table.has_column(STATION_ID));
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_null_station_names_are_dropped() {
        let mut table = raw_table(&[("x", "2024-01-01 00:00:00")]);
        table
            .upsert_column(Column::new(STATION_NAME, ColumnType::Text, vec![Value::Null]))
            .unwrap();
        let filtered = normalizer().filter_locality(table).unwrap();
        assert!(filtered.is_empty());
    }
}
