use crate::error::{ProcessingError, Result};
use crate::models::schema::*;
use crate::models::{Column, ColumnType, Table, Value, Weekday};
use crate::readers::CsvTableReader;
use crate::settings::PipelineConfig;
use crate::utils::temporal::{parse_date, parse_time, parse_time_strict};
use chrono::Datelike;
use std::path::PathBuf;
use tracing::{debug, info};

/// Cleans the vehicle-count source: one locality, one year, typed columns,
/// descriptive names and derived totals.
pub struct CountNormalizer {
    path: PathBuf,
    locality: String,
    target_year: i32,
    delimiter: u8,
    drop_raw_counts: bool,
}

impl CountNormalizer {
    pub fn new(path: impl Into<PathBuf>, locality: impl Into<String>, target_year: i32) -> Self {
        Self {
            path: path.into(),
            locality: locality.into(),
            target_year,
            delimiter: b',',
            drop_raw_counts: false,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            config.count_path()?,
            config.locality_filter.clone(),
            config.target_year,
        )
        .with_delimiter(config.csv_delimiter_byte())
        .with_drop_raw_counts(config.drop_raw_counts))
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_drop_raw_counts(mut self, drop_raw_counts: bool) -> Self {
        self.drop_raw_counts = drop_raw_counts;
        self
    }

    /// Load the source file and run every normalisation step.
    pub fn run(&self) -> Result<Table> {
        let table = self.load()?;
        self.normalize(table)
    }

    /// Read the file, keep the configured locality and drop incomplete rows.
    pub fn load(&self) -> Result<Table> {
        info!(path = %self.path.display(), "Loading vehicle counts");
        let raw = CsvTableReader::with_delimiter(self.delimiter).read_table(&self.path)?;
        let local = self.filter_locality(raw)?;
        let complete = local.drop_nulls();

        debug!(
            rows = local.height(),
            dropped = local.height() - complete.height(),
            "Dropped rows with missing values"
        );
        Ok(complete)
    }

    /// Steps after loading, in their fixed order.
    pub fn normalize(&self, table: Table) -> Result<Table> {
        let table = self.cast_types(table)?;
        let table = self.encode_binary(table)?;
        let table = self.parse_temporal(table)?;
        let table = self.rename_columns(table);
        let table = self.rename_weekdays(table)?;
        let table = self.derive_time_features(table)?;
        let table = self.aggregate_vehicle_counts(table)?;
        let table = self.filter_year(table)?;
        let table = self.drop_unnecessary(table);

        info!(
            rows = table.height(),
            columns = table.width(),
            "Vehicle counts normalised"
        );
        Ok(table)
    }

    /// Exact match on the locality column.
    pub fn filter_locality(&self, table: Table) -> Result<Table> {
        let mask = table.mask(LOCALITY, |v| v.as_str() == Some(self.locality.as_str()))?;
        Ok(table.filter(&mask))
    }

    pub fn cast_types(&self, mut table: Table) -> Result<Table> {
        for (column, target) in COUNT_SOURCE_CASTS {
            table.transform_column(column, |c| c.cast(*target))?;
        }
        Ok(table)
    }

    /// Map the yes/no regional bus token to 1/0; anything else becomes null.
    pub fn encode_binary(&self, mut table: Table) -> Result<Table> {
        table.transform_column(REGIONAL_BUS, |c| {
            Ok(c.map(ColumnType::Int, |v| {
                v.as_str()
                    .and_then(|token| {
                        BINARY_TOKENS
                            .iter()
                            .find(|(label, _)| *label == token)
                            .map(|(_, code)| Value::Int(*code))
                    })
                    .unwrap_or(Value::Null)
            }))
        })?;
        Ok(table)
    }

    /// Parse the date, the free-text start time and the strict `HH:MM` end time.
    pub fn parse_temporal(&self, mut table: Table) -> Result<Table> {
        table.transform_column(DATE, |c| {
            Ok(c.map(ColumnType::Date, |v| match v {
                Value::Text(s) => parse_date(&s).map_or(Value::Null, Value::Date),
                other => other.as_date().map_or(Value::Null, Value::Date),
            }))
        })?;

        table.transform_column(TIME_FROM, |c| {
            Ok(c.map(ColumnType::Time, |v| match v {
                Value::Text(s) => parse_time(&s).map_or(Value::Null, Value::Time),
                other => other.as_time().map_or(Value::Null, Value::Time),
            }))
        })?;

        table.transform_column(TIME_TO, |c| {
            Ok(c.map(ColumnType::Time, |v| {
                v.as_str()
                    .and_then(parse_time_strict)
                    .map_or(Value::Null, Value::Time)
            }))
        })?;

        Ok(table)
    }

    pub fn rename_columns(&self, table: Table) -> Table {
        table.rename_columns(VEHICLE_COLUMN_RENAMES)
    }

    /// Translate weekday labels to German. Unknown labels are an error.
    pub fn rename_weekdays(&self, mut table: Table) -> Result<Table> {
        table.transform_column(WEEKDAY, |c| {
            c.try_map(ColumnType::Category, |v| match v {
                Value::Null => Ok(Value::Null),
                Value::Text(label) => {
                    Weekday::translate(WEEKDAY, &label).map(|t| Value::text(t))
                }
                other => Err(ProcessingError::UnknownCategory {
                    column: WEEKDAY.to_string(),
                    label: other.to_string(),
                }),
            })
        })?;
        Ok(table)
    }

    /// Year, month, ISO week and weekend flag.
    pub fn derive_time_features(&self, mut table: Table) -> Result<Table> {
        let dates: Vec<Option<chrono::NaiveDate>> = table
            .require_column(DATE)?
            .values()
            .iter()
            .map(Value::as_date)
            .collect();

        let weekend: Vec<Value> = table
            .require_column(WEEKDAY)?
            .values()
            .iter()
            .map(|v| {
                let is_weekend = v
                    .as_str()
                    .and_then(Weekday::from_target_label)
                    .is_some_and(|day| day.is_weekend());
                Value::Bool(is_weekend)
            })
            .collect();

        let derive = |f: fn(&chrono::NaiveDate) -> i64| -> Vec<Value> {
            dates
                .iter()
                .map(|d| d.as_ref().map_or(Value::Null, |d| Value::Int(f(d))))
                .collect()
        };

        table.upsert_column(Column::new(
            YEAR,
            ColumnType::Int,
            derive(|d| i64::from(d.year())),
        ))?;
        table.upsert_column(Column::new(
            MONTH,
            ColumnType::Int,
            derive(|d| i64::from(d.month())),
        ))?;
        table.upsert_column(Column::new(
            WEEK,
            ColumnType::Int,
            derive(|d| i64::from(d.iso_week().week())),
        ))?;
        table.upsert_column(Column::new(IS_WEEKEND, ColumnType::Bool, weekend))?;

        Ok(table)
    }

    /// Derived vehicle totals. A null input makes the total null.
    pub fn aggregate_vehicle_counts(&self, mut table: Table) -> Result<Table> {
        for (total, inputs) in VEHICLE_AGGREGATES {
            let sums = sum_columns(&table, inputs)?;
            table.upsert_column(Column::new(*total, ColumnType::Count, sums))?;
        }
        Ok(table)
    }

    pub fn filter_year(&self, table: Table) -> Result<Table> {
        let target = i64::from(self.target_year);
        let mask = table.mask(YEAR, |v| v.as_int() == Some(target))?;
        let filtered = table.filter(&mask);

        debug!(
            kept = filtered.height(),
            dropped = table.height() - filtered.height(),
            year = self.target_year,
            "Filtered vehicle counts by year"
        );
        Ok(filtered)
    }

    pub fn drop_unnecessary(&self, table: Table) -> Table {
        let table = table.drop_columns(COUNT_REDUNDANT_COLUMNS);
        if self.drop_raw_counts {
            table.drop_columns(RAW_COUNT_COLUMNS)
        } else {
            table
        }
    }
}

/// Row-wise sum of integer columns, propagating nulls.
fn sum_columns(table: &Table, inputs: &[&str]) -> Result<Vec<Value>> {
    let columns = inputs
        .iter()
        .map(|name| table.require_column(name))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..table.height())
        .map(|row| {
            columns
                .iter()
                .try_fold(0i64, |acc, column| {
                    column
                        .get(row)
                        .and_then(Value::as_int)
                        .and_then(|n| acc.checked_add(n))
                })
                .into()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "code,name,gemeinde,adresse,strasse,richtung,jahr,wochentag,reg_bus,mr,pw,pw+,lief,lief+,lief+aufl.,lw,lw+,sattelzug,bus,datum,zeit_von,zeit_bis,spur_code,stunde";

    fn row(locality: &str, date: &str, weekday: &str, street: &str) -> String {
        format!(
            "101,Zählstelle,{locality},Hauptstrasse 1,{street},Nord,2024,{weekday},JA,1,10,2,3,1,0,4,1,2,1,{date},8:00,08:15,1,8"
        )
    }

    fn raw_table(rows: &[String]) -> Table {
        let text = format!("{}\n{}\n", HEADER, rows.join("\n"));
        CsvTableReader::new().parse_str(&text).unwrap()
    }

    fn normalizer() -> CountNormalizer {
        CountNormalizer::new("unused.csv", "Weinfelden", 2024)
    }

    #[test]
    fn test_full_normalisation() {
        let n = normalizer();
        let raw = raw_table(&[
            row("Weinfelden", "2024-03-01", "Friday", "K80"),
            row("Amriswil", "2024-03-01", "Friday", "K80"),
            row("Weinfelden", "2023-03-01", "Wednesday", "K75"),
        ]);

        let table = n.filter_locality(raw).unwrap().drop_nulls();
        let table = n.normalize(table).unwrap();

        assert_eq!(table.height(), 1);
        assert_eq!(table.get(0, CAR_TOTAL), Some(&Value::Int(12)));
        assert_eq!(table.get(0, VAN_TOTAL), Some(&Value::Int(4)));
        assert_eq!(table.get(0, TRUCK_TOTAL), Some(&Value::Int(7)));
        assert_eq!(table.get(0, MOTORIZED_TOTAL), Some(&Value::Int(25)));
        assert_eq!(table.get(0, WEEKDAY), Some(&Value::text("Freitag")));
        assert_eq!(table.get(0, IS_WEEKEND), Some(&Value::Bool(false)));
        assert_eq!(table.get(0, REGIONAL_BUS_LABEL), Some(&Value::Int(1)));
        assert_eq!(table.get(0, WEEK), Some(&Value::Int(9)));
        assert_eq!(table.get(0, MONTH), Some(&Value::Int(3)));
        assert_eq!(
            table.get(0, TIME_FROM).map(|v| v.to_string()),
            Some("08:00:00".to_string())
        );
        assert!(!table.has_column(LOCALITY));
        assert!(!table.has_column(LANE_CODE));
        assert!(table.has_column(CAR_LABEL));
    }

    #[test]
    fn test_locality_filter_is_exact() {
        let n = normalizer();
        let raw = raw_table(&[
            row("Weinfelden", "2024-03-01", "Friday", "K80"),
            row("weinfelden", "2024-03-01", "Friday", "K80"),
            row("Weinfelden Ost", "2024-03-01", "Friday", "K80"),
        ]);
        assert_eq!(n.filter_locality(raw).unwrap().height(), 1);
    }

    #[test]
    fn test_rows_with_nulls_are_dropped_on_load() -> Result<()> {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new()?;
        let mut incomplete = row("Weinfelden", "2024-03-02", "Saturday", "K80");
        incomplete = incomplete.replacen("Hauptstrasse 1", "", 1);
        writeln!(
            file,
            "{}\n{}\n{}",
            HEADER,
            row("Weinfelden", "2024-03-01", "Friday", "K80"),
            incomplete
        )?;

        let table = CountNormalizer::new(file.path(), "Weinfelden", 2024).load()?;
        assert_eq!(table.height(), 1);
        Ok(())
    }

    #[test]
    fn test_binary_encoding_is_tri_state() {
        let n = normalizer();
        let table = Table::from_columns(vec![Column::new(
            REGIONAL_BUS,
            ColumnType::Text,
            vec![Value::text("JA"), Value::text("Nein"), Value::text("ja")],
        )])
        .unwrap();

        let encoded = n.encode_binary(table).unwrap();
        assert_eq!(
            encoded.column(REGIONAL_BUS).unwrap().values(),
            &[Value::Int(1), Value::Int(0), Value::Null]
        );
    }

    #[test]
    fn test_unparseable_temporals_become_null() {
        let n = normalizer();
        let table = Table::from_columns(vec![
            Column::new(DATE, ColumnType::Text, vec![Value::text("soon")]),
            Column::new(TIME_FROM, ColumnType::Text, vec![Value::text("noon")]),
            Column::new(TIME_TO, ColumnType::Text, vec![Value::text("8:15")]),
        ])
        .unwrap();

        let parsed = n.parse_temporal(table).unwrap();
        assert_eq!(parsed.get(0, DATE), Some(&Value::Null));
        assert_eq!(parsed.get(0, TIME_FROM), Some(&Value::Null));
        assert_eq!(parsed.get(0, TIME_TO), Some(&Value::Null));
    }

    #[test]
    fn test_weekday_translation_rejects_translated_labels() {
        let n = normalizer();
        let table = Table::from_columns(vec![Column::new(
            WEEKDAY,
            ColumnType::Category,
            vec![Value::text("Sunday")],
        )])
        .unwrap();

        let once = n.rename_weekdays(table).unwrap();
        assert_eq!(once.get(0, WEEKDAY), Some(&Value::text("Sonntag")));
        assert!(matches!(
            n.rename_weekdays(once),
            Err(ProcessingError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_weekend_flag() {
        let n = normalizer();
        let table = Table::from_columns(vec![
            Column::new(
                DATE,
                ColumnType::Date,
                vec![
                    Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()),
                    Value::Null,
                ],
            ),
            Column::new(
                WEEKDAY,
                ColumnType::Category,
                vec![Value::text("Samstag"), Value::text("Montag")],
            ),
        ])
        .unwrap();

        let derived = n.derive_time_features(table).unwrap();
        assert_eq!(derived.get(0, IS_WEEKEND), Some(&Value::Bool(true)));
        assert_eq!(derived.get(1, IS_WEEKEND), Some(&Value::Bool(false)));
        assert_eq!(derived.get(0, YEAR), Some(&Value::Int(2024)));
        assert_eq!(derived.get(1, YEAR), Some(&Value::Null));
    }

    #[test]
    fn test_aggregation_propagates_nulls() {
        let n = normalizer();
        let count = |v: Option<i64>| Column::new("", ColumnType::Count, vec![Value::from(v)]);
        let columns = vec![
            count(Some(1)).renamed(MOTORCYCLE_LABEL),
            count(Some(10)).renamed(CAR_LABEL),
            count(None).renamed(CAR_WITH_TRAILER_LABEL),
            count(Some(3)).renamed(VAN_LABEL),
            count(Some(1)).renamed(VAN_WITH_TRAILER_LABEL),
            count(Some(0)).renamed(VAN_WITH_SEMITRAILER_LABEL),
            count(Some(4)).renamed(TRUCK_LABEL),
            count(Some(1)).renamed(TRUCK_WITH_TRAILER_LABEL),
            count(Some(2)).renamed(ARTICULATED_TRUCK),
            count(Some(1)).renamed(BUS),
        ];

        let table = n
            .aggregate_vehicle_counts(Table::from_columns(columns).unwrap())
            .unwrap();
        assert_eq!(table.get(0, CAR_TOTAL), Some(&Value::Null));
        assert_eq!(table.get(0, VAN_TOTAL), Some(&Value::Int(4)));
        assert_eq!(table.get(0, TRUCK_TOTAL), Some(&Value::Int(7)));
        assert_eq!(table.get(0, MOTORIZED_TOTAL), Some(&Value::Null));
    }

    #[test]
    fn test_invalid_count_is_a_coercion_error() {
        let n = normalizer();
        let raw = raw_table(&[row("Weinfelden", "2024-03-01", "Friday", "K80")
            .replacen(",10,", ",ten,", 1)]);
        assert!(matches!(
            n.cast_types(raw),
            Err(ProcessingError::SchemaCoercion { .. })
        ));
    }

    #[test]
    fn test_drop_raw_counts_toggle() {
        let n = normalizer().with_drop_raw_counts(true);
        let raw = raw_table(&[row("Weinfelden", "2024-03-01", "Friday", "K80")]);
        let table = n.normalize(raw).unwrap();

        assert!(!table.has_column(CAR_LABEL));
        assert!(!table.has_column(ARTICULATED_TRUCK));
        assert!(table.has_column(MOTORCYCLE_LABEL));
        assert!(table.has_column(CAR_TOTAL));
    }
}
