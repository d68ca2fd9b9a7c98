use crate::error::{ProcessingError, Result};
use crate::models::schema::{DATE, STREET, TIME_FROM};
use crate::models::{Column, ColumnType, Table, Value};
use crate::processors::integrity_checker::{IntegrityChecker, JoinIntegrityReport, JoinSide};
use crate::settings::{JoinType, PipelineConfig};
use crate::utils::constants::{DEFAULT_LEFT_SUFFIX, DEFAULT_POST_MERGE_DROPS, DEFAULT_RIGHT_SUFFIX};
use crate::utils::temporal::{format_hhmm, parse_date, parse_time};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Hashable form of a non-null key cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl KeyPart {
    fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => return None,
            Value::Int(v) => KeyPart::Int(*v),
            Value::Float(v) => KeyPart::Float(v.to_bits()),
            Value::Bool(v) => KeyPart::Bool(*v),
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Date(d) => KeyPart::Date(*d),
            Value::Time(t) => KeyPart::Time(*t),
            Value::Timestamp(ts) => KeyPart::Timestamp(*ts),
        })
    }
}

type RowKey = Vec<KeyPart>;

/// Result of merging the two normalised sources.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub merged: Table,
    pub streets: BTreeMap<String, Table>,
    pub report: JoinIntegrityReport,
}

/// Joins vehicle counts with station measurements on date and time of day,
/// then splits the result by street.
pub struct DataMerger {
    join_keys: Vec<String>,
    join_type: JoinType,
    left_suffix: String,
    right_suffix: String,
    drop_columns: Vec<String>,
    street_filter: Vec<String>,
    strict_join: bool,
}

impl DataMerger {
    pub fn new() -> Self {
        Self {
            join_keys: vec![DATE.to_string(), TIME_FROM.to_string()],
            join_type: JoinType::Inner,
            left_suffix: DEFAULT_LEFT_SUFFIX.to_string(),
            right_suffix: DEFAULT_RIGHT_SUFFIX.to_string(),
            drop_columns: DEFAULT_POST_MERGE_DROPS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            street_filter: Vec::new(),
            strict_join: false,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            join_keys: config.join_keys.clone(),
            join_type: config.join_type,
            left_suffix: config.left_suffix.clone(),
            right_suffix: config.right_suffix.clone(),
            drop_columns: config.drop_columns.clone(),
            street_filter: config.street_filter.clone(),
            strict_join: config.strict_join,
        }
    }

    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn with_streets<S: AsRef<str>>(mut self, streets: &[S]) -> Self {
        self.street_filter = streets.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_drop_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.drop_columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn with_strict_join(mut self, strict_join: bool) -> Self {
        self.strict_join = strict_join;
        self
    }

    pub fn run(&self, counts: &Table, measurements: &Table) -> Result<MergeOutput> {
        let left = self.harmonize_keys(counts.clone())?;
        let right = self.harmonize_keys(measurements.clone())?;

        let left_keys = self.row_keys(&left)?;
        let right_keys = self.row_keys(&right)?;
        let joined = self.join_on_keys(&left, &right, &left_keys, &right_keys)?;

        let checker = IntegrityChecker::new();
        let report = checker.check_join(
            JoinSide {
                raw: counts,
                harmonized: &left,
                keys: &left_keys,
            },
            JoinSide {
                raw: measurements,
                harmonized: &right,
                keys: &right_keys,
            },
            &joined,
        );

        if report.is_silent_empty_join() {
            warn!(
                left_rows = report.left_rows,
                right_rows = report.right_rows,
                "Join produced no rows; key formats may not line up"
            );
            debug!("{}", checker.generate_summary(&report));
            if self.strict_join {
                return Err(ProcessingError::EmptyJoin {
                    left_rows: report.left_rows,
                    right_rows: report.right_rows,
                });
            }
        }

        let merged = self.drop_post_merge(joined);
        let streets = self.partition_by_street(&merged);

        info!(
            rows = merged.height(),
            columns = merged.width(),
            join = %self.join_type,
            "Sources merged"
        );
        Ok(MergeOutput {
            merged,
            streets,
            report,
        })
    }

    /// Bring both join keys to one representation: `datum` as a pure date,
    /// `zeit_von` as zero-padded `HH:MM` text. Unconvertible cells become null.
    pub fn harmonize_keys(&self, mut table: Table) -> Result<Table> {
        if table.has_column(DATE) {
            table.transform_column(DATE, |c| {
                Ok(c.map(ColumnType::Date, |v| {
                    harmonize_date(&v).map_or(Value::Null, Value::Date)
                }))
            })?;
        }
        if table.has_column(TIME_FROM) {
            table.transform_column(TIME_FROM, |c| {
                Ok(c.map(ColumnType::Text, |v| {
                    harmonize_time(&v).map_or(Value::Null, |t| Value::Text(format_hhmm(t)))
                }))
            })?;
        }
        Ok(table)
    }

    /// Join `left` with `right` on the configured keys.
    ///
    /// Key columns appear once, in their left position, filled from the right
    /// side for right-only rows. Other columns present on both sides carry the
    /// left or right suffix. Rows come in left order; unmatched right rows of
    /// a right or outer join follow at the end.
    pub fn join(&self, left: &Table, right: &Table) -> Result<Table> {
        let left_keys = self.row_keys(left)?;
        let right_keys = self.row_keys(right)?;
        self.join_on_keys(left, right, &left_keys, &right_keys)
    }

    pub fn drop_post_merge(&self, table: Table) -> Table {
        table.drop_columns(&self.drop_columns)
    }

    /// Rows of `merged` for each configured street. A street without rows, or
    /// a table without a street column, gives an empty table of the same shape.
    pub fn partition_by_street(&self, merged: &Table) -> BTreeMap<String, Table> {
        self.street_filter
            .iter()
            .map(|street| {
                let partition = match merged.mask(STREET, |v| v.as_str() == Some(street.as_str())) {
                    Ok(mask) => merged.filter(&mask),
                    Err(_) => merged.empty_like(),
                };
                debug!(street = %street, rows = partition.height(), "Street partition");
                (street.clone(), partition)
            })
            .collect()
    }

    fn row_keys(&self, table: &Table) -> Result<Vec<Option<RowKey>>> {
        let key_columns = self
            .join_keys
            .iter()
            .map(|k| table.require_column(k))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..table.height())
            .map(|row| {
                key_columns
                    .iter()
                    .map(|c| c.get(row).and_then(KeyPart::from_value))
                    .collect::<Option<RowKey>>()
            })
            .collect())
    }

    fn join_on_keys(
        &self,
        left: &Table,
        right: &Table,
        left_keys: &[Option<RowKey>],
        right_keys: &[Option<RowKey>],
    ) -> Result<Table> {
        let mut index: HashMap<&RowKey, Vec<usize>> = HashMap::new();
        for (row, key) in right_keys.iter().enumerate() {
            if let Some(key) = key {
                index.entry(key).or_default().push(row);
            }
        }

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        let mut right_matched = vec![false; right.height()];

        for (row, key) in left_keys.iter().enumerate() {
            match key.as_ref().and_then(|k| index.get(k)) {
                Some(matches) => {
                    for &other in matches {
                        left_rows.push(Some(row));
                        right_rows.push(Some(other));
                        right_matched[other] = true;
                    }
                }
                None if self.join_type.keeps_unmatched_left() => {
                    left_rows.push(Some(row));
                    right_rows.push(None);
                }
                None => {}
            }
        }

        if self.join_type.keeps_unmatched_right() {
            for (row, matched) in right_matched.iter().enumerate() {
                if !matched {
                    left_rows.push(None);
                    right_rows.push(Some(row));
                }
            }
        }

        let is_key = |name: &str| self.join_keys.iter().any(|k| k == name);
        let mut columns = Vec::with_capacity(left.width() + right.width());

        for column in left.columns() {
            let name = column.name();
            if is_key(name) {
                let right_key = right.require_column(name)?;
                columns.push(coalesce(
                    column.take(&left_rows),
                    right_key.take(&right_rows),
                ));
            } else if right.has_column(name) {
                columns.push(
                    column
                        .take(&left_rows)
                        .renamed(format!("{}{}", name, self.left_suffix)),
                );
            } else {
                columns.push(column.take(&left_rows));
            }
        }

        for column in right.columns() {
            let name = column.name();
            if is_key(name) {
                continue;
            }
            if left.has_column(name) {
                columns.push(
                    column
                        .take(&right_rows)
                        .renamed(format!("{}{}", name, self.right_suffix)),
                );
            } else {
                columns.push(column.take(&right_rows));
            }
        }

        Table::from_columns(columns).map_err(|e| ProcessingError::DataMerge(e.to_string()))
    }
}

impl Default for DataMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn harmonize_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Text(s) => parse_date(s),
        other => other.as_date(),
    }
}

fn harmonize_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Text(s) => parse_time(s),
        other => other.as_time(),
    }
}

/// Left values, with nulls filled from `fallback`.
fn coalesce(primary: Column, fallback: Column) -> Column {
    let name = primary.name().to_string();
    let dtype = primary.dtype();
    let values = primary
        .into_values()
        .into_iter()
        .zip(fallback.into_values())
        .map(|(p, f)| if p.is_null() { f } else { p })
        .collect();
    Column::new(name, dtype, values)
}
