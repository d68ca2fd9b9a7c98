use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::models::ColumnType;
use crate::utils::temporal::{parse_date, parse_time, parse_timestamp};

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Timestamp(ts) => Some(ts.time()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// Convert to `target`. Temporal targets coerce unparseable input to
    /// `Null`; numeric and boolean targets reject it.
    pub fn coerce(self, column: &str, target: ColumnType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }

        let coerced = match (target, self) {
            (ColumnType::Int, value) => Value::Int(coerce_int(column, target, value)?),
            (ColumnType::Count, value) => {
                let n = coerce_int(column, target, value)?;
                if n < 0 {
                    return Err(coercion_error(column, &Value::Int(n), target));
                }
                Value::Int(n)
            }
            (ColumnType::Float, Value::Float(v)) => Value::Float(v),
            (ColumnType::Float, Value::Int(v)) => Value::Float(v as f64),
            (ColumnType::Float, Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(v) => Value::Float(v),
                Err(_) => return Err(coercion_error(column, &Value::Text(s), target)),
            },
            (ColumnType::Bool, Value::Bool(v)) => Value::Bool(v),
            (ColumnType::Bool, Value::Int(v)) if v == 0 || v == 1 => Value::Bool(v == 1),
            (ColumnType::Bool, Value::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(coercion_error(column, &Value::Text(s), target)),
            },
            (ColumnType::Text | ColumnType::Category, Value::Text(s)) => Value::Text(s),
            (ColumnType::Text | ColumnType::Category, value) => Value::Text(value.to_string()),
            (ColumnType::Date, value) => match value {
                Value::Text(s) => parse_date(&s).map_or(Value::Null, Value::Date),
                other => other.as_date().map_or(Value::Null, Value::Date),
            },
            (ColumnType::Time, value) => match value {
                Value::Text(s) => parse_time(&s).map_or(Value::Null, Value::Time),
                other => other.as_time().map_or(Value::Null, Value::Time),
            },
            (ColumnType::Timestamp, value) => match value {
                Value::Text(s) => parse_timestamp(&s).map_or(Value::Null, Value::Timestamp),
                other => other.as_timestamp().map_or(Value::Null, Value::Timestamp),
            },
            (_, value) => return Err(coercion_error(column, &value, target)),
        };

        Ok(coerced)
    }
}

fn coerce_int(column: &str, target: ColumnType, value: Value) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(v),
        Value::Bool(v) => Ok(i64::from(v)),
        Value::Float(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        Value::Text(ref s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && v.fract() == 0.0)
                        .map(|v| v as i64)
                })
                .ok_or_else(|| coercion_error(column, &value, target))
        }
        other => Err(coercion_error(column, &other, target)),
    }
}

fn coercion_error(column: &str, value: &Value, target: ColumnType) -> ProcessingError {
    ProcessingError::SchemaCoercion {
        column: column.to_string(),
        value: value.to_string(),
        target,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Value::Null, Value::Int)
    }
}

/// A named, typed column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: ColumnType,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Cast every cell to `target`.
    pub fn cast(self, target: ColumnType) -> Result<Column> {
        let Column { name, values, .. } = self;
        let values = values
            .into_iter()
            .map(|v| v.coerce(&name, target))
            .collect::<Result<Vec<_>>>()?;

        Ok(Column {
            name,
            dtype: target,
            values,
        })
    }

    /// Apply `f` to every cell, producing a column of type `dtype`.
    pub fn map<F>(self, dtype: ColumnType, f: F) -> Column
    where
        F: FnMut(Value) -> Value,
    {
        Column {
            name: self.name,
            dtype,
            values: self.values.into_iter().map(f).collect(),
        }
    }

    pub fn try_map<F>(self, dtype: ColumnType, mut f: F) -> Result<Column>
    where
        F: FnMut(Value) -> Result<Value>,
    {
        let values = self
            .values
            .into_iter()
            .map(&mut f)
            .collect::<Result<Vec<_>>>()?;

        Ok(Column {
            name: self.name,
            dtype,
            values,
        })
    }

    pub fn filter(&self, mask: &[bool]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: self
                .values
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v.clone())
                .collect(),
        }
    }

    /// Gather rows by index; `None` yields a null cell.
    pub fn take(&self, indices: &[Option<usize>]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: indices
                .iter()
                .map(|i| {
                    i.and_then(|i| self.values.get(i).cloned())
                        .unwrap_or(Value::Null)
                })
                .collect(),
        }
    }
}

/// An in-memory table of equally long columns. Row order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let height = columns.first().map_or(0, Column::len);

        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != height {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    height
                )));
            }
            if !seen.insert(column.name()) {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Duplicate column '{}'",
                    column.name()
                )));
            }
        }

        Ok(Self { columns, height })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| ProcessingError::missing_column(name))
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Add a column, replacing any existing column of the same name in place.
    pub fn upsert_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.height {
            return Err(ProcessingError::InvalidFormat(format!(
                "Column '{}' has {} rows, expected {}",
                column.name(),
                column.len(),
                self.height
            )));
        }

        self.height = column.len();
        match self.position(column.name()) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Replace a column by a transformed version of itself, keeping its position.
    pub fn transform_column<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(Column) -> Result<Column>,
    {
        let idx = self
            .position(name)
            .ok_or_else(|| ProcessingError::missing_column(name))?;

        let placeholder = Column::new(name, ColumnType::Text, Vec::new());
        let column = std::mem::replace(&mut self.columns[idx], placeholder);
        let transformed = f(column)?;

        if transformed.len() != self.height {
            return Err(ProcessingError::InvalidFormat(format!(
                "Transformed column '{}' changed height",
                name
            )));
        }
        self.columns[idx] = transformed;
        Ok(())
    }

    /// Rename columns; pairs whose source column is absent are ignored.
    pub fn rename_columns(mut self, mapping: &[(&str, &str)]) -> Self {
        for column in &mut self.columns {
            if let Some((_, target)) = mapping.iter().find(|(source, _)| *source == column.name()) {
                column.name = (*target).to_string();
            }
        }
        self
    }

    /// Drop columns by name; absent names are ignored.
    pub fn drop_columns<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.columns
            .retain(|c| !names.iter().any(|n| n.as_ref() == c.name()));
        self
    }

    /// Keep only the rows where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.filter(mask)).collect(),
            height: mask.iter().take(self.height).filter(|keep| **keep).count(),
        }
    }

    /// Row mask built from a predicate over one column.
    pub fn mask<F>(&self, name: &str, predicate: F) -> Result<Vec<bool>>
    where
        F: Fn(&Value) -> bool,
    {
        Ok(self
            .require_column(name)?
            .values()
            .iter()
            .map(predicate)
            .collect())
    }

    /// Discard every row holding a null in any column.
    pub fn drop_nulls(&self) -> Table {
        let mask: Vec<bool> = (0..self.height)
            .map(|row| self.columns.iter().all(|c| !c.values[row].is_null()))
            .collect();
        self.filter(&mask)
    }

    /// Gather rows by index; `None` produces an all-null row.
    pub fn take(&self, indices: &[Option<usize>]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            height: indices.len(),
        }
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Table {
        self.filter(&[])
    }
}
