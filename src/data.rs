//! Data
//!
//! Columnar table used as input and output throughout the crate.
//!
//! A `Table` stores each column as its own typed vector, so selecting columns and
//! slicing rows never needs to reinterpret a contiguous buffer. Missing values are
//! encoded per column type: `NaN` for continuous columns and `None` for the others.
use crate::errors::MonitorError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The typed values of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    /// Real valued data, `NaN` marks a missing value.
    Continuous(Vec<f64>),
    Integer(Vec<Option<i64>>),
    Categorical(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    Boolean(Vec<Option<bool>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Continuous(v) => v.len(),
            ColumnValues::Integer(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
            ColumnValues::Timestamp(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the value type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnValues::Continuous(_) => "continuous",
            ColumnValues::Integer(_) => "integer",
            ColumnValues::Categorical(_) => "categorical",
            ColumnValues::Timestamp(_) => "timestamp",
            ColumnValues::Boolean(_) => "boolean",
        }
    }

    /// Rows `start..end` of the column.
    pub fn slice(&self, start: usize, end: usize) -> ColumnValues {
        match self {
            ColumnValues::Continuous(v) => ColumnValues::Continuous(v[start..end].to_vec()),
            ColumnValues::Integer(v) => ColumnValues::Integer(v[start..end].to_vec()),
            ColumnValues::Categorical(v) => ColumnValues::Categorical(v[start..end].to_vec()),
            ColumnValues::Timestamp(v) => ColumnValues::Timestamp(v[start..end].to_vec()),
            ColumnValues::Boolean(v) => ColumnValues::Boolean(v[start..end].to_vec()),
        }
    }

    /// Gather the given rows, in the order of `indices`.
    pub fn take(&self, indices: &[usize]) -> ColumnValues {
        match self {
            ColumnValues::Continuous(v) => ColumnValues::Continuous(indices.iter().map(|&i| v[i]).collect()),
            ColumnValues::Integer(v) => ColumnValues::Integer(indices.iter().map(|&i| v[i]).collect()),
            ColumnValues::Categorical(v) => ColumnValues::Categorical(indices.iter().map(|&i| v[i].clone()).collect()),
            ColumnValues::Timestamp(v) => ColumnValues::Timestamp(indices.iter().map(|&i| v[i]).collect()),
            ColumnValues::Boolean(v) => ColumnValues::Boolean(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    /// Values as floats, if the column holds numbers. Missing values become `NaN`.
    pub fn as_f64(&self) -> Option<Vec<f64>> {
        match self {
            ColumnValues::Continuous(v) => Some(v.clone()),
            ColumnValues::Integer(v) => Some(v.iter().map(|x| x.map_or(f64::NAN, |x| x as f64)).collect()),
            ColumnValues::Boolean(v) => Some(
                v.iter()
                    .map(|x| x.map_or(f64::NAN, |x| if x { 1.0 } else { 0.0 }))
                    .collect(),
            ),
            ColumnValues::Categorical(_) | ColumnValues::Timestamp(_) => None,
        }
    }

    /// Values as category labels. Timestamps have no categorical reading.
    pub fn as_labels(&self) -> Option<Vec<Option<String>>> {
        match self {
            ColumnValues::Categorical(v) => Some(v.clone()),
            ColumnValues::Integer(v) => Some(v.iter().map(|x| x.map(|x| x.to_string())).collect()),
            ColumnValues::Boolean(v) => Some(v.iter().map(|x| x.map(|x| x.to_string())).collect()),
            ColumnValues::Continuous(v) => Some(
                v.iter()
                    .map(|x| if x.is_nan() { None } else { Some(x.to_string()) })
                    .collect(),
            ),
            ColumnValues::Timestamp(_) => None,
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn continuous(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column::new(name, ColumnValues::Continuous(values))
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Column::new(
            name,
            ColumnValues::Categorical(values.into_iter().map(|v| Some(v.into())).collect()),
        )
    }

    pub fn timestamp(name: impl Into<String>, values: Vec<NaiveDateTime>) -> Self {
        Column::new(name, ColumnValues::Timestamp(values.into_iter().map(Some).collect()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columnar table of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Create a new table, validating that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self, MonitorError> {
        let mut table = Table::default();
        for c in columns {
            table.push_column(c)?;
        }
        Ok(table)
    }

    /// Number of rows, zero for a table without columns.
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// A table is empty when it holds no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get a column, failing with `MissingColumn` if it is absent.
    pub fn require(&self, name: &str) -> Result<&Column, MonitorError> {
        self.column(name)
            .ok_or_else(|| MonitorError::MissingColumn(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Append a column.
    pub fn push_column(&mut self, column: Column) -> Result<(), MonitorError> {
        if self.contains(&column.name) {
            return Err(MonitorError::InvalidArguments(format!(
                "column {} appears more than once",
                column.name
            )));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(MonitorError::InvalidArguments(format!(
                "column {} has {} rows, expected {}",
                column.name,
                column.len(),
                self.n_rows()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Builder style version of `push_column`.
    pub fn with_column(mut self, column: Column) -> Result<Self, MonitorError> {
        self.push_column(column)?;
        Ok(self)
    }

    /// Keep only the listed columns that are present, preserving table order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let columns = self
            .columns
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name))
            .cloned()
            .collect();
        Table { columns }
    }

    /// Rows `start..end` of every column.
    pub fn slice(&self, start: usize, end: usize) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.values.slice(start, end)))
            .collect();
        Table { columns }
    }

    /// Gather the given rows of every column.
    pub fn take(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.values.take(indices)))
            .collect();
        Table { columns }
    }

    /// Copy column `from` under the name `to`, replacing any existing `to` column.
    pub fn copy_column(&mut self, from: &str, to: &str) -> Result<(), MonitorError> {
        let values = self.require(from)?.values.clone();
        self.columns.retain(|c| c.name != to);
        self.columns.push(Column::new(to, values));
        Ok(())
    }
}
