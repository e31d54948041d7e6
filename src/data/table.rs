use crate::errors::TableError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single cell of an observation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Category(String),
    Missing,
}

impl Value {
    /// Try to get the value as a category label
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Value::Category(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Category(s) => write!(f, "{}", s),
            Value::Missing => write!(f, ""),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Category(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Row-oriented table of independent observations with named columns.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl ObservationTable {
    /// Create an empty table with the given column names
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Result<Self, TableError> {
        let mut table = ObservationTable::default();
        for column in columns {
            let name = column.as_ref().to_string();
            if table.index.contains_key(&name) {
                return Err(TableError::DuplicateColumn(name));
            }
            table.index.insert(name.clone(), table.columns.len());
            table.columns.push(name);
        }
        Ok(table)
    }

    /// Build a table from column names and rows in one go
    pub fn from_rows<S: AsRef<str>>(
        columns: &[S],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowLength {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Get the cell at `row` in `column`
    pub fn value(&self, row: usize, column: &str) -> Result<&Value, TableError> {
        let col = self.column_index(column)?;
        self.rows
            .get(row)
            .map(|r| &r[col])
            .ok_or(TableError::RowOutOfRange(row))
    }

    /// Iterate over every cell of a column, in row order
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, TableError> {
        let col = self.column_index(name)?;
        Ok(self.rows.iter().map(move |r| &r[col]))
    }

    /// Read a column as category labels. Missing cells come back as `None`.
    pub fn categorical(&self, name: &str) -> Result<Vec<Option<&str>>, TableError> {
        self.column(name)?
            .enumerate()
            .map(|(row, value)| match value {
                Value::Category(s) => Ok(Some(s.as_str())),
                Value::Missing => Ok(None),
                Value::Number(_) => Err(TableError::NotCategorical {
                    column: name.to_string(),
                    row,
                }),
            })
            .collect()
    }

    /// Read a column as numbers. Missing cells come back as `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        self.column(name)?
            .enumerate()
            .map(|(row, value)| match value {
                Value::Number(n) => Ok(Some(*n)),
                Value::Missing => Ok(None),
                Value::Category(s) => Err(TableError::NotNumeric {
                    column: name.to_string(),
                    row,
                    value: s.clone(),
                }),
            })
            .collect()
    }

    /// Add a column, or replace it if one with the same name exists
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Result<Self, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        match self.index.get(name).copied() {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.index.insert(name.to_string(), self.columns.len());
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(self)
    }

    /// Remove every row whose cell in `column` is missing
    pub fn drop_missing(mut self, column: &str) -> Result<Self, TableError> {
        let col = self.column_index(column)?;
        self.rows.retain(|row| !row[col].is_missing());
        Ok(self)
    }
}
