use crate::data::table::{ObservationTable, Value};
use crate::errors::TableError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// How a declared column is parsed
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

/// Columns the input file must provide, plus the rows to reject up front.
///
/// Undeclared columns are kept as categorical text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
    /// Rows with an empty cell in any of these columns are dropped on load
    #[serde(default)]
    pub drop_missing: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,
}

fn default_delimiter() -> u8 {
    b','
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new()
    }
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            columns: Vec::new(),
            drop_missing: Vec::new(),
            delimiter: default_delimiter(),
        }
    }

    pub fn categorical(mut self, name: &str) -> Self {
        self.columns.push(ColumnSpec {
            name: name.to_string(),
            kind: ColumnKind::Categorical,
        });
        self
    }

    pub fn numeric(mut self, name: &str) -> Self {
        self.columns.push(ColumnSpec {
            name: name.to_string(),
            kind: ColumnKind::Numeric,
        });
        self
    }

    pub fn drop_missing(mut self, name: &str) -> Self {
        self.drop_missing.push(name.to_string());
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn kind_of(&self, name: &str) -> ColumnKind {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
            .unwrap_or(ColumnKind::Categorical)
    }
}

/// Load a headered delimited file from disk
pub fn load_csv<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<ObservationTable, TableError> {
    let path = path.as_ref();
    info!("Loading observations from {}", path.display());
    let file = File::open(path)?;
    read_csv(file, schema)
}

/// Parse a headered delimited stream into an observation table
pub fn read_csv<R: Read>(reader: R, schema: &Schema) -> Result<ObservationTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(schema.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let present: HashSet<&str> = headers.iter().map(|h| h.as_str()).collect();
    for spec in &schema.columns {
        if !present.contains(spec.name.as_str()) {
            return Err(TableError::MissingColumn(spec.name.clone()));
        }
    }
    for name in &schema.drop_missing {
        if !present.contains(name.as_str()) {
            return Err(TableError::MissingColumn(name.clone()));
        }
    }

    let kinds: Vec<ColumnKind> = headers.iter().map(|h| schema.kind_of(h)).collect();
    let mut table = ObservationTable::new(&headers)?;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let mut values = Vec::with_capacity(headers.len());
        for ((cell, kind), column) in record.iter().zip(&kinds).zip(&headers) {
            values.push(parse_cell(cell, *kind, column, row)?);
        }
        table.push_row(values)?;
    }
    let loaded = table.len();

    for name in &schema.drop_missing {
        table = table.drop_missing(name)?;
    }
    if loaded != table.len() {
        debug!("Dropped {} rows with missing values", loaded - table.len());
    }
    info!("Loaded {} rows with {} columns", table.len(), headers.len());
    Ok(table)
}

fn parse_cell(cell: &str, kind: ColumnKind, column: &str, row: usize) -> Result<Value, TableError> {
    if cell.is_empty() {
        return Ok(Value::Missing);
    }
    match kind {
        ColumnKind::Categorical => Ok(Value::Category(cell.to_string())),
        ColumnKind::Numeric => cell
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| TableError::NotNumeric {
                column: column.to_string(),
                row,
                value: cell.to_string(),
            }),
    }
}
