use crate::data::table::{ObservationTable, Value};
use crate::errors::TableError;
use log::debug;
use serde::{Deserialize, Serialize};

/// Turns a numeric column into a two-category column by thresholding.
///
/// A value strictly greater than `threshold` becomes `"{label}>{threshold}"`,
/// anything else becomes `"{label}<={threshold}"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discretizer {
    pub source: String,
    pub target: String,
    pub label: String,
    pub threshold: f64,
}

impl Discretizer {
    pub fn new(source: &str, target: &str, label: &str, threshold: f64) -> Self {
        Discretizer {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
            threshold,
        }
    }

    pub fn above_label(&self) -> String {
        format!("{}>{}", self.label, self.threshold)
    }

    pub fn at_or_below_label(&self) -> String {
        format!("{}<={}", self.label, self.threshold)
    }

    /// Category for one cell; missing stays missing
    pub fn categorize(&self, value: Option<f64>) -> Value {
        match value {
            Some(x) if x > self.threshold => Value::Category(self.above_label()),
            Some(_) => Value::Category(self.at_or_below_label()),
            None => Value::Missing,
        }
    }

    pub fn apply(&self, table: ObservationTable) -> Result<ObservationTable, TableError> {
        let derived: Vec<Value> = table
            .numeric(&self.source)?
            .into_iter()
            .map(|v| self.categorize(v))
            .collect();
        debug!("Derived '{}' from '{}'", self.target, self.source);
        table.with_column(&self.target, derived)
    }
}

/// Apply every discretizer in order, returning the extended table
pub fn derive_columns(
    table: ObservationTable,
    discretizers: &[Discretizer],
) -> Result<ObservationTable, TableError> {
    discretizers.iter().try_fold(table, |table, d| d.apply(table))
}
