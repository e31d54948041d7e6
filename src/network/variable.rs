use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete random variable with an ordered list of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: usize,
    pub name: String,
    pub values: Vec<String>,
}

impl Variable {
    pub fn new<S: AsRef<str>>(id: usize, name: &str, values: &[S]) -> Self {
        Variable {
            id,
            name: name.to_string(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }

    pub fn value_index(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.id, self.name, self.values.join(","))
    }
}

/// A network node: a variable and its conditional probability table.
///
/// `probabilities` is laid out row-major over the parent values (parents
/// ordered by ascending id), with this node's own values varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BbnNode {
    pub variable: Variable,
    pub probabilities: Vec<f64>,
}

impl BbnNode {
    pub fn new(variable: Variable, probabilities: Vec<f64>) -> Self {
        BbnNode {
            variable,
            probabilities,
        }
    }

    pub fn id(&self) -> usize {
        self.variable.id
    }

    pub fn name(&self) -> &str {
        &self.variable.name
    }
}

impl fmt::Display for BbnNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)
    }
}
