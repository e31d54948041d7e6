//! Empirical conditional probability tables.
//!
//! Counts how often each child category occurs, optionally split by the
//! categories of one or more parent columns, and normalizes the counts into
//! the flat row-major layout a discrete network node expects: one row per
//! parent combination, one column per child category.

use crate::data::table::ObservationTable;
use crate::errors::EstimateError;
use clap::ValueEnum;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// What to do with a parent combination that has no rows in the table
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingParentPolicy {
    /// Refuse to build the table
    #[default]
    Fail,
    /// Give every child category the same probability in that row
    Uniform,
}

/// Describes which conditional distribution to estimate.
#[derive(Clone, Debug)]
pub struct CptRequest<'a> {
    pub child: &'a str,
    pub parents: Vec<&'a str>,
    /// Declared child category order. Observed categories, sorted, if absent.
    pub child_states: Option<Vec<String>>,
    /// Declared category order per parent, aligned with `parents`.
    pub parent_states: Vec<Option<Vec<String>>>,
    pub missing_parent: MissingParentPolicy,
}

impl<'a> CptRequest<'a> {
    pub fn new(child: &'a str) -> Self {
        CptRequest {
            child,
            parents: Vec::new(),
            child_states: None,
            parent_states: Vec::new(),
            missing_parent: MissingParentPolicy::default(),
        }
    }

    pub fn with_parent(mut self, parent: &'a str) -> Self {
        self.parents.push(parent);
        self.parent_states.push(None);
        self
    }

    pub fn with_declared_parent(mut self, parent: &'a str, states: Vec<String>) -> Self {
        self.parents.push(parent);
        self.parent_states.push(Some(states));
        self
    }

    pub fn with_child_states(mut self, states: Vec<String>) -> Self {
        self.child_states = Some(states);
        self
    }

    pub fn with_policy(mut self, policy: MissingParentPolicy) -> Self {
        self.missing_parent = policy;
        self
    }
}

/// An estimated conditional probability table.
///
/// `probabilities` is row-major: parent combinations vary slowest-first in
/// `parents` order, child categories vary fastest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cpt {
    pub child: String,
    pub parents: Vec<String>,
    pub child_states: Vec<String>,
    pub parent_states: Vec<Vec<String>>,
    pub probabilities: Vec<f64>,
}

impl Cpt {
    pub fn row_count(&self) -> usize {
        self.parent_states.iter().map(|s| s.len()).product()
    }

    /// One slice of child probabilities per parent combination
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.probabilities.chunks(self.child_states.len())
    }

    /// Labels of every parent combination, in row order
    pub fn row_labels(&self) -> Vec<Vec<&str>> {
        combinations(&self.parent_states)
    }

    /// Look up P(child = `child_value` | parents = `parent_values`)
    pub fn get(&self, parent_values: &[&str], child_value: &str) -> Option<f64> {
        if parent_values.len() != self.parents.len() {
            return None;
        }
        let mut row = 0;
        for (value, states) in parent_values.iter().zip(&self.parent_states) {
            row = row * states.len() + states.iter().position(|s| s == value)?;
        }
        let col = self.child_states.iter().position(|s| s == child_value)?;
        self.probabilities.get(row * self.child_states.len() + col).copied()
    }

    pub fn into_probabilities(self) -> Vec<f64> {
        self.probabilities
    }
}

/// Empirical distribution of `child`, optionally conditioned on a single `parent`.
///
/// Categories come out in ascending lexicographic order. With a parent the
/// result holds one block of child probabilities per parent category.
pub fn probability(
    table: &ObservationTable,
    child: &str,
    parent: Option<&str>,
) -> Result<Vec<f64>, EstimateError> {
    let request = match parent {
        None => CptRequest::new(child),
        Some(p) => CptRequest::new(child).with_parent(p),
    };
    estimate(table, &request).map(Cpt::into_probabilities)
}

/// Estimate a conditional probability table from observed frequencies.
///
/// Any number of parents is supported by treating their combination as one
/// joint category.
pub fn estimate(table: &ObservationTable, request: &CptRequest) -> Result<Cpt, EstimateError> {
    validate_request(table, request)?;

    let child_values = present_values(table, request.child)?;
    let child_states = resolve_states(request.child, &child_values, request.child_states.as_ref())?;
    let child_index = index_of(&child_states);

    let mut parent_values = Vec::with_capacity(request.parents.len());
    let mut parent_states = Vec::with_capacity(request.parents.len());
    for (parent, declared) in request.parents.iter().zip(&request.parent_states) {
        let values = present_values(table, parent)?;
        parent_states.push(resolve_states(parent, &values, declared.as_ref())?);
        parent_values.push(values);
    }
    let parent_indices: Vec<HashMap<&str, usize>> =
        parent_states.iter().map(|s| index_of(s)).collect();

    let width = child_states.len();
    let row_count: usize = parent_states.iter().map(|s| s.len()).product();
    let mut counts = vec![0usize; row_count * width];

    for (i, child_value) in child_values.iter().enumerate() {
        let mut row = 0;
        for (values, (index, states)) in parent_values
            .iter()
            .zip(parent_indices.iter().zip(&parent_states))
        {
            row = row * states.len() + index[values[i]];
        }
        counts[row * width + child_index[child_value]] += 1;
    }

    let labels = combinations(&parent_states);
    let mut probabilities = Vec::with_capacity(counts.len());
    for (row, block) in counts.chunks(width).enumerate() {
        let total: usize = block.iter().sum();
        if total == 0 {
            let combination = labels[row].join(",");
            match request.missing_parent {
                MissingParentPolicy::Fail => {
                    return Err(EstimateError::UnobservedParentCategory { combination });
                }
                MissingParentPolicy::Uniform => {
                    debug!(
                        "No rows for {}={}, using a uniform row",
                        request.parents.join(","),
                        combination
                    );
                    probabilities.extend(std::iter::repeat_n(1.0 / width as f64, width));
                }
            }
        } else {
            trace!("row {} counts {:?} of {}", row, block, total);
            probabilities.extend(block.iter().map(|&c| c as f64 / total as f64));
        }
    }

    debug!(
        "Estimated P({} | {}) with {} rows x {} states from {} observations",
        request.child,
        request.parents.join(","),
        row_count,
        width,
        table.len()
    );

    Ok(Cpt {
        child: request.child.to_string(),
        parents: request.parents.iter().map(|p| p.to_string()).collect(),
        child_states,
        parent_states,
        probabilities,
    })
}

fn validate_request(table: &ObservationTable, request: &CptRequest) -> Result<(), EstimateError> {
    if request.child.is_empty() {
        return Err(EstimateError::InvalidArgument(
            "child column name is empty".to_string(),
        ));
    }
    if request.parents.len() != request.parent_states.len() {
        return Err(EstimateError::InvalidArgument(format!(
            "{} parents but {} parent state lists",
            request.parents.len(),
            request.parent_states.len()
        )));
    }
    let mut seen = HashSet::new();
    for parent in &request.parents {
        if parent.is_empty() {
            return Err(EstimateError::InvalidArgument(
                "parent column name is empty".to_string(),
            ));
        }
        if *parent == request.child {
            return Err(EstimateError::InvalidArgument(format!(
                "column '{}' cannot be its own parent",
                parent
            )));
        }
        if !seen.insert(*parent) {
            return Err(EstimateError::InvalidArgument(format!(
                "parent '{}' given more than once",
                parent
            )));
        }
    }
    if table.is_empty() {
        return Err(EstimateError::InvalidArgument(format!(
            "cannot estimate '{}' from an empty table",
            request.child
        )));
    }
    Ok(())
}

fn present_values<'t>(table: &'t ObservationTable, column: &str) -> Result<Vec<&'t str>, EstimateError> {
    table
        .categorical(column)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| EstimateError::MissingValue {
                column: column.to_string(),
                row,
            })
        })
        .collect()
}

fn resolve_states(
    column: &str,
    observed: &[&str],
    declared: Option<&Vec<String>>,
) -> Result<Vec<String>, EstimateError> {
    let Some(declared) = declared else {
        let sorted: BTreeSet<&str> = observed.iter().copied().collect();
        return Ok(sorted.into_iter().map(|s| s.to_string()).collect());
    };

    if declared.is_empty() {
        return Err(EstimateError::InvalidArgument(format!(
            "no states declared for '{}'",
            column
        )));
    }
    let unique: HashSet<&str> = declared.iter().map(|s| s.as_str()).collect();
    if unique.len() != declared.len() {
        return Err(EstimateError::InvalidArgument(format!(
            "duplicate states declared for '{}'",
            column
        )));
    }
    if let Some(unknown) = observed.iter().find(|v| !unique.contains(**v)) {
        return Err(EstimateError::UnknownCategory {
            column: column.to_string(),
            category: unknown.to_string(),
        });
    }
    Ok(declared.clone())
}

fn index_of(states: &[String]) -> HashMap<&str, usize> {
    states.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect()
}

/// Cartesian product of state lists, first list varying slowest
fn combinations(states: &[Vec<String>]) -> Vec<Vec<&str>> {
    states.iter().fold(vec![Vec::new()], |acc, list| {
        acc.iter()
            .flat_map(|prefix| {
                list.iter().map(move |s| {
                    let mut next = prefix.clone();
                    next.push(s.as_str());
                    next
                })
            })
            .collect()
    })
}
