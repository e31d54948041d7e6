//! Evidence application and the JSON marginal report written by the binary.

use crate::common::setup::EvidenceArg;
use crate::errors::{ConfigError, NetworkError};
use crate::network::evidence::Evidence;
use crate::network::jointree::{JoinTree, Marginal};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Node name -> value -> probability
pub type Posteriors = BTreeMap<String, BTreeMap<String, f64>>;

/// Distribution of `target` under each possible value of `given`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub target: String,
    pub given: String,
    pub distributions: Posteriors,
}

impl QueryReport {
    pub fn new(target: &str, given: &str, rows: Vec<(String, Marginal)>) -> Self {
        QueryReport {
            target: target.to_string(),
            given: given.to_string(),
            distributions: rows
                .into_iter()
                .map(|(value, m)| (value, m.entries.into_iter().collect()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalReport {
    pub generated_at: DateTime<Utc>,
    pub data_file: String,
    pub rows: usize,
    pub prior: Posteriors,
    pub evidence: Vec<Evidence>,
    pub posterior: Posteriors,
    pub query: Option<QueryReport>,
}

impl MarginalReport {
    /// Snapshot the tree's current evidence and posteriors next to `prior`
    pub fn build(
        data_file: &str,
        rows: usize,
        prior: Posteriors,
        tree: &JoinTree,
        query: Option<QueryReport>,
    ) -> Result<Self, NetworkError> {
        Ok(MarginalReport {
            generated_at: Utc::now(),
            data_file: data_file.to_string(),
            rows,
            prior,
            evidence: tree.evidence().values().cloned().collect(),
            posterior: tree.get_posteriors()?,
            query,
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Marginal report saved to {}", path.display());
        Ok(())
    }
}

/// Apply each argument in order; stops at the first one the tree rejects
pub fn apply_evidence(
    tree: &mut JoinTree,
    args: &[EvidenceArg],
) -> Result<Vec<Evidence>, NetworkError> {
    let mut applied = Vec::with_capacity(args.len());
    for arg in args {
        let evidence = arg.to_evidence(tree.bbn())?;
        tree.set_observation(evidence.clone())?;
        info!("Applied evidence {}={} ({})", arg.node, arg.value, arg.likelihood);
        applied.push(evidence);
    }
    Ok(applied)
}
