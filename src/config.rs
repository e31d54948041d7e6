//! Analysis configuration: which columns to read, which scores to
//! discretize, and how the network nodes map onto table columns.

use crate::data::derive::Discretizer;
use crate::data::loader::Schema;
use crate::data::table::ObservationTable;
use crate::errors::{ConfigError, TableError};
use crate::estimate::frequency::{estimate, CptRequest, MissingParentPolicy};
use crate::network::dag::Bbn;
use crate::network::variable::{BbnNode, Variable};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// One network node and the table column it is estimated from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: usize,
    pub name: String,
    pub column: String,
    /// Names of parent nodes
    #[serde(default)]
    pub parents: Vec<String>,
    /// Declared value order; observed categories, sorted, when absent
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl NodeConfig {
    pub fn new(id: usize, name: &str, column: &str, parents: &[&str]) -> Self {
        NodeConfig {
            id,
            name: name.to_string(),
            column: column.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            values: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Rows with an empty cell in any of these columns are dropped
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub discretizers: Vec<Discretizer>,
    pub nodes: Vec<NodeConfig>,
}

impl Default for AnalysisConfig {
    /// The student performance network: gender drives math and writing
    /// scores, writing drives reading.
    fn default() -> Self {
        AnalysisConfig {
            required_columns: vec!["gender".to_string()],
            numeric_columns: vec![
                "math score".to_string(),
                "writing score".to_string(),
                "reading score".to_string(),
            ],
            discretizers: vec![
                Discretizer::new("math score", "MathScoreNew", "MathScore", 80.0),
                Discretizer::new("writing score", "WritingScoreNew", "WritingScore", 80.0),
                Discretizer::new("reading score", "ReadingScoreNew", "ReadingScore", 80.0),
            ],
            nodes: vec![
                NodeConfig::new(0, "Gender", "gender", &[]),
                NodeConfig::new(1, "MathScore", "MathScoreNew", &["Gender"]),
                NodeConfig::new(2, "WritingScore", "WritingScoreNew", &["Gender"]),
                NodeConfig::new(3, "ReadingScore", "ReadingScoreNew", &["WritingScore"]),
            ],
        }
    }
}

impl AnalysisConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Reading analysis configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Schema for loading the input file under this configuration
    pub fn schema(&self, delimiter: u8) -> Schema {
        let mut schema = Schema::new().delimiter(delimiter);
        for column in &self.required_columns {
            schema = schema.drop_missing(column);
        }
        for column in &self.numeric_columns {
            schema = schema.numeric(column);
        }
        for d in &self.discretizers {
            if !self.numeric_columns.contains(&d.source) {
                schema = schema.numeric(&d.source);
            }
        }
        schema
    }

    /// Check node ids, names and parent references
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::Invalid("no nodes configured".to_string()));
        }
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id) {
                return Err(ConfigError::Invalid(format!("duplicate node id {}", node.id)));
            }
            if !names.insert(node.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
        }
        for node in &self.nodes {
            for parent in &node.parents {
                if !names.contains(parent.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "node '{}' has unknown parent '{}'",
                        node.name, parent
                    )));
                }
            }
        }
        for d in &self.discretizers {
            if d.source.is_empty() || d.target.is_empty() {
                return Err(ConfigError::Invalid(
                    "discretizer needs a source and a target column".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Estimate every node's CPT from `table` and assemble the network.
///
/// Parents are passed to the estimator in ascending node id order, which is
/// the layout network nodes expect.
pub fn build_network(
    table: &ObservationTable,
    config: &AnalysisConfig,
    policy: MissingParentPolicy,
) -> Result<Bbn, ConfigError> {
    config.validate()?;
    for node in &config.nodes {
        if !table.has_column(&node.column) {
            return Err(TableError::MissingColumn(node.column.clone()).into());
        }
    }
    let by_name: BTreeMap<&str, &NodeConfig> =
        config.nodes.iter().map(|n| (n.name.as_str(), n)).collect();

    // Value order of every node first, so parents can be declared to the estimator
    let mut values: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for node in &config.nodes {
        let cpt = estimate(
            table,
            &CptRequest {
                child: &node.column,
                parents: Vec::new(),
                child_states: node.values.clone(),
                parent_states: Vec::new(),
                missing_parent: policy,
            },
        )?;
        values.insert(node.id, cpt.child_states);
    }

    let mut bbn = Bbn::new();
    let mut edges = Vec::new();
    for node in &config.nodes {
        let mut parents: Vec<&NodeConfig> = node
            .parents
            .iter()
            .filter_map(|p| by_name.get(p.as_str()).copied())
            .collect();
        parents.sort_by_key(|p| p.id);

        let mut request = CptRequest::new(&node.column)
            .with_child_states(values[&node.id].clone())
            .with_policy(policy);
        for parent in &parents {
            request = request.with_declared_parent(&parent.column, values[&parent.id].clone());
            edges.push((parent.id, node.id));
        }
        let cpt = estimate(table, &request)?;
        debug!(
            "CPT for {}: {} rows over {:?}",
            node.name,
            cpt.row_count(),
            cpt.child_states
        );

        let variable = Variable::new(node.id, &node.name, &values[&node.id]);
        bbn = bbn.add_node(BbnNode::new(variable, cpt.into_probabilities()))?;
    }
    for (parent, child) in edges {
        bbn = bbn.add_edge(parent, child)?;
    }
    bbn.validate()?;
    info!(
        "Built network with {} nodes and {} edges",
        bbn.len(),
        bbn.edges().len()
    );
    Ok(bbn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_student_network() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.nodes.len(), 4);
        assert_eq!(config.nodes[3].parents, vec!["WritingScore".to_string()]);

        let schema = config.schema(b',');
        assert_eq!(schema.drop_missing, vec!["gender".to_string()]);
        assert_eq!(schema.columns.len(), 3);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let json = serde_json::to_string(&AnalysisConfig::default()).unwrap();
        let parsed = AnalysisConfig::from_json(&json).unwrap();
        assert_eq!(parsed, AnalysisConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        let json = r#"{"nodes": [
            {"id": 0, "name": "A", "column": "a"},
            {"id": 1, "name": "B", "column": "b", "parents": ["C"]}
        ]}"#;
        assert!(matches!(AnalysisConfig::from_json(json), Err(ConfigError::Invalid(_))));

        let json = r#"{"nodes": [
            {"id": 0, "name": "A", "column": "a"},
            {"id": 0, "name": "B", "column": "b"}
        ]}"#;
        assert!(matches!(AnalysisConfig::from_json(json), Err(ConfigError::Invalid(_))));

        assert!(matches!(
            AnalysisConfig::from_json(r#"{"nodes": []}"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
