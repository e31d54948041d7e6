use crate::errors::NetworkError;
use crate::network::variable::BbnNode;
use serde::{Deserialize, Serialize};

/// How supplied likelihoods are turned into a likelihood vector
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    /// Hard evidence: the value with the highest likelihood is certain
    #[default]
    Observation,
    /// Soft evidence: likelihoods are used as given
    Virtual,
    /// Every named value is possible, every other value is ruled out
    Finding,
}

/// Evidence on a single node, stored as one likelihood per node value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub node_id: usize,
    pub node_name: String,
    pub kind: EvidenceType,
    pub likelihoods: Vec<f64>,
}

impl Evidence {
    /// The value asserted by hard evidence, if any
    pub fn observed_index(&self) -> Option<usize> {
        if self.kind != EvidenceType::Observation {
            return None;
        }
        self.likelihoods.iter().position(|&l| l == 1.0)
    }
}

/// Builds [`Evidence`] for a node from `(value, likelihood)` pairs.
///
/// ```
/// use scorebayes::network::{EvidenceBuilder, Variable, BbnNode};
///
/// let gender = BbnNode::new(Variable::new(0, "Gender", &["female", "male"]), vec![0.5, 0.5]);
/// let evidence = EvidenceBuilder::new()
///     .with_node(&gender)
///     .with_evidence("female", 1.0)
///     .build()
///     .unwrap();
/// assert_eq!(evidence.likelihoods, vec![1.0, 0.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EvidenceBuilder {
    node: Option<BbnNode>,
    kind: EvidenceType,
    values: Vec<(String, f64)>,
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        EvidenceBuilder::default()
    }

    pub fn with_node(mut self, node: &BbnNode) -> Self {
        self.node = Some(node.clone());
        self
    }

    pub fn with_type(mut self, kind: EvidenceType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_evidence(mut self, value: &str, likelihood: f64) -> Self {
        self.values.push((value.to_string(), likelihood));
        self
    }

    pub fn build(self) -> Result<Evidence, NetworkError> {
        let node = self
            .node
            .ok_or_else(|| NetworkError::InvalidEvidence("no node given".to_string()))?;
        if self.values.is_empty() {
            return Err(NetworkError::InvalidEvidence(format!(
                "no values given for '{}'",
                node.name()
            )));
        }

        let mut supplied = vec![0.0; node.variable.cardinality()];
        for (value, likelihood) in &self.values {
            let index = node.variable.value_index(value).ok_or_else(|| {
                NetworkError::InvalidEvidence(format!(
                    "'{}' is not a value of '{}'",
                    value,
                    node.name()
                ))
            })?;
            if !(0.0..=1.0).contains(likelihood) {
                return Err(NetworkError::InvalidEvidence(format!(
                    "likelihood {} for '{}' is outside [0, 1]",
                    likelihood, value
                )));
            }
            supplied[index] = *likelihood;
        }
        if supplied.iter().all(|&l| l == 0.0) {
            return Err(NetworkError::InvalidEvidence(format!(
                "all likelihoods for '{}' are zero",
                node.name()
            )));
        }

        let likelihoods = match self.kind {
            EvidenceType::Virtual => supplied,
            EvidenceType::Finding => supplied
                .iter()
                .map(|&l| if l > 0.0 { 1.0 } else { 0.0 })
                .collect(),
            EvidenceType::Observation => {
                let mut best = 0;
                for (i, &l) in supplied.iter().enumerate() {
                    if l > supplied[best] {
                        best = i;
                    }
                }
                (0..supplied.len())
                    .map(|i| if i == best { 1.0 } else { 0.0 })
                    .collect()
            }
        };

        Ok(Evidence {
            node_id: node.id(),
            node_name: node.name().to_string(),
            kind: self.kind,
            likelihoods,
        })
    }
}
