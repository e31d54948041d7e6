//! Junction tree over the cliques of a triangulated moral graph.
//!
//! Potentials are kept in HUGIN form: after propagation every clique holds
//! the joint probability of its nodes and the evidence, and every sepset the
//! marginal shared by its two cliques.

use crate::errors::NetworkError;
use crate::network::dag::Bbn;
use crate::network::evidence::{Evidence, EvidenceBuilder};
use crate::network::potential::Potential;
use crate::network::variable::BbnNode;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clique {
    pub id: usize,
    pub nodes: BTreeSet<usize>,
}

/// Link between two cliques, holding the nodes they share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SepSet {
    pub id: usize,
    pub left: usize,
    pub right: usize,
    pub nodes: BTreeSet<usize>,
}

/// Normalized distribution of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marginal {
    pub node_id: usize,
    pub node_name: String,
    pub entries: Vec<(String, f64)>,
}

impl Marginal {
    pub fn probability(&self, value: &str) -> Option<f64> {
        self.entries.iter().find(|(v, _)| v == value).map(|(_, p)| *p)
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, p)| *p).collect()
    }
}

impl fmt::Display for Marginal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|(value, p)| format!("{}={}|{:.5}", self.node_id, value, p))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// A compiled network ready for exact marginal queries
#[derive(Debug, Clone)]
pub struct JoinTree {
    bbn: Bbn,
    cliques: Vec<Clique>,
    sepsets: Vec<SepSet>,
    /// Per clique: `(sepset, neighboring clique)`
    neighbors: Vec<Vec<(usize, usize)>>,
    clique_potentials: Vec<Potential>,
    sepset_potentials: Vec<Potential>,
    evidence: BTreeMap<usize, Evidence>,
}

impl JoinTree {
    /// Assemble a tree from cliques and the clique pairs that are linked.
    ///
    /// Potentials are not valid until [`JoinTree::propagate`] has run.
    pub(crate) fn from_parts(
        bbn: Bbn,
        cliques: Vec<BTreeSet<usize>>,
        links: Vec<(usize, usize)>,
    ) -> Result<Self, NetworkError> {
        let cliques: Vec<Clique> = cliques
            .into_iter()
            .enumerate()
            .map(|(id, nodes)| Clique { id, nodes })
            .collect();
        if !cliques.is_empty() && links.len() + 1 != cliques.len() {
            return Err(NetworkError::Internal(format!(
                "{} cliques need {} links, got {}",
                cliques.len(),
                cliques.len() - 1,
                links.len()
            )));
        }

        let mut neighbors = vec![Vec::new(); cliques.len()];
        let mut sepsets = Vec::with_capacity(links.len());
        for (id, (left, right)) in links.into_iter().enumerate() {
            let (Some(l), Some(r)) = (cliques.get(left), cliques.get(right)) else {
                return Err(NetworkError::Internal(format!(
                    "link {} joins unknown cliques {} and {}",
                    id, left, right
                )));
            };
            let nodes = l.nodes.intersection(&r.nodes).copied().collect();
            neighbors[left].push((id, right));
            neighbors[right].push((id, left));
            sepsets.push(SepSet {
                id,
                left,
                right,
                nodes,
            });
        }

        let mut tree = JoinTree {
            bbn,
            cliques,
            sepsets,
            neighbors,
            clique_potentials: Vec::new(),
            sepset_potentials: Vec::new(),
            evidence: BTreeMap::new(),
        };
        tree.reset_potentials()?;
        Ok(tree)
    }

    pub fn bbn(&self) -> &Bbn {
        &self.bbn
    }

    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }

    pub fn sepsets(&self) -> &[SepSet] {
        &self.sepsets
    }

    pub fn get_bbn_nodes(&self) -> Vec<&BbnNode> {
        self.bbn.nodes().collect()
    }

    pub fn get_bbn_node(&self, id: usize) -> Result<&BbnNode, NetworkError> {
        self.bbn.node(id)
    }

    pub fn get_bbn_node_by_name(&self, name: &str) -> Result<&BbnNode, NetworkError> {
        self.bbn.node_by_name(name)
    }

    /// Evidence currently applied, keyed by node id
    pub fn evidence(&self) -> &BTreeMap<usize, Evidence> {
        &self.evidence
    }

    fn potential_over(&self, nodes: &BTreeSet<usize>) -> Result<Potential, NetworkError> {
        let scope: Vec<usize> = nodes.iter().copied().collect();
        let shape = scope
            .iter()
            .map(|&id| self.bbn.node(id).map(|n| n.variable.cardinality()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Potential::ones(scope, &shape))
    }

    fn reset_potentials(&mut self) -> Result<(), NetworkError> {
        self.clique_potentials = self
            .cliques
            .iter()
            .map(|c| self.potential_over(&c.nodes))
            .collect::<Result<_, _>>()?;
        self.sepset_potentials = self
            .sepsets
            .iter()
            .map(|s| self.potential_over(&s.nodes))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// First clique containing every node in `family`
    fn host_clique(&self, family: &BTreeSet<usize>) -> Result<usize, NetworkError> {
        self.cliques
            .iter()
            .find(|c| family.is_subset(&c.nodes))
            .map(|c| c.id)
            .ok_or_else(|| {
                NetworkError::Internal(format!("no clique contains family {:?}", family))
            })
    }

    /// Load CPTs and evidence likelihoods into fresh potentials
    fn initialize(&mut self) -> Result<(), NetworkError> {
        self.reset_potentials()?;
        let ids = self.bbn.node_ids();
        for &id in &ids {
            let parents = self.bbn.parents(id)?;
            let node = self.bbn.node(id)?;

            let mut scope = parents.clone();
            scope.push(id);
            let shape = scope
                .iter()
                .map(|&n| self.bbn.node(n).map(|v| v.variable.cardinality()))
                .collect::<Result<Vec<_>, _>>()?;
            let cpt = Potential::from_values(scope.clone(), &shape, node.probabilities.clone())?;

            let family: BTreeSet<usize> = scope.into_iter().collect();
            let host = self.host_clique(&family)?;
            trace!("CPT of node {} assigned to clique {}", id, host);
            self.clique_potentials[host].multiply_in(&cpt)?;
        }
        for &id in &ids {
            let Some(evidence) = self.evidence.get(&id) else {
                continue;
            };
            let cardinality = self.bbn.node(id)?.variable.cardinality();
            let likelihood =
                Potential::from_values(vec![id], &[cardinality], evidence.likelihoods.clone())?;
            let host = self.host_clique(&BTreeSet::from([id]))?;
            self.clique_potentials[host].multiply_in(&likelihood)?;
        }
        Ok(())
    }

    fn pass_message(&mut self, from: usize, sepset: usize, to: usize) -> Result<(), NetworkError> {
        trace!("message {} -> {} through sepset {}", from, to, sepset);
        let scope = self.sepset_potentials[sepset].scope().to_vec();
        let new = self.clique_potentials[from].marginalize(&scope)?;
        let old = std::mem::replace(&mut self.sepset_potentials[sepset], new);
        self.clique_potentials[to].absorb(&self.sepset_potentials[sepset], &old)
    }

    fn collect(&mut self, clique: usize, parent: Option<usize>) -> Result<(), NetworkError> {
        let links = self.neighbors[clique].clone();
        for (sepset, next) in links {
            if Some(next) == parent {
                continue;
            }
            self.collect(next, Some(clique))?;
            self.pass_message(next, sepset, clique)?;
        }
        Ok(())
    }

    fn distribute(&mut self, clique: usize, parent: Option<usize>) -> Result<(), NetworkError> {
        let links = self.neighbors[clique].clone();
        for (sepset, next) in links {
            if Some(next) == parent {
                continue;
            }
            self.pass_message(clique, sepset, next)?;
            self.distribute(next, Some(clique))?;
        }
        Ok(())
    }

    /// Rebuild all potentials from the CPTs and the current evidence
    pub(crate) fn propagate(&mut self) -> Result<(), NetworkError> {
        self.initialize()?;
        if self.cliques.is_empty() {
            return Ok(());
        }
        self.collect(0, None)?;
        self.distribute(0, None)?;
        let mass = self.clique_potentials[0].sum();
        debug!("Propagated evidence on {} nodes, P(e) = {:.6}", self.evidence.len(), mass);
        if mass <= 0.0 || !mass.is_finite() {
            return Err(NetworkError::InconsistentEvidence);
        }
        Ok(())
    }

    /// Marginal distribution of a node given the current evidence
    pub fn get_bbn_potential(&self, node_id: usize) -> Result<Marginal, NetworkError> {
        let node = self.bbn.node(node_id)?;
        let host = self
            .cliques
            .iter()
            .filter(|c| c.nodes.contains(&node_id))
            .min_by_key(|c| c.nodes.len())
            .ok_or_else(|| NetworkError::Internal(format!("node {} is in no clique", node_id)))?;
        let marginal = self.clique_potentials[host.id]
            .marginalize(&[node_id])?
            .normalized()?;
        Ok(Marginal {
            node_id,
            node_name: node.name().to_string(),
            entries: node
                .variable
                .values
                .iter()
                .cloned()
                .zip(marginal.values())
                .collect(),
        })
    }

    /// Every node's marginal, keyed by node name and then value
    pub fn get_posteriors(&self) -> Result<BTreeMap<String, BTreeMap<String, f64>>, NetworkError> {
        self.bbn
            .nodes()
            .map(|node| -> Result<(String, BTreeMap<String, f64>), NetworkError> {
                let marginal = self.get_bbn_potential(node.id())?;
                Ok((node.name().to_string(), marginal.entries.into_iter().collect()))
            })
            .collect()
    }

    /// Apply evidence on one node, replacing any evidence it already had.
    ///
    /// Evidence that is impossible under the model is rejected and the
    /// previous state is kept.
    pub fn set_observation(&mut self, evidence: Evidence) -> Result<(), NetworkError> {
        self.set_observations(vec![evidence])
    }

    pub fn set_observations(&mut self, evidence: Vec<Evidence>) -> Result<(), NetworkError> {
        for e in &evidence {
            let node = self.bbn.node(e.node_id)?;
            if e.likelihoods.len() != node.variable.cardinality() {
                return Err(NetworkError::InvalidEvidence(format!(
                    "'{}' has {} values, evidence has {} likelihoods",
                    node.name(),
                    node.variable.cardinality(),
                    e.likelihoods.len()
                )));
            }
        }
        let previous = self.evidence.clone();
        for e in evidence {
            debug!("Observing {} = {:?}", e.node_name, e.likelihoods);
            self.evidence.insert(e.node_id, e);
        }
        if let Err(err) = self.propagate() {
            self.evidence = previous;
            self.propagate()?;
            return Err(err);
        }
        Ok(())
    }

    /// Remove evidence from the given nodes
    pub fn unobserve(&mut self, node_ids: &[usize]) -> Result<(), NetworkError> {
        for id in node_ids {
            self.bbn.node(*id)?;
            self.evidence.remove(id);
        }
        self.propagate()
    }

    pub fn unobserve_all(&mut self) -> Result<(), NetworkError> {
        self.evidence.clear();
        self.propagate()
    }

    /// Distribution of `target` under each value of `given`, on top of the current evidence.
    ///
    /// Values of `given` that are impossible under the current evidence are skipped.
    pub fn conditional(
        &self,
        target: &str,
        given: &str,
    ) -> Result<Vec<(String, Marginal)>, NetworkError> {
        let target_id = self.bbn.node_by_name(target)?.id();
        let given_node = self.bbn.node_by_name(given)?.clone();
        let mut result = Vec::with_capacity(given_node.variable.cardinality());
        for value in &given_node.variable.values {
            let evidence = EvidenceBuilder::new()
                .with_node(&given_node)
                .with_evidence(value, 1.0)
                .build()?;
            let mut scratch = self.clone();
            match scratch.set_observation(evidence) {
                Ok(()) => result.push((value.clone(), scratch.get_bbn_potential(target_id)?)),
                Err(NetworkError::InconsistentEvidence) => {
                    debug!("{}={} is impossible under current evidence", given, value);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(result)
    }
}
