use crate::errors::NetworkError;
use crate::network::variable::BbnNode;
use log::debug;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeMap;

const ROW_TOLERANCE: f64 = 1e-6;

/// A directed acyclic Bayesian network over discrete variables.
///
/// Graph weights are node ids; `index` maps an id back to its graph index.
#[derive(Debug, Clone, Default)]
pub struct Bbn {
    nodes: BTreeMap<usize, BbnNode>,
    graph: DiGraph<usize, ()>,
    index: BTreeMap<usize, NodeIndex>,
}

impl Bbn {
    pub fn new() -> Self {
        Bbn::default()
    }

    pub fn add_node(mut self, node: BbnNode) -> Result<Self, NetworkError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(NetworkError::DuplicateNodeId(id));
        }
        if self.nodes.values().any(|n| n.name() == node.name()) {
            return Err(NetworkError::DuplicateNodeName(node.name().to_string()));
        }
        let idx = self.graph.add_node(id);
        self.index.insert(id, idx);
        self.nodes.insert(id, node);
        Ok(self)
    }

    fn graph_index(&self, id: usize) -> Result<NodeIndex, NetworkError> {
        self.index.get(&id).copied().ok_or(NetworkError::UnknownNode(id))
    }

    /// Add a directed edge `parent -> child`, rejecting anything that would form a cycle
    pub fn add_edge(mut self, parent: usize, child: usize) -> Result<Self, NetworkError> {
        let invalid = |reason: &str| NetworkError::InvalidEdge {
            parent,
            child,
            reason: reason.to_string(),
        };
        let from = self.graph_index(parent)?;
        let to = self.graph_index(child)?;
        if parent == child {
            return Err(invalid("self loop"));
        }
        if self.graph.find_edge(from, to).is_some() {
            return Err(invalid("duplicate edge"));
        }
        if has_path_connecting(&self.graph, to, from, None) {
            return Err(invalid("would create a cycle"));
        }
        self.graph.add_edge(from, to, ());
        Ok(self)
    }

    fn neighbors(&self, id: usize, direction: Direction) -> Result<Vec<usize>, NetworkError> {
        let idx = self.graph_index(id)?;
        let mut ids: Vec<usize> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n])
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = &BbnNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> Vec<usize> {
        self.nodes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> Result<&BbnNode, NetworkError> {
        self.nodes.get(&id).ok_or(NetworkError::UnknownNode(id))
    }

    pub fn node_by_name(&self, name: &str) -> Result<&BbnNode, NetworkError> {
        self.nodes
            .values()
            .find(|n| n.name() == name)
            .ok_or_else(|| NetworkError::UnknownNodeName(name.to_string()))
    }

    /// Parent ids, ascending
    pub fn parents(&self, id: usize) -> Result<Vec<usize>, NetworkError> {
        self.neighbors(id, Direction::Incoming)
    }

    pub fn children(&self, id: usize) -> Result<Vec<usize>, NetworkError> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// All `(parent, child)` pairs ordered by parent then child
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| (self.graph[e.source()], self.graph[e.target()]))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Node ids with every parent before its children
    pub fn topological_order(&self) -> Result<Vec<usize>, NetworkError> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx]).collect())
            .map_err(|cycle| NetworkError::Cycle(self.graph[cycle.node_id()]))
    }

    /// Check every CPT against the variable cardinalities and the edges
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.nodes.is_empty() {
            return Err(NetworkError::InvalidCpt {
                node: String::new(),
                reason: "network has no nodes".to_string(),
            });
        }
        self.topological_order()?;
        for node in self.nodes.values() {
            let invalid = |reason: String| NetworkError::InvalidCpt {
                node: node.name().to_string(),
                reason,
            };
            let width = node.variable.cardinality();
            if width == 0 {
                return Err(invalid("variable has no values".to_string()));
            }
            let rows: usize = self
                .parents(node.id())?
                .iter()
                .map(|p| self.nodes.get(p).map_or(0, |n| n.variable.cardinality()))
                .product();
            if node.probabilities.len() != rows * width {
                return Err(invalid(format!(
                    "expected {} probabilities ({} rows x {} values), got {}",
                    rows * width,
                    rows,
                    width,
                    node.probabilities.len()
                )));
            }
            for (row, block) in node.probabilities.chunks(width).enumerate() {
                if block.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err(invalid(format!("row {} has an invalid probability", row)));
                }
                let sum: f64 = block.iter().sum();
                if (sum - 1.0).abs() > ROW_TOLERANCE {
                    return Err(invalid(format!("row {} sums to {}", row, sum)));
                }
            }
        }
        debug!(
            "Validated network with {} nodes and {} edges",
            self.nodes.len(),
            self.edges().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::variable::Variable;

    fn node(id: usize, name: &str, probabilities: Vec<f64>) -> BbnNode {
        BbnNode::new(Variable::new(id, name, &["on", "off"]), probabilities)
    }

    fn chain() -> Bbn {
        Bbn::new()
            .add_node(node(0, "a", vec![0.5, 0.5]))
            .unwrap()
            .add_node(node(1, "b", vec![0.9, 0.1, 0.2, 0.8]))
            .unwrap()
            .add_node(node(2, "c", vec![0.3, 0.7, 0.6, 0.4]))
            .unwrap()
            .add_edge(0, 1)
            .unwrap()
            .add_edge(1, 2)
            .unwrap()
    }

    #[test]
    fn test_structure_queries() {
        let bbn = chain();
        assert_eq!(bbn.len(), 3);
        assert_eq!(bbn.parents(2).unwrap(), vec![1]);
        assert_eq!(bbn.children(0).unwrap(), vec![1]);
        assert_eq!(bbn.edges(), vec![(0, 1), (1, 2)]);
        assert_eq!(bbn.topological_order().unwrap(), vec![0, 1, 2]);
        assert_eq!(bbn.node_by_name("c").unwrap().id(), 2);
        assert!(bbn.validate().is_ok());
    }

    #[test]
    fn test_rejects_cycles_and_duplicates() {
        let result = chain().add_edge(2, 0);
        assert!(matches!(result, Err(NetworkError::InvalidEdge { parent: 2, child: 0, .. })));

        let result = chain().add_edge(0, 1);
        assert!(matches!(result, Err(NetworkError::InvalidEdge { .. })));

        let result = chain().add_edge(1, 1);
        assert!(matches!(result, Err(NetworkError::InvalidEdge { .. })));

        let result = chain().add_edge(0, 9);
        assert!(matches!(result, Err(NetworkError::UnknownNode(9))));

        let result = chain().add_node(node(0, "z", vec![0.5, 0.5]));
        assert!(matches!(result, Err(NetworkError::DuplicateNodeId(0))));

        let result = chain().add_node(node(7, "a", vec![0.5, 0.5]));
        assert!(matches!(result, Err(NetworkError::DuplicateNodeName(_))));
    }

    #[test]
    fn test_topological_order_puts_parents_first() {
        let flat = |id, name| node(id, name, vec![0.5, 0.5]);
        let bbn = Bbn::new()
            .add_node(flat(0, "a"))
            .unwrap()
            .add_node(flat(1, "b"))
            .unwrap()
            .add_node(flat(2, "c"))
            .unwrap()
            .add_node(flat(3, "d"))
            .unwrap()
            .add_edge(3, 2)
            .unwrap()
            .add_edge(2, 0)
            .unwrap()
            .add_edge(2, 1)
            .unwrap()
            .add_edge(0, 1)
            .unwrap();
        let order = bbn.topological_order().unwrap();
        assert_eq!(order.len(), 4);
        let position = |id| order.iter().position(|&n| n == id).unwrap();
        for (parent, child) in bbn.edges() {
            assert!(position(parent) < position(child));
        }
        assert_eq!(bbn.edges(), vec![(0, 1), (2, 0), (2, 1), (3, 2)]);
        assert_eq!(bbn.parents(1).unwrap(), vec![0, 2]);

        // 3 -> 2 -> 0 -> 1 already exists
        let result = bbn.add_edge(1, 3);
        assert!(matches!(result, Err(NetworkError::InvalidEdge { parent: 1, child: 3, .. })));
    }

    #[test]
    fn test_validate_checks_cpt_shape_and_rows() {
        let bbn = Bbn::new()
            .add_node(node(0, "a", vec![0.5, 0.5]))
            .unwrap()
            .add_node(node(1, "b", vec![0.5, 0.5]))
            .unwrap()
            .add_edge(0, 1)
            .unwrap();
        assert!(matches!(bbn.validate(), Err(NetworkError::InvalidCpt { .. })));

        let bbn = Bbn::new()
            .add_node(node(0, "a", vec![0.6, 0.6]))
            .unwrap();
        assert!(matches!(bbn.validate(), Err(NetworkError::InvalidCpt { .. })));
    }
}
