//! Compiles a [`Bbn`] into a [`JoinTree`].
//!
//! The steps are the usual ones: moralize, triangulate by greedy node
//! elimination, connect the elimination cliques with maximum-mass sepsets,
//! then propagate once so the tree answers marginal queries immediately.

use crate::errors::NetworkError;
use crate::network::dag::Bbn;
use crate::network::jointree::JoinTree;
use log::{debug, info};
use petgraph::unionfind::UnionFind;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

pub type UndirectedGraph = BTreeMap<usize, BTreeSet<usize>>;

pub struct InferenceController;

impl InferenceController {
    /// Validate, compile and propagate a network with no evidence
    pub fn apply(bbn: &Bbn) -> Result<JoinTree, NetworkError> {
        bbn.validate()?;
        let moral = moralize(bbn)?;
        let cliques = triangulate(bbn, &moral)?;
        let links = connect_cliques(bbn, &cliques)?;
        for (i, clique) in cliques.iter().enumerate() {
            debug!("clique {}: {:?}", i, clique);
        }
        for (left, right) in &links {
            debug!("sepset {} -- {}", left, right);
        }
        info!(
            "Compiled {} nodes into a join tree of {} cliques",
            bbn.len(),
            cliques.len()
        );

        let mut tree = JoinTree::from_parts(bbn.clone(), cliques, links)?;
        tree.propagate()?;
        Ok(tree)
    }
}

/// Drop edge directions and connect every pair of parents sharing a child
pub fn moralize(bbn: &Bbn) -> Result<UndirectedGraph, NetworkError> {
    let mut graph: UndirectedGraph = bbn.node_ids().into_iter().map(|id| (id, BTreeSet::new())).collect();
    let mut link = |a: usize, b: usize| {
        if let Some(s) = graph.get_mut(&a) {
            s.insert(b);
        }
        if let Some(s) = graph.get_mut(&b) {
            s.insert(a);
        }
    };
    for id in bbn.node_ids() {
        let parents = bbn.parents(id)?;
        for (i, &p) in parents.iter().enumerate() {
            link(p, id);
            for &q in &parents[i + 1..] {
                link(p, q);
            }
        }
    }
    Ok(graph)
}

fn cardinalities(bbn: &Bbn) -> BTreeMap<usize, u64> {
    bbn.nodes()
        .map(|n| (n.id(), n.variable.cardinality() as u64))
        .collect()
}

/// Elimination cost of `id`: fill-in edges it would add, then clique weight, then id
fn elimination_cost(
    graph: &UndirectedGraph,
    id: usize,
    cards: &BTreeMap<usize, u64>,
) -> (usize, u64, usize) {
    let neighbors: Vec<usize> = graph[&id].iter().copied().collect();
    let mut fill_in = 0;
    for (i, a) in neighbors.iter().enumerate() {
        for b in &neighbors[i + 1..] {
            if !graph[a].contains(b) {
                fill_in += 1;
            }
        }
    }
    let weight = neighbors
        .iter()
        .chain(std::iter::once(&id))
        .map(|n| cards[n])
        .product();
    (fill_in, weight, id)
}

/// Eliminate nodes greedily and return the maximal elimination cliques
pub fn triangulate(
    bbn: &Bbn,
    moral: &UndirectedGraph,
) -> Result<Vec<BTreeSet<usize>>, NetworkError> {
    let cards = cardinalities(bbn);
    let mut graph = moral.clone();
    let mut queue = PriorityQueue::new();
    for &id in graph.keys() {
        queue.push(id, Reverse(elimination_cost(&graph, id, &cards)));
    }

    let mut cliques: Vec<BTreeSet<usize>> = Vec::new();
    while let Some((id, Reverse(cost))) = queue.pop() {
        let neighbors = graph
            .remove(&id)
            .ok_or_else(|| NetworkError::Internal(format!("node {} eliminated twice", id)))?;
        debug!("eliminate {} (fill-in {}, weight {})", id, cost.0, cost.1);

        let members: Vec<usize> = neighbors.iter().copied().collect();
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if let Some(s) = graph.get_mut(&a) {
                    s.insert(b);
                }
                if let Some(s) = graph.get_mut(&b) {
                    s.insert(a);
                }
            }
        }
        for n in &members {
            if let Some(s) = graph.get_mut(n) {
                s.remove(&id);
            }
        }

        let mut clique = neighbors.clone();
        clique.insert(id);
        if !cliques.iter().any(|c| clique.is_subset(c)) {
            cliques.push(clique);
        }

        let mut affected = BTreeSet::new();
        for n in &members {
            affected.insert(*n);
            affected.extend(graph[n].iter().copied());
        }
        for n in affected {
            queue.change_priority(&n, Reverse(elimination_cost(&graph, n, &cards)));
        }
    }
    Ok(cliques)
}

/// Pick clique links by largest shared node count, then smallest combined weight
pub fn connect_cliques(
    bbn: &Bbn,
    cliques: &[BTreeSet<usize>],
) -> Result<Vec<(usize, usize)>, NetworkError> {
    let cards = cardinalities(bbn);
    let weight = |c: &BTreeSet<usize>| -> u64 { c.iter().map(|n| cards[n]).product() };

    let mut candidates = Vec::new();
    for i in 0..cliques.len() {
        for j in i + 1..cliques.len() {
            let mass = cliques[i].intersection(&cliques[j]).count();
            let cost = weight(&cliques[i]) + weight(&cliques[j]);
            candidates.push((Reverse(mass), cost, i, j));
        }
    }
    candidates.sort();

    let mut components = UnionFind::<usize>::new(cliques.len());
    let mut links = Vec::with_capacity(cliques.len().saturating_sub(1));
    for (_, _, i, j) in candidates {
        if components.union(i, j) {
            links.push((i, j));
        }
    }
    if links.len() + 1 != cliques.len() && !cliques.is_empty() {
        return Err(NetworkError::Internal(format!(
            "could not connect {} cliques",
            cliques.len()
        )));
    }
    Ok(links)
}
