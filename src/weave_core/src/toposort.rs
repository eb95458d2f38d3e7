//! Stable topological sort over a vertex set and an edge subset (§4.B).
//!
//! Built on `petgraph::graph::DiGraph`, the same graph type
//! `DependencyAnalyzer` uses for its module dependency graph. Petgraph's own
//! `toposort` doesn't guarantee input-order tie-breaking, and output
//! determinism is load-bearing here (§5), so this does Kahn's algorithm by
//! hand with a `VecDeque` ready-queue that preserves insertion order.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::errors::{Result, WeaveError};
use crate::vertex::Vertex;

pub fn stable_toposort<'a>(
    vertices: impl Iterator<Item = &'a Vertex>,
    edges: impl Iterator<Item = (Vertex, Vertex)>,
) -> Result<Vec<Vertex>> {
    let vertices: Vec<Vertex> = vertices.copied().collect();
    let mut index_of: HashMap<Vertex, NodeIndex> = HashMap::new();
    let mut graph: DiGraph<Vertex, ()> = DiGraph::new();

    for v in &vertices {
        let idx = graph.add_node(*v);
        index_of.insert(*v, idx);
    }
    for (from, to) in edges {
        let a = index_of[&from];
        let b = index_of[&to];
        graph.add_edge(a, b, ());
    }

    let mut indegree: HashMap<NodeIndex, usize> = HashMap::new();
    for idx in graph.node_indices() {
        indegree.insert(idx, 0);
    }
    for idx in graph.node_indices() {
        for edge in graph.edges(idx) {
            *indegree.entry(edge.target()).or_insert(0) += 1;
        }
    }

    let mut ready: VecDeque<NodeIndex> =
        vertices.iter().map(|v| index_of[v]).filter(|idx| indegree[idx] == 0).collect();

    let mut order = Vec::with_capacity(vertices.len());
    let mut visited = vec![false; graph.node_count()];

    while let Some(idx) = ready.pop_front() {
        if visited[idx.index()] {
            continue;
        }
        visited[idx.index()] = true;
        order.push(graph[idx]);

        for edge in graph.edges(idx) {
            let target = edge.target();
            let d = indegree.get_mut(&target).unwrap();
            *d -= 1;
            if *d == 0 {
                ready.push_back(target);
            }
        }
    }

    if order.len() != vertices.len() {
        let remaining: Vec<Vertex> =
            graph.node_indices().filter(|idx| !visited[idx.index()]).map(|idx| graph[idx]).collect();
        return Err(WeaveError::CyclicDependency(remaining.len(), remaining));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotscope::metadata::token::Token;
    use weave_il::TypeHandle;

    fn v(n: u32) -> Vertex {
        Vertex::Type(TypeHandle(Token::new(n)))
    }

    #[test]
    fn orders_by_edges_and_falls_back_to_input_order() {
        let (a, b, c, d) = (v(1), v(2), v(3), v(4));
        // d has no constraint and should keep its input position relative
        // to other unconstrained vertices; c must follow b, which must
        // follow a.
        let order = stable_toposort(vec![a, d, b, c].iter(), vec![(a, b), (b, c)].into_iter()).unwrap();
        assert_eq!(order, vec![a, d, b, c]);
    }

    #[test]
    fn detects_a_cycle() {
        let (a, b) = (v(1), v(2));
        let err = stable_toposort(vec![a, b].iter(), vec![(a, b), (b, a)].into_iter()).unwrap_err();
        match err {
            WeaveError::CyclicDependency(count, remaining) => {
                assert_eq!(count, 2);
                assert_eq!(remaining.len(), 2);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_vertices_keep_relative_order() {
        let (a, b, c) = (v(1), v(2), v(3));
        let order = stable_toposort(vec![a, b, c].iter(), std::iter::empty()).unwrap();
        assert_eq!(order, vec![a, b, c]);
    }
}
