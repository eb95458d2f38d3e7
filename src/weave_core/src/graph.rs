//! The immutable IL graph: a vertex set plus three edge sets (§4.A).
//!
//! Modeled as three separate adjacency structures sharing one vertex id
//! space rather than a single multigraph — parent/child is a forest,
//! siblings are intra-level, dependencies are a DAG, and unifying them
//! would only make the per-class invariants harder to check.

use std::collections::HashMap;

use crate::errors::{Result, WeaveError};
use crate::vertex::{Vertex, VertexKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParentChildEdge {
    pub parent: Vertex,
    pub child: Vertex,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SiblingEdge {
    pub prev: Vertex,
    pub next: Vertex,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DependencyEdge {
    pub from: Vertex,
    pub to: Vertex,
}

pub struct IlGraph {
    vertices: Vec<Vertex>,
    parent_child: Vec<ParentChildEdge>,
    sibling: Vec<SiblingEdge>,
    dependency: Vec<DependencyEdge>,

    parent_of: HashMap<Vertex, Vertex>,
    prev_sibling_of: HashMap<Vertex, Vertex>,
    children_of: HashMap<Vertex, Vec<Vertex>>,
    depth_cache: std::cell::RefCell<HashMap<Vertex, u32>>,
}

impl IlGraph {
    pub fn build(
        vertices: Vec<Vertex>,
        parent_child: Vec<ParentChildEdge>,
        sibling: Vec<SiblingEdge>,
        dependency: Vec<DependencyEdge>,
    ) -> Result<Self> {
        let present: std::collections::HashSet<Vertex> = vertices.iter().copied().collect();

        for e in &parent_child {
            if !present.contains(&e.parent) || !present.contains(&e.child) {
                return Err(WeaveError::InvalidGraph(format!(
                    "parent/child edge with endpoint outside vertex set: {e:?}"
                )));
            }
        }
        for e in &sibling {
            if !present.contains(&e.prev) || !present.contains(&e.next) {
                return Err(WeaveError::InvalidGraph(format!(
                    "sibling edge with endpoint outside vertex set: {e:?}"
                )));
            }
            if e.prev.kind() != e.next.kind() {
                return Err(WeaveError::InvalidGraph(format!(
                    "sibling edge connects mismatched kinds: {:?} vs {:?}",
                    e.prev.kind(),
                    e.next.kind()
                )));
            }
        }
        for e in &dependency {
            if !present.contains(&e.from) || !present.contains(&e.to) {
                return Err(WeaveError::InvalidGraph(format!(
                    "dependency edge with endpoint outside vertex set: {e:?}"
                )));
            }
        }

        let mut parent_of = HashMap::new();
        let mut children_of: HashMap<Vertex, Vec<Vertex>> = HashMap::new();
        for e in &parent_child {
            if parent_of.insert(e.child, e.parent).is_some() {
                return Err(WeaveError::InvalidGraph(format!(
                    "vertex has more than one parent: {:?}",
                    e.child
                )));
            }
            children_of.entry(e.parent).or_default().push(e.child);
        }

        let mut prev_sibling_of = HashMap::new();
        for e in &sibling {
            prev_sibling_of.insert(e.next, e.prev);
        }

        Ok(Self {
            vertices,
            parent_child,
            sibling,
            dependency,
            parent_of,
            prev_sibling_of,
            children_of,
            depth_cache: std::cell::RefCell::new(HashMap::new()),
        })
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    pub fn parent_child_edges(&self) -> impl Iterator<Item = &ParentChildEdge> {
        self.parent_child.iter()
    }

    pub fn sibling_edges(&self) -> impl Iterator<Item = &SiblingEdge> {
        self.sibling.iter()
    }

    pub fn dependency_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.dependency.iter()
    }

    pub fn children_of(&self, v: Vertex) -> &[Vertex] {
        self.children_of.get(&v).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn try_parent_of(&self, v: Vertex) -> Option<Vertex> {
        self.parent_of.get(&v).copied()
    }

    pub fn parent_of(&self, v: Vertex) -> Result<Vertex> {
        self.try_parent_of(v).ok_or(WeaveError::NoParent(v))
    }

    pub fn try_previous_sibling_of(&self, v: Vertex) -> Option<Vertex> {
        self.prev_sibling_of.get(&v).copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.vertices.iter().copied().filter(move |v| !self.parent_of.contains_key(v))
    }

    pub fn is_root(&self, v: Vertex) -> bool {
        !self.parent_of.contains_key(&v)
    }

    /// Walks parent pointers to a root, memoizing depths along the way.
    /// Bounds the walk at `|V|` hops so a corrupted forest surfaces as
    /// `ParentCycle` instead of looping forever.
    pub fn depth_of(&self, v: Vertex) -> Result<u32> {
        if let Some(d) = self.depth_cache.borrow().get(&v) {
            return Ok(*d);
        }

        let mut stack = Vec::new();
        let mut cur = v;
        let limit = self.vertices.len() as u32 + 1;
        loop {
            if let Some(d) = self.depth_cache.borrow().get(&cur) {
                let mut depth = *d;
                for s in stack.into_iter().rev() {
                    depth += 1;
                    self.depth_cache.borrow_mut().insert(s, depth);
                }
                return Ok(depth);
            }
            if self.is_root(cur) {
                self.depth_cache.borrow_mut().insert(cur, 0);
                let mut depth = 0u32;
                for s in stack.into_iter().rev() {
                    depth += 1;
                    self.depth_cache.borrow_mut().insert(s, depth);
                }
                return Ok(depth);
            }
            stack.push(cur);
            if stack.len() as u32 > limit {
                return Err(WeaveError::ParentCycle(v));
            }
            cur = self.parent_of(cur)?;
        }
    }

    pub fn vertex_kind_count(&self, kind: VertexKind) -> usize {
        self.vertices.iter().filter(|v| v.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotscope::metadata::token::Token;
    use weave_il::TypeHandle;

    fn type_vertex(n: u32) -> Vertex {
        Vertex::Type(TypeHandle(Token::new(n)))
    }

    #[test]
    fn children_and_parent_round_trip() {
        let root = type_vertex(1);
        let a = type_vertex(2);
        let b = type_vertex(3);
        let graph = IlGraph::build(
            vec![root, a, b],
            vec![
                ParentChildEdge { parent: root, child: a },
                ParentChildEdge { parent: root, child: b },
            ],
            vec![SiblingEdge { prev: a, next: b }],
            vec![],
        )
        .unwrap();

        assert_eq!(graph.parent_of(a).unwrap(), root);
        assert_eq!(graph.parent_of(b).unwrap(), root);
        assert!(graph.is_root(root));
        assert_eq!(graph.children_of(root), &[a, b]);
        assert_eq!(graph.try_previous_sibling_of(b), Some(a));
        assert_eq!(graph.try_previous_sibling_of(a), None);
        assert_eq!(graph.depth_of(root).unwrap(), 0);
        assert_eq!(graph.depth_of(a).unwrap(), 1);
    }

    #[test]
    fn vertex_without_parent_is_a_root() {
        let root = type_vertex(1);
        let graph = IlGraph::build(vec![root], vec![], vec![], vec![]).unwrap();
        assert_eq!(graph.parent_of(root).unwrap_err().to_string(), WeaveError::NoParent(root).to_string());
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn rejects_a_vertex_with_two_parents() {
        let root = type_vertex(1);
        let other_root = type_vertex(2);
        let child = type_vertex(3);
        let result = IlGraph::build(
            vec![root, other_root, child],
            vec![
                ParentChildEdge { parent: root, child },
                ParentChildEdge { parent: other_root, child },
            ],
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(WeaveError::InvalidGraph(_))));
    }

    #[test]
    fn rejects_sibling_edge_with_mismatched_kinds() {
        use weave_il::FieldHandle;
        let t = type_vertex(1);
        let f = Vertex::Field(FieldHandle(Token::new(2)));
        let result = IlGraph::build(vec![t, f], vec![], vec![SiblingEdge { prev: t, next: f }], vec![]);
        assert!(matches!(result, Err(WeaveError::InvalidGraph(_))));
    }

    #[test]
    fn dependency_edges_are_exposed_independently_of_parent_child() {
        let method = type_vertex(1);
        let local = type_vertex(2);
        let graph = IlGraph::build(
            vec![method, local],
            vec![ParentChildEdge { parent: method, child: local }],
            vec![],
            vec![DependencyEdge { from: method, to: local }],
        )
        .unwrap();
        let deps: Vec<_> = graph.dependency_edges().copied().collect();
        assert_eq!(deps, vec![DependencyEdge { from: method, to: local }]);
    }
}
