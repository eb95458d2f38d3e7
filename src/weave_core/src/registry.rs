//! Cloner registry: source vertex → cloners, with the discovery-open /
//! discovery-closed gate (§4.C).

use std::collections::HashMap;

use crate::cloner::ClonerHandle;
use crate::errors::{Result, WeaveError};
use crate::vertex::Vertex;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Gate {
    DiscoveryOpen,
    DiscoveryClosed,
}

pub struct ClonerRegistry {
    cloners: HashMap<Vertex, Vec<ClonerHandle>>,
    targets: HashMap<Vertex, Vertex>,
    gate: Gate,
}

impl ClonerRegistry {
    pub fn new() -> Self {
        Self { cloners: HashMap::new(), targets: HashMap::new(), gate: Gate::DiscoveryOpen }
    }

    /// Pairs a source vertex directly with a known target without going
    /// through a cloner — used once, to seed the source root → target root
    /// pairing before discovery begins (§4.F step 2).
    pub fn seed(&mut self, source: Vertex, target: Vertex) {
        self.targets.insert(source, target);
    }

    pub fn add_cloner(&mut self, source: Vertex, target: Vertex, handle: ClonerHandle) -> Result<()> {
        if self.gate == Gate::DiscoveryClosed {
            return Err(WeaveError::DoubleInvoke(format!(
                "attempted to add a cloner for {source:?} after discovery closed"
            )));
        }
        self.cloners.entry(source).or_default().push(handle);
        self.targets.entry(source).or_insert(target);
        Ok(())
    }

    /// One-shot gate flip; re-flipping is a programmer error, so it panics
    /// rather than returning a recoverable error.
    pub fn set_all_cloners_added(&mut self) {
        assert_eq!(self.gate, Gate::DiscoveryOpen, "discovery gate flipped twice");
        self.gate = Gate::DiscoveryClosed;
    }

    pub fn is_discovery_closed(&self) -> bool {
        self.gate == Gate::DiscoveryClosed
    }

    pub fn cloners_for(&self, source: Vertex) -> &[ClonerHandle] {
        self.cloners.get(&source).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn cloners_for_mut(&mut self, source: Vertex) -> &mut [ClonerHandle] {
        self.cloners.get_mut(&source).map(|c| c.as_mut_slice()).unwrap_or(&mut [])
    }

    /// Removes a vertex's cloners from the registry so the driver can
    /// populate them without holding a borrow of the registry itself — each
    /// cloner's `populate` takes the root-import engine, which borrows this
    /// same registry internally, so keeping the registry borrowed across
    /// the call would deadlock the `RefCell`. The vertex's target pairing in
    /// `targets` is unaffected; only the cloner list is drained.
    pub fn take_cloners_for(&mut self, source: Vertex) -> Vec<ClonerHandle> {
        self.cloners.remove(&source).unwrap_or_default()
    }

    /// Target lookups are only meaningful once discovery has closed — while
    /// discovery is still open a target may exist for only half the sources
    /// that will eventually need one, which would make root-import results
    /// depend on discovery order.
    pub fn try_get_target_for(&self, source: Vertex) -> Option<Vertex> {
        if !self.is_discovery_closed() {
            return None;
        }
        self.targets.get(&source).copied()
    }

    /// Every source/target pairing known once discovery has closed, for a
    /// final pass (custom-attribute cloning) that needs to revisit every
    /// cloned entity rather than one vertex at a time.
    pub fn all_targets(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        self.targets.iter().map(|(s, t)| (*s, *t))
    }
}

impl Default for ClonerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result as WeaveResult;
    use crate::root_import::RootImportEngine;
    use dotscope::metadata::token::Token;
    use weave_il::TypeHandle;

    struct NoopCloner {
        source: Vertex,
        target: Vertex,
    }

    impl crate::cloner::Cloner for NoopCloner {
        fn source(&self) -> Vertex {
            self.source
        }
        fn target(&self) -> Vertex {
            self.target
        }
        fn populate(&mut self, _importer: &RootImportEngine) -> WeaveResult<()> {
            Ok(())
        }
    }

    fn v(n: u32) -> Vertex {
        Vertex::Type(TypeHandle(Token::new(n)))
    }

    fn handle(source: Vertex, target: Vertex) -> ClonerHandle {
        ClonerHandle::new(Box::new(NoopCloner { source, target }))
    }

    #[test]
    fn target_lookup_is_gated_until_discovery_closes() {
        let (root_src, root_tgt) = (v(1), v(2));
        let mut registry = ClonerRegistry::new();
        registry.seed(root_src, root_tgt);

        let (src, tgt) = (v(3), v(4));
        registry.add_cloner(src, tgt, handle(src, tgt)).unwrap();

        assert!(registry.try_get_target_for(src).is_none());
        registry.set_all_cloners_added();
        assert_eq!(registry.try_get_target_for(src), Some(tgt));
        assert_eq!(registry.try_get_target_for(root_src), Some(root_tgt));
    }

    #[test]
    fn add_cloner_after_close_is_rejected() {
        let mut registry = ClonerRegistry::new();
        registry.set_all_cloners_added();
        let (src, tgt) = (v(1), v(2));
        let result = registry.add_cloner(src, tgt, handle(src, tgt));
        assert!(matches!(result, Err(WeaveError::DoubleInvoke(_))));
    }

    #[test]
    fn take_cloners_for_drains_exactly_once() {
        let mut registry = ClonerRegistry::new();
        let (src, tgt) = (v(1), v(2));
        registry.add_cloner(src, tgt, handle(src, tgt)).unwrap();

        assert_eq!(registry.take_cloners_for(src).len(), 1);
        assert_eq!(registry.take_cloners_for(src).len(), 0);
    }

    #[test]
    fn a_vertex_may_register_more_than_one_cloner_first_target_wins() {
        let mut registry = ClonerRegistry::new();
        let (src, tgt_a, tgt_b) = (v(1), v(2), v(3));
        registry.add_cloner(src, tgt_a, handle(src, tgt_a)).unwrap();
        registry.add_cloner(src, tgt_b, handle(src, tgt_b)).unwrap();
        registry.set_all_cloners_added();

        assert_eq!(registry.try_get_target_for(src), Some(tgt_a));
        assert_eq!(registry.take_cloners_for(src).len(), 2);
    }
}
