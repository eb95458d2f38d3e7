//! The Cloning Driver (§4.F): ties discovery, the two topological walks,
//! and the attribute post-pass into one weave operation.
//!
//! Two separate orders are needed over the same graph. Creation walks
//! parent/child and sibling edges so every owner exists before anything
//! is attached to it. Population walks the *reverse* of discovery's
//! dependency edges: `discovery.rs` records a method's dependency on its
//! own variables/instructions/handlers as `from: method, to: child`
//! (child must be ready before the method's accumulator is read), and
//! `stable_toposort` places the first element of a pair before the
//! second — so population order needs `(child, method)`, not
//! `(method, child)`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use weave_il::target::TargetModule;
use weave_il::SourceModule;

use crate::attributes;
use crate::config::WeaveOptions;
use crate::dispatch::{self, MethodBodyPlans};
use crate::discovery;
use crate::errors::{Result, WeaveError};
use crate::registry::ClonerRegistry;
use crate::root_import::RootImportEngine;
use crate::toposort::stable_toposort;
use crate::vertex::Vertex;

/// Everything the driver needs to locate the source and target roots and
/// write the result (§4.F step 1's construction inputs, minus the options
/// §6 already owns).
pub struct WeaveRequest<'a> {
    pub source_path: &'a Path,
    pub source_type: &'a str,
    pub target_path: &'a Path,
    pub target_type: &'a str,
    pub out_path: &'a Path,
    pub options: WeaveOptions,
}

pub fn weave(request: WeaveRequest<'_>) -> Result<()> {
    let source = Rc::new(SourceModule::from_file(request.source_path)?);
    let root_source = source
        .find_type(request.source_type)
        .ok_or_else(|| WeaveError::RootTypeNotFound(request.source_type.to_string()))?;

    // `TargetModule` has no FQN lookup of its own, so the target root's
    // token is resolved through a throwaway read-only view of the same
    // file before the real write session opens.
    let target_probe = SourceModule::from_file(request.target_path)?;
    let root_target = target_probe
        .find_type(request.target_type)
        .ok_or_else(|| WeaveError::RootTypeNotFound(request.target_type.to_string()))?;
    drop(target_probe);

    let target = Rc::new(RefCell::new(TargetModule::open(request.target_path)?));
    let module_scope = target.borrow().module_scope();

    let registry = Rc::new(RefCell::new(ClonerRegistry::new()));
    registry.borrow_mut().seed(Vertex::Type(root_source), Vertex::Type(root_target));

    let graph = discovery::discover(&source, root_source, &request.options)?;

    let importer = RootImportEngine::new(source.clone(), registry.clone(), target.clone(), module_scope);

    let creation_order = stable_toposort(
        graph.vertices(),
        graph
            .parent_child_edges()
            .map(|e| (e.parent, e.child))
            .chain(graph.sibling_edges().map(|e| (e.prev, e.next))),
    )?;

    let mut parent_targets: HashMap<Vertex, Vertex> = HashMap::new();
    parent_targets.insert(Vertex::Type(root_source), Vertex::Type(root_target));

    let mut plans = MethodBodyPlans::default();

    for v in creation_order {
        if v == Vertex::Type(root_source) {
            continue;
        }
        let parent_source = graph.parent_of(v)?;
        let parent_target = *parent_targets
            .get(&parent_source)
            .ok_or_else(|| WeaveError::InvalidGraph(format!("no target yet for parent of {v:?}")))?;

        let (target_vertex, cloners) =
            dispatch::dispatch(v, (parent_source, parent_target), &source, &target, &importer, &mut plans)?;

        for cloner in cloners {
            registry.borrow_mut().add_cloner(v, target_vertex, cloner)?;
        }
        parent_targets.insert(v, target_vertex);
    }

    registry.borrow_mut().set_all_cloners_added();

    let population_order =
        stable_toposort(graph.vertices(), graph.dependency_edges().map(|e| (e.to, e.from)))?;

    for v in population_order {
        if v == Vertex::Type(root_source) {
            continue;
        }
        let mut cloners = registry.borrow_mut().take_cloners_for(v);
        for cloner in &mut cloners {
            cloner.populate(&importer)?;
        }
    }

    {
        let registry_ref = registry.borrow();
        let root_source_fqn = request.source_type;
        let root_target_fqn = request.target_type;
        attributes::clone_attributes(
            &source,
            &registry_ref,
            &importer,
            &target,
            &request.options,
            Vertex::Type(root_source),
            root_source_fqn,
            root_target_fqn,
        )?;
    }

    drop(importer);
    drop(registry);

    let target = Rc::try_unwrap(target)
        .map_err(|_| WeaveError::InvalidGraph("target module still shared at finish time".to_string()))?
        .into_inner();
    target.finish(request.out_path)?;

    Ok(())
}
