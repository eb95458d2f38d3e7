//! Builds the immutable `IlGraph` for a source root type (§4.A's
//! construction inputs, assembled by walking the metadata object model).
//!
//! Population of parent/child and sibling edges follows the containment
//! structure verbatim (a type's fields/methods/properties/events/nested
//! types/generic params, a method's params/generic params/locals/
//! instructions/handlers). Dependency edges are added only where the
//! population pass genuinely needs an ordering constraint beyond "the
//! target shell exists" — which, given the `MethodBodyPlan` accumulator
//! `cloners::method_body_cloner` consumes, is exactly "a method populates
//! after its own variables, instructions, and exception handlers do."

use weave_il::SourceModule;

use crate::config::WeaveOptions;
use crate::graph::{DependencyEdge, IlGraph, ParentChildEdge, SiblingEdge};
use crate::vertex::Vertex;

pub fn discover(source: &SourceModule, root: weave_il::TypeHandle, options: &WeaveOptions) -> crate::errors::Result<IlGraph> {
    let mut vertices = Vec::new();
    let mut parent_child = Vec::new();
    let mut sibling = Vec::new();
    let mut dependency = Vec::new();

    walk_type(source, root, options, &mut vertices, &mut parent_child, &mut sibling, &mut dependency)?;

    IlGraph::build(vertices, parent_child, sibling, dependency)
}

fn chain<T: Copy>(items: &[T], mut edge: impl FnMut(T, T)) {
    for w in items.windows(2) {
        edge(w[0], w[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_links_consecutive_items_in_declaration_order() {
        let mut pairs = Vec::new();
        chain(&[1, 2, 3, 4], |a, b| pairs.push((a, b)));
        assert_eq!(pairs, vec![(1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn chain_emits_nothing_for_zero_or_one_items() {
        let mut pairs: Vec<(i32, i32)> = Vec::new();
        chain(&[], |a, b| pairs.push((a, b)));
        chain(&[1], |a, b| pairs.push((a, b)));
        assert!(pairs.is_empty());
    }
}

/// *skip-constructor-mark* (§6): a member carrying the configured marker
/// attribute is left out of the graph entirely, so no cloner is ever built
/// for it — not filtered post hoc, since by the time a cloner exists its
/// shell has already mutated the target module.
fn is_skipped(source: &SourceModule, options: &WeaveOptions, token: dotscope::metadata::token::Token) -> crate::errors::Result<bool> {
    if options.skip_attribute.is_none() {
        return Ok(false);
    }
    Ok(options.is_skip_marked(&source.custom_attributes_on(token)?))
}

#[allow(clippy::too_many_arguments)]
fn walk_type(
    source: &SourceModule,
    ty: weave_il::TypeHandle,
    options: &WeaveOptions,
    vertices: &mut Vec<Vertex>,
    parent_child: &mut Vec<ParentChildEdge>,
    sibling: &mut Vec<SiblingEdge>,
    dependency: &mut Vec<DependencyEdge>,
) -> crate::errors::Result<()> {
    let type_vertex = Vertex::Type(ty);
    vertices.push(type_vertex);
    let info = source.type_info(ty)?;

    chain(&info.generic_params, |a, b| {
        sibling.push(SiblingEdge { prev: Vertex::GenericParameter(a), next: Vertex::GenericParameter(b) })
    });
    for gp in &info.generic_params {
        vertices.push(Vertex::GenericParameter(*gp));
        parent_child.push(ParentChildEdge { parent: type_vertex, child: Vertex::GenericParameter(*gp) });
    }

    let fields: Vec<_> = info.fields.iter().copied().filter(|f| !is_skipped(source, options, f.0).unwrap_or(false)).collect();
    chain(&fields, |a, b| sibling.push(SiblingEdge { prev: Vertex::Field(a), next: Vertex::Field(b) }));
    for f in &fields {
        vertices.push(Vertex::Field(*f));
        parent_child.push(ParentChildEdge { parent: type_vertex, child: Vertex::Field(*f) });
    }

    chain(&info.properties, |a, b| sibling.push(SiblingEdge { prev: Vertex::Property(a), next: Vertex::Property(b) }));
    for p in &info.properties {
        vertices.push(Vertex::Property(*p));
        parent_child.push(ParentChildEdge { parent: type_vertex, child: Vertex::Property(*p) });
    }

    chain(&info.events, |a, b| sibling.push(SiblingEdge { prev: Vertex::Event(a), next: Vertex::Event(b) }));
    for e in &info.events {
        vertices.push(Vertex::Event(*e));
        parent_child.push(ParentChildEdge { parent: type_vertex, child: Vertex::Event(*e) });
    }

    let methods: Vec<_> = info.methods.iter().copied().filter(|m| !is_skipped(source, options, m.0).unwrap_or(false)).collect();
    chain(&methods, |a, b| sibling.push(SiblingEdge { prev: Vertex::Method(a), next: Vertex::Method(b) }));
    for m in &methods {
        vertices.push(Vertex::Method(*m));
        parent_child.push(ParentChildEdge { parent: type_vertex, child: Vertex::Method(*m) });
        walk_method(source, *m, options, vertices, parent_child, sibling, dependency)?;
    }

    chain(&info.nested_types, |a, b| sibling.push(SiblingEdge { prev: Vertex::Type(a), next: Vertex::Type(b) }));
    for nested in &info.nested_types {
        parent_child.push(ParentChildEdge { parent: type_vertex, child: Vertex::Type(*nested) });
        walk_type(source, *nested, options, vertices, parent_child, sibling, dependency)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn walk_method(
    source: &SourceModule,
    method: weave_il::MethodHandle,
    options: &WeaveOptions,
    vertices: &mut Vec<Vertex>,
    parent_child: &mut Vec<ParentChildEdge>,
    sibling: &mut Vec<SiblingEdge>,
    dependency: &mut Vec<DependencyEdge>,
) -> crate::errors::Result<()> {
    let method_vertex = Vertex::Method(method);
    let info = source.method_info(method)?;

    chain(&info.generic_params, |a, b| {
        sibling.push(SiblingEdge { prev: Vertex::GenericParameter(a), next: Vertex::GenericParameter(b) })
    });
    for gp in &info.generic_params {
        vertices.push(Vertex::GenericParameter(*gp));
        parent_child.push(ParentChildEdge { parent: method_vertex, child: Vertex::GenericParameter(*gp) });
    }

    chain(&info.params, |a, b| sibling.push(SiblingEdge { prev: Vertex::Parameter(a), next: Vertex::Parameter(b) }));
    for p in &info.params {
        vertices.push(Vertex::Parameter(*p));
        parent_child.push(ParentChildEdge { parent: method_vertex, child: Vertex::Parameter(*p) });
    }

    if !info.has_body {
        return Ok(());
    }

    let locals: Vec<Vertex> =
        (0..info.locals.len() as u16).map(|i| Vertex::Variable(weave_il::VariableHandle { method, index: i })).collect();
    chain(&locals, |a, b| sibling.push(SiblingEdge { prev: a, next: b }));
    for v in &locals {
        vertices.push(*v);
        parent_child.push(ParentChildEdge { parent: method_vertex, child: *v });
        dependency.push(DependencyEdge { from: method_vertex, to: *v });
    }

    let instructions: Vec<Vertex> = (0..info.instruction_count)
        .map(|i| Vertex::Instruction(weave_il::InstructionHandle { method, index: i }))
        .collect();
    chain(&instructions, |a, b| sibling.push(SiblingEdge { prev: a, next: b }));
    for i in &instructions {
        vertices.push(*i);
        parent_child.push(ParentChildEdge { parent: method_vertex, child: *i });
        dependency.push(DependencyEdge { from: method_vertex, to: *i });
    }

    let handlers: Vec<Vertex> = (0..info.exception_handler_count)
        .map(|i| Vertex::ExceptionHandler(weave_il::ExceptionHandlerHandle { method, index: i }))
        .collect();
    chain(&handlers, |a, b| sibling.push(SiblingEdge { prev: a, next: b }));
    for h in &handlers {
        vertices.push(*h);
        parent_child.push(ParentChildEdge { parent: method_vertex, child: *h });
        dependency.push(DependencyEdge { from: method_vertex, to: *h });
    }

    Ok(())
}
