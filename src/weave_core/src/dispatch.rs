//! The Dispatcher (§4.G): builds one target shell plus its populate-phase
//! cloner(s) for a freshly discovered vertex, given its already-created
//! parent on both the source and target side. Driven once per vertex, in
//! parent-before-child order, by the creation-pass topological walk in
//! `driver.rs`.
//!
//! A method vertex is the one case that yields two cloners: a
//! `MethodSignatureCloner` for the method's own return type, and — when the
//! source has a body — a `MethodBodyCloner` that later drains the shared
//! plan `VariableCloner`/`InstructionCloner`/`ExceptionHandlerCloner`
//! contribute to. Both share the same target vertex, which the registry's
//! `add_cloner` already tolerates (§4.C: a vertex may register more than one
//! cloner, the first-seen target wins).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use weave_il::target::{ResolvedType, ResolvedTypeRef, TargetModule};
use weave_il::{GenericOwnerHandle, MethodHandle, SourceModule};

use crate::cloner::ClonerHandle;
use crate::cloners::event_cloner::EventCloner;
use crate::cloners::exception_handler_cloner::ExceptionHandlerCloner;
use crate::cloners::field_cloner::FieldCloner;
use crate::cloners::generic_param_cloner::GenericParameterCloner;
use crate::cloners::instruction_cloner::InstructionCloner;
use crate::cloners::method_body_cloner::MethodBodyCloner;
use crate::cloners::method_cloner::MethodSignatureCloner;
use crate::cloners::param_cloner::ParameterCloner;
use crate::cloners::property_cloner::PropertyCloner;
use crate::cloners::type_cloner::TypeCloner;
use crate::cloners::variable_cloner::VariableCloner;
use crate::cloners::SharedMethodBodyPlan;
use crate::errors::{Result, WeaveError};
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

/// Per-source-method scratch. The dispatcher hands the same plan to every
/// variable/instruction/exception-handler cloner of a given method and to
/// that method's own `MethodBodyCloner`, keyed by the *source* method so
/// lookup doesn't depend on dispatch order.
#[derive(Default)]
pub struct MethodBodyPlans {
    plans: HashMap<MethodHandle, SharedMethodBodyPlan>,
}

impl MethodBodyPlans {
    pub fn plan_for(&mut self, method: MethodHandle) -> SharedMethodBodyPlan {
        self.plans.entry(method).or_insert_with(|| Rc::new(RefCell::new(Default::default()))).clone()
    }
}

fn expect_type(v: Vertex) -> Result<weave_il::TypeHandle> {
    match v {
        Vertex::Type(t) => Ok(t),
        other => Err(WeaveError::InvalidGraph(format!("expected a type vertex, got {other:?}"))),
    }
}

fn expect_method(v: Vertex) -> Result<MethodHandle> {
    match v {
        Vertex::Method(m) => Ok(m),
        other => Err(WeaveError::InvalidGraph(format!("expected a method vertex, got {other:?}"))),
    }
}

/// `parent` is `(source_parent, target_parent)`: both sides of the vertex's
/// already-dispatched container, e.g. a parameter's owning method on the
/// source side and the owning method's already-created shell on the target
/// side.
#[allow(clippy::too_many_arguments)]
pub fn dispatch(
    vertex: Vertex,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
    importer: &RootImportEngine,
    plans: &mut MethodBodyPlans,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    match vertex {
        Vertex::Type(handle) => dispatch_type(handle, parent, source, target),
        Vertex::Field(handle) => dispatch_field(handle, parent, source, target, importer),
        Vertex::Method(handle) => dispatch_method(handle, parent, source, target, importer, plans),
        Vertex::Parameter(handle) => dispatch_param(handle, parent, source, target),
        Vertex::Property(handle) => dispatch_property(handle, parent, source, target, importer),
        Vertex::Event(handle) => dispatch_event(handle, parent, source, target, importer),
        Vertex::GenericParameter(handle) => dispatch_generic_param(handle, parent, source, target),
        Vertex::Variable(handle) => dispatch_variable(handle, parent, source, plans),
        Vertex::Instruction(handle) => dispatch_instruction(handle, parent, source, plans),
        Vertex::ExceptionHandler(handle) => dispatch_exception_handler(handle, parent, source, plans),
    }
}

fn dispatch_type(
    source_handle: weave_il::TypeHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let info = source.type_info(source_handle)?;
    let owner = expect_type(parent.1)?;

    let new_type = target.borrow_mut().create_type(&info.name, &info.namespace, info.flags, None)?;
    target.borrow_mut().set_nested_in(new_type, ResolvedType(owner.0))?;

    let cloner = TypeCloner::new(source_handle, new_type, source.clone(), target.clone());
    Ok((Vertex::Type(new_type), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_field(
    source_handle: weave_il::FieldHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
    importer: &RootImportEngine,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let info = source.field_info(source_handle)?;
    let owner = expect_type(parent.1)?;
    let field_type = importer.root_import_type_ref(&info.field_type)?;

    let new_field = target.borrow_mut().create_field(owner, &info.name, info.flags, &field_type)?;

    let cloner = FieldCloner::new(source_handle, new_field, source.clone(), target.clone());
    Ok((Vertex::Field(new_field), vec![ClonerHandle::new(Box::new(cloner))]))
}

/// Parameters, excluding the sequence-0 return pseudo-parameter (folded
/// into the method's own return type), ordered by declared sequence — the
/// shell's signature blob is positional and must match.
fn ordered_param_types(
    source: &SourceModule,
    method: MethodHandle,
    params: &[weave_il::ParamHandle],
    importer: &RootImportEngine,
) -> Result<Vec<ResolvedTypeRef>> {
    let mut seq_types = Vec::with_capacity(params.len());
    for p in params {
        let info = source.param_info(method, *p)?;
        if info.sequence == 0 {
            continue;
        }
        seq_types.push((info.sequence, importer.root_import_type_ref(&info.param_type)?));
    }
    seq_types.sort_by_key(|(seq, _)| *seq);
    Ok(seq_types.into_iter().map(|(_, t)| t).collect())
}

fn dispatch_method(
    source_handle: MethodHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
    importer: &RootImportEngine,
    plans: &mut MethodBodyPlans,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let info = source.method_info(source_handle)?;
    let owner = expect_type(parent.1)?;

    let param_types = ordered_param_types(source, source_handle, &info.params, importer)?;
    let return_type = importer.root_import_type_ref(&info.return_type)?;

    let new_method = target.borrow_mut().create_method_shell(
        owner,
        &info.name,
        info.flags,
        info.impl_flags,
        info.has_this,
        &return_type,
        &param_types,
    )?;

    let mut cloners: Vec<ClonerHandle> =
        vec![ClonerHandle::new(Box::new(MethodSignatureCloner::new(source_handle, new_method)))];

    if info.has_body {
        let plan = plans.plan_for(source_handle);
        {
            let mut p = plan.borrow_mut();
            p.max_stack = info.max_stack;
            p.init_locals = info.init_locals;
        }
        cloners.push(ClonerHandle::new(Box::new(MethodBodyCloner::new(
            source_handle,
            new_method,
            source.clone(),
            target.clone(),
            plan,
        ))));
    }

    Ok((Vertex::Method(new_method), cloners))
}

fn dispatch_param(
    source_handle: weave_il::ParamHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let source_method = expect_method(parent.0)?;
    let target_method = expect_method(parent.1)?;
    let info = source.param_info(source_method, source_handle)?;

    let new_param = target.borrow_mut().create_parameter(target_method, &info.name, info.flags, info.sequence)?;

    let cloner = ParameterCloner::new(source_handle, new_param, source_method, source.clone(), target.clone());
    Ok((Vertex::Parameter(new_param), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_property(
    source_handle: weave_il::PropertyHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
    importer: &RootImportEngine,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let info = source.property_info(source_handle)?;
    let owner = expect_type(parent.1)?;
    let property_type = importer.root_import_type_ref(&info.property_type)?;

    let token = target.borrow_mut().create_property(owner, &info.name, info.flags, &property_type)?;
    let new_handle = weave_il::PropertyHandle(token);

    let cloner = PropertyCloner::new(source_handle, new_handle, source.clone(), target.clone());
    Ok((Vertex::Property(new_handle), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_event(
    source_handle: weave_il::EventHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
    importer: &RootImportEngine,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let info = source.event_info(source_handle)?;
    let owner = expect_type(parent.1)?;
    let event_type = importer.root_import_type(&info.event_type)?;

    let token = target.borrow_mut().create_event(owner, &info.name, info.flags, event_type)?;
    let new_handle = weave_il::EventHandle(token);

    let cloner = EventCloner::new(source_handle, new_handle, source.clone(), target.clone());
    Ok((Vertex::Event(new_handle), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_generic_param(
    source_handle: weave_il::GenericParamHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    target: &Rc<RefCell<TargetModule>>,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let info = source.generic_param_info(source_handle)?;
    let owner = match parent.1 {
        Vertex::Type(t) => GenericOwnerHandle::Type(t),
        Vertex::Method(m) => GenericOwnerHandle::Method(m),
        other => {
            return Err(WeaveError::InvalidGraph(format!(
                "generic parameter owner must be a type or method, got {other:?}"
            )))
        }
    };

    let token = target.borrow_mut().create_generic_parameter(owner, &info.name, info.index, info.flags)?;
    let new_handle = weave_il::GenericParamHandle(token);

    let cloner = GenericParameterCloner::new(source_handle, new_handle, source.clone(), target.clone());
    Ok((Vertex::GenericParameter(new_handle), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_variable(
    source_handle: weave_il::VariableHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    plans: &mut MethodBodyPlans,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let source_method = expect_method(parent.0)?;
    let target_method = expect_method(parent.1)?;
    let new_handle = weave_il::VariableHandle { method: target_method, index: source_handle.index };
    let plan = plans.plan_for(source_method);

    let cloner = VariableCloner::new(source_handle, new_handle, source.clone(), plan);
    Ok((Vertex::Variable(new_handle), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_instruction(
    source_handle: weave_il::InstructionHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    plans: &mut MethodBodyPlans,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let source_method = expect_method(parent.0)?;
    let target_method = expect_method(parent.1)?;
    let new_handle = weave_il::InstructionHandle { method: target_method, index: source_handle.index };
    let plan = plans.plan_for(source_method);

    let cloner = InstructionCloner::new(source_handle, new_handle, source.clone(), plan);
    Ok((Vertex::Instruction(new_handle), vec![ClonerHandle::new(Box::new(cloner))]))
}

fn dispatch_exception_handler(
    source_handle: weave_il::ExceptionHandlerHandle,
    parent: (Vertex, Vertex),
    source: &Rc<SourceModule>,
    plans: &mut MethodBodyPlans,
) -> Result<(Vertex, Vec<ClonerHandle>)> {
    let source_method = expect_method(parent.0)?;
    let target_method = expect_method(parent.1)?;
    let new_handle = weave_il::ExceptionHandlerHandle { method: target_method, index: source_handle.index };
    let plan = plans.plan_for(source_method);

    let cloner = ExceptionHandlerCloner::new(source_handle, new_handle, source.clone(), plan);
    Ok((Vertex::ExceptionHandler(new_handle), vec![ClonerHandle::new(Box::new(cloner))]))
}
