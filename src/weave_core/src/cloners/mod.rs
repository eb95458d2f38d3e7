//! Per-entity-kind cloners (§4.D). Every cloner here shares the `Cloner`
//! trait from `crate::cloner`; the dispatcher (`crate::dispatch`) is the
//! only place that decides which one to build for a given vertex.

pub mod event_cloner;
pub mod exception_handler_cloner;
pub mod field_cloner;
pub mod generic_param_cloner;
pub mod instruction_cloner;
pub mod method_body_cloner;
pub mod method_cloner;
pub mod param_cloner;
pub mod property_cloner;
pub mod type_cloner;
pub mod variable_cloner;

use std::cell::RefCell;
use std::rc::Rc;

use weave_il::source::ExceptionHandlerKind;
use weave_il::target::{ResolvedType, ResolvedTypeRef};
use weave_il::Operand;

/// The instruction assembler DSL builds a method body as one unit (labels,
/// locals, and opcodes together), but the driver populates variable and
/// instruction vertices independently, in dependency order, potentially
/// interleaved with unrelated vertices. `MethodBodyPlan` is the point
/// where their independently-populated results accumulate until
/// `MethodBodyCloner::populate` runs last and hands the assembled plan to
/// `weave_il::target::TargetModule::begin_method_body`.
#[derive(Default)]
pub struct MethodBodyPlan {
    pub max_stack: u32,
    pub init_locals: bool,
    pub locals: Vec<ResolvedTypeRef>,
    pub instructions: Vec<PlannedInstruction>,
    pub handlers: Vec<Option<PlannedHandler>>,
}

pub struct PlannedInstruction {
    pub mnemonic: String,
    pub operand: Operand,
}

pub struct PlannedHandler {
    pub kind: ExceptionHandlerKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
    pub filter_start: Option<u32>,
    pub catch_type: Option<ResolvedType>,
}

pub type SharedMethodBodyPlan = Rc<RefCell<MethodBodyPlan>>;
