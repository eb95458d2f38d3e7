//! MethodBodyCloner (§4.D): the sink of the shared `MethodBodyPlan`. Its
//! dependency edges make it populate last among a method's body vertices
//! (variables, instructions, exception handlers), so by the time it runs
//! the plan holds every local's type and every instruction's rewritten
//! operand; this is the only cloner that calls
//! `TargetModule::begin_method_body`.
//!
//! Every operand that needs a concrete token (string literals, type/field/
//! method references) is resolved up front, before the assembler closure
//! runs — dotscope's builder holds the only `&mut BuilderContext` for the
//! duration of that closure, so there is no way to call back into it for a
//! fresh `userstring_add` once emission has started.

use std::cell::RefCell;
use std::rc::Rc;

use dotscope::metadata::token::Token;
use weave_il::target::{emit_instruction, label_for, HandlerSpec, TargetModule};
use weave_il::{MethodHandle, Operand, SourceModule};

use super::SharedMethodBodyPlan;
use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct MethodBodyCloner {
    source: MethodHandle,
    target: MethodHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<RefCell<TargetModule>>,
    plan: SharedMethodBodyPlan,
}

impl MethodBodyCloner {
    pub fn new(
        source: MethodHandle,
        target: MethodHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<RefCell<TargetModule>>,
        plan: SharedMethodBodyPlan,
    ) -> Self {
        Self { source, target, source_module, target_module, plan }
    }
}

impl Cloner for MethodBodyCloner {
    fn source(&self) -> Vertex {
        Vertex::Method(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Method(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.method_info(self.source)?;
        if !info.has_body {
            return Ok(());
        }

        let plan = self.plan.borrow();
        let locals = plan.locals.clone();
        let handler_specs: Vec<HandlerSpec> = plan
            .handlers
            .iter()
            .filter_map(|h| h.as_ref())
            .map(|h| HandlerSpec {
                kind: h.kind,
                try_start: h.try_start,
                try_end: h.try_end,
                handler_start: h.handler_start,
                handler_end: h.handler_end,
                filter_start: h.filter_start,
                catch_type: h.catch_type.map(|t| t.0),
            })
            .collect();
        let planned: Vec<(String, Operand)> =
            plan.instructions.iter().map(|i| (i.mnemonic.clone(), i.operand.clone())).collect();
        drop(plan);
        let max_stack = self.plan.borrow().max_stack;
        let init_locals = self.plan.borrow().init_locals;

        // Resolve every token-bearing operand before the assembler closure
        // runs; `resolve_operand_token` never needs `TargetModule` access
        // from inside the closure.
        let mut resolved_tokens = Vec::with_capacity(planned.len());
        for (_, operand) in &planned {
            resolved_tokens.push(match operand {
                Operand::String(s) => Some(self.target_module.borrow_mut().userstring_add(s)?),
                Operand::Type(ts) => Some(importer.root_import_type(ts)?.0),
                Operand::Field { owner, name } => Some(importer.root_import_field(owner, name)?.0),
                Operand::Method { owner, name, signature } => Some(importer.root_import_method(owner, name, signature)?.0),
                _ => None,
            });
        }

        self.target_module.borrow_mut().begin_method_body(
            self.target,
            max_stack,
            init_locals,
            &locals,
            &handler_specs,
            move |asm| {
                for (index, ((mnemonic, operand), token)) in planned.iter().zip(resolved_tokens.iter()).enumerate() {
                    asm.label(&label_for(index as u32))?;
                    let mut token_of = |_: &Operand| Ok::<Token, dotscope::Error>(token.expect("token resolved up front"));
                    emit_instruction(asm, mnemonic, operand, label_for, &mut token_of)?;
                }
                Ok(())
            },
        )?;
        Ok(())
    }
}
