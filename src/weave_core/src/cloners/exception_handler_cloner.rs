//! ExceptionHandlerCloner (§4.D): dotscope attaches handlers through
//! labeled calls inside the same `begin_method_body` closure the
//! instructions are emitted in (`finally_handler_with_labels` and its
//! catch/fault/filter siblings), so a handler never gets its own builder
//! call — it only contributes a `PlannedHandler` to the shared
//! `MethodBodyPlan` for `MethodBodyCloner` to replay alongside the body.

use std::rc::Rc;

use weave_il::source::ExceptionHandlerKind;
use weave_il::{ExceptionHandlerHandle, SourceModule};

use super::{PlannedHandler, SharedMethodBodyPlan};
use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct ExceptionHandlerCloner {
    source: ExceptionHandlerHandle,
    target: ExceptionHandlerHandle,
    source_module: Rc<SourceModule>,
    plan: SharedMethodBodyPlan,
}

impl ExceptionHandlerCloner {
    pub fn new(
        source: ExceptionHandlerHandle,
        target: ExceptionHandlerHandle,
        source_module: Rc<SourceModule>,
        plan: SharedMethodBodyPlan,
    ) -> Self {
        Self { source, target, source_module, plan }
    }
}

impl Cloner for ExceptionHandlerCloner {
    fn source(&self) -> Vertex {
        Vertex::ExceptionHandler(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::ExceptionHandler(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.exception_handler_info(self.source)?;
        let catch_type = match &info.catch_type {
            Some(ts) if !matches!(info.kind, ExceptionHandlerKind::Finally | ExceptionHandlerKind::Fault) => {
                Some(importer.root_import_type(ts)?)
            }
            _ => None,
        };

        let planned = PlannedHandler {
            kind: info.kind,
            try_start: info.try_start,
            try_end: info.try_end,
            handler_start: info.handler_start,
            handler_end: info.handler_end,
            filter_start: info.filter_start,
            catch_type,
        };

        let mut plan = self.plan.borrow_mut();
        let idx = self.target.index as usize;
        if plan.handlers.len() <= idx {
            plan.handlers.resize_with(idx + 1, || None);
        }
        plan.handlers[idx] = Some(planned);
        Ok(())
    }
}
