//! VariableCloner (§4.D): contributes its root-imported type to the owning
//! method's shared `MethodBodyPlan`; the actual dotscope local isn't
//! declared until `MethodBodyCloner` assembles the whole body.

use std::rc::Rc;

use weave_il::{SourceModule, VariableHandle};

use super::SharedMethodBodyPlan;
use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct VariableCloner {
    source: VariableHandle,
    target: VariableHandle,
    source_module: Rc<SourceModule>,
    plan: SharedMethodBodyPlan,
}

impl VariableCloner {
    pub fn new(source: VariableHandle, target: VariableHandle, source_module: Rc<SourceModule>, plan: SharedMethodBodyPlan) -> Self {
        Self { source, target, source_module, plan }
    }
}

impl Cloner for VariableCloner {
    fn source(&self) -> Vertex {
        Vertex::Variable(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Variable(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let method_info = self.source_module.method_info(self.source.method)?;
        let ty = method_info
            .locals
            .get(self.source.index as usize)
            .cloned()
            .ok_or_else(|| crate::errors::WeaveError::InvalidGraph(format!("local slot {} out of range", self.source.index)))?;
        let resolved = importer.root_import_type_ref(&ty)?;

        let mut plan = self.plan.borrow_mut();
        let idx = self.target.index as usize;
        if plan.locals.len() <= idx {
            plan.locals.resize(idx + 1, weave_il::target::ResolvedTypeRef::Primitive("System.Object"));
        }
        plan.locals[idx] = resolved;
        Ok(())
    }
}
