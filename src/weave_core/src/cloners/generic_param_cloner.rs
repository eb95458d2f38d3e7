//! GenericParameterCloner (§4.D, §9): the target generic parameter cannot
//! be built until its owner exists, so the dispatcher only constructs this
//! cloner once the owning type/method cloner has already created its
//! shell. Until then, any lookup through the registry for this vertex
//! naturally returns nothing rather than a sentinel — the registry's
//! discovery gate already distinguishes "not yet materialized" from
//! "never will be", so there is no separate placeholder type to model.

use std::rc::Rc;

use weave_il::{GenericParamHandle, SourceModule};

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct GenericParameterCloner {
    source: GenericParamHandle,
    target: GenericParamHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<std::cell::RefCell<weave_il::target::TargetModule>>,
}

impl GenericParameterCloner {
    pub fn new(
        source: GenericParamHandle,
        target: GenericParamHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<std::cell::RefCell<weave_il::target::TargetModule>>,
    ) -> Self {
        Self { source, target, source_module, target_module }
    }
}

impl Cloner for GenericParameterCloner {
    fn source(&self) -> Vertex {
        Vertex::GenericParameter(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::GenericParameter(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.generic_param_info(self.source)?;
        for constraint in &info.constraints {
            let resolved = importer.root_import_type(constraint)?;
            self.target_module.borrow_mut().add_generic_constraint(self.target.0, resolved)?;
        }
        Ok(())
    }
}
