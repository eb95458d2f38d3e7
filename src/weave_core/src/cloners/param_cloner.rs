//! ParameterCloner (§4.D): type is encoded into the owning method's shell
//! signature up front; populate has the marshal descriptor (and, by walking
//! the type, any custom attributes the type reference itself needs
//! root-importing for) left to fill, since dotscope's `ParamBuilder` takes
//! name/flags/sequence but not a marshal descriptor directly.

use std::cell::RefCell;
use std::rc::Rc;

use weave_il::target::TargetModule;
use weave_il::{ParamHandle, SourceModule};

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct ParameterCloner {
    source: ParamHandle,
    target: ParamHandle,
    owning_method: weave_il::MethodHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<RefCell<TargetModule>>,
}

impl ParameterCloner {
    pub fn new(
        source: ParamHandle,
        target: ParamHandle,
        owning_method: weave_il::MethodHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<RefCell<TargetModule>>,
    ) -> Self {
        Self { source, target, owning_method, source_module, target_module }
    }
}

impl Cloner for ParameterCloner {
    fn source(&self) -> Vertex {
        Vertex::Parameter(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Parameter(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.param_info(self.owning_method, self.source)?;
        importer.root_import_type(&info.param_type)?;
        if let Some(marshal) = &info.marshal {
            self.target_module.borrow_mut().set_param_marshal(self.target, marshal)?;
        }
        Ok(())
    }
}
