//! TypeCloner (§4.D): creates a nested or top-level target type and, at
//! populate time, root-imports its base type and interface list.

use std::cell::RefCell;
use std::rc::Rc;

use weave_il::{SourceModule, TypeHandle};

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct TypeCloner {
    source: TypeHandle,
    target: TypeHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<RefCell<weave_il::target::TargetModule>>,
}

impl TypeCloner {
    pub fn new(
        source: TypeHandle,
        target: TypeHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<RefCell<weave_il::target::TargetModule>>,
    ) -> Self {
        Self { source, target, source_module, target_module }
    }
}

impl Cloner for TypeCloner {
    fn source(&self) -> Vertex {
        Vertex::Type(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Type(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.type_info(self.source)?;

        if let Some(base) = &info.base {
            let resolved = importer.root_import_type(base)?;
            self.target_module.borrow_mut().set_type_base(self.target, resolved)?;
        }
        for iface in &info.interfaces {
            let resolved = importer.root_import_type(iface)?;
            self.target_module.borrow_mut().add_type_interface(self.target, resolved)?;
        }
        Ok(())
    }
}
