//! FieldCloner (§4.D): name/attributes/layout are fixed at shell-creation
//! time by the dispatcher; populate root-imports the field's type and
//! copies over its constant value and marshal descriptor, if any.

use std::rc::Rc;

use weave_il::{FieldHandle, SourceModule};

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct FieldCloner {
    source: FieldHandle,
    target: FieldHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<std::cell::RefCell<weave_il::target::TargetModule>>,
}

impl FieldCloner {
    pub fn new(
        source: FieldHandle,
        target: FieldHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<std::cell::RefCell<weave_il::target::TargetModule>>,
    ) -> Self {
        Self { source, target, source_module, target_module }
    }
}

impl Cloner for FieldCloner {
    fn source(&self) -> Vertex {
        Vertex::Field(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Field(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.field_info(self.source)?;
        // the field's own type was already used to encode the shell's
        // signature at creation time; here we only need the constant,
        // which the dispatcher didn't have (default values need the
        // target field to exist first).
        if let Some(constant) = &info.constant {
            self.target_module.borrow_mut().set_field_constant(self.target, constant)?;
        }
        if let Some(marshal) = &info.marshal {
            self.target_module.borrow_mut().set_field_marshal(self.target, marshal)?;
        }
        let _ = importer;
        Ok(())
    }
}
