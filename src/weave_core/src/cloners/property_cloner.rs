//! PropertyCloner (§4.D): the dispatcher creates the property row as part
//! of building this cloner's shell (so sibling method cloners can already
//! see it), leaving accessor wiring and the property's own type for
//! populate, since the getter/setter methods may not have finished their
//! own population yet but their shells already exist by creation time.

use std::cell::RefCell;
use std::rc::Rc;

use weave_il::target::TargetModule;
use weave_il::{PropertyHandle, SourceModule};

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct PropertyCloner {
    source: PropertyHandle,
    target: PropertyHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<RefCell<TargetModule>>,
}

impl PropertyCloner {
    pub fn new(
        source: PropertyHandle,
        target: PropertyHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<RefCell<TargetModule>>,
    ) -> Self {
        Self { source, target, source_module, target_module }
    }
}

impl Cloner for PropertyCloner {
    fn source(&self) -> Vertex {
        Vertex::Property(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Property(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.property_info(self.source)?;

        let mut target_module = self.target_module.borrow_mut();
        if let Some(getter) = info.getter.and_then(|g| importer.root_import_local_method(g)) {
            target_module.attach_property_accessor(self.target.0, getter, true)?;
        }
        if let Some(setter) = info.setter.and_then(|s| importer.root_import_local_method(s)) {
            target_module.attach_property_accessor(self.target.0, setter, false)?;
        }
        Ok(())
    }
}
