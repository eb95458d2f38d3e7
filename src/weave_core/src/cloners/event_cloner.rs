//! EventCloner (§4.D): mirrors `PropertyCloner` for the add/remove pair.

use std::cell::RefCell;
use std::rc::Rc;

use weave_il::target::TargetModule;
use weave_il::{EventHandle, SourceModule};

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct EventCloner {
    source: EventHandle,
    target: EventHandle,
    source_module: Rc<SourceModule>,
    target_module: Rc<RefCell<TargetModule>>,
}

impl EventCloner {
    pub fn new(
        source: EventHandle,
        target: EventHandle,
        source_module: Rc<SourceModule>,
        target_module: Rc<RefCell<TargetModule>>,
    ) -> Self {
        Self { source, target, source_module, target_module }
    }
}

impl Cloner for EventCloner {
    fn source(&self) -> Vertex {
        Vertex::Event(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Event(self.target)
    }

    fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        let info = self.source_module.event_info(self.source)?;

        let mut target_module = self.target_module.borrow_mut();
        if let Some(add) = info.add.and_then(|m| importer.root_import_local_method(m)) {
            target_module.attach_event_accessor(self.target.0, add, true)?;
        }
        if let Some(remove) = info.remove.and_then(|m| importer.root_import_local_method(m)) {
            target_module.attach_event_accessor(self.target.0, remove, false)?;
        }
        Ok(())
    }
}
