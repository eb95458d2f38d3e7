//! MethodSignatureCloner (§4.D): a placeholder vertex for a method's own
//! signature. `dispatch_method` already root-imports the return type (and
//! every parameter type) through `root_import_type_ref` before the shell is
//! created, since dotscope needs the full encoded signature blob up front —
//! there is nothing left for populate to resolve.

use weave_il::MethodHandle;

use crate::cloner::Cloner;
use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

pub struct MethodSignatureCloner {
    source: MethodHandle,
    target: MethodHandle,
}

impl MethodSignatureCloner {
    pub fn new(source: MethodHandle, target: MethodHandle) -> Self {
        Self { source, target }
    }
}

impl Cloner for MethodSignatureCloner {
    fn source(&self) -> Vertex {
        Vertex::Method(self.source)
    }

    fn target(&self) -> Vertex {
        Vertex::Method(self.target)
    }

    fn populate(&mut self, _importer: &RootImportEngine) -> Result<()> {
        Ok(())
    }
}
