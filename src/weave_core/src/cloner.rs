//! The shared two-phase cloner contract (§3 "Cloner", §4.D).
//!
//! Every concrete cloner in `cloners/` implements `Cloner`; the registry and
//! driver only ever see the trait object, never the concrete kind.

use crate::errors::Result;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ClonerState {
    Unpopulated,
    Populated,
}

pub trait Cloner {
    fn source(&self) -> Vertex;
    fn target(&self) -> Vertex;

    /// Fills in the shell this cloner's `create` phase already allocated,
    /// root-importing every reference along the way. Must be called at
    /// most once; a second call is a `DoubleInvoke` driver bug, enforced by
    /// `ClonerHandle::populate`, not by individual implementations.
    fn populate(&mut self, importer: &RootImportEngine) -> Result<()>;
}

/// A boxed cloner plus the one-shot state guard §3 requires ("no cloner may
/// transition twice").
pub struct ClonerHandle {
    inner: Box<dyn Cloner>,
    state: ClonerState,
}

impl ClonerHandle {
    pub fn new(inner: Box<dyn Cloner>) -> Self {
        Self { inner, state: ClonerState::Unpopulated }
    }

    pub fn source(&self) -> Vertex {
        self.inner.source()
    }

    pub fn target(&self) -> Vertex {
        self.inner.target()
    }

    pub fn populate(&mut self, importer: &RootImportEngine) -> Result<()> {
        if self.state == ClonerState::Populated {
            return Err(crate::errors::WeaveError::DoubleInvoke(format!(
                "cloner for {:?} already populated",
                self.inner.source()
            )));
        }
        self.inner.populate(importer)?;
        self.state = ClonerState::Populated;
        Ok(())
    }
}
