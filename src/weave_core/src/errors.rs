use thiserror::Error;

use crate::vertex::Vertex;

#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("parent cycle detected while computing depth of {0:?}")]
    ParentCycle(Vertex),

    #[error("cyclic dependency among {0} vertices: {1:?}")]
    CyclicDependency(usize, Vec<Vertex>),

    #[error("unknown generic parameter: {0}")]
    UnknownGenericParameter(String),

    #[error("unmaterialized generic parameter target for {0}")]
    UnmaterializedGenericParameter(String),

    #[error("unresolved declaring type for method {0}")]
    UnresolvedDeclaringType(String),

    #[error("type not found: {0}")]
    RootTypeNotFound(String),

    #[error("no local method in {declaring_type} matches signature of {method}")]
    SignatureMatchMissing { declaring_type: String, method: String },

    #[error("double invoke: {0}")]
    DoubleInvoke(String),

    #[error("vertex has no parent: {0:?}")]
    NoParent(Vertex),

    #[error(transparent)]
    Il(#[from] weave_il::IlError),
}

pub type Result<T> = std::result::Result<T, WeaveError>;
