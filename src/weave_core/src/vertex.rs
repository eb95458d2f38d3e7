//! Source-entity vertex handles for the IL graph.
//!
//! Every vertex wraps the `weave_il` handle for the entity it represents so
//! the graph never has to re-derive identity; `VertexKind` only exists so
//! the dispatcher can switch on kind without downcasting.

use weave_il::{
    EventHandle, ExceptionHandlerHandle, FieldHandle, GenericParamHandle, InstructionHandle,
    MethodHandle, ParamHandle, PropertyHandle, TypeHandle, VariableHandle,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Vertex {
    Type(TypeHandle),
    GenericParameter(GenericParamHandle),
    Field(FieldHandle),
    Method(MethodHandle),
    Parameter(ParamHandle),
    Variable(VariableHandle),
    Instruction(InstructionHandle),
    ExceptionHandler(ExceptionHandlerHandle),
    Property(PropertyHandle),
    Event(EventHandle),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VertexKind {
    Type,
    GenericParameter,
    Field,
    Method,
    Parameter,
    Variable,
    Instruction,
    ExceptionHandler,
    Property,
    Event,
}

impl Vertex {
    pub fn kind(&self) -> VertexKind {
        match self {
            Vertex::Type(_) => VertexKind::Type,
            Vertex::GenericParameter(_) => VertexKind::GenericParameter,
            Vertex::Field(_) => VertexKind::Field,
            Vertex::Method(_) => VertexKind::Method,
            Vertex::Parameter(_) => VertexKind::Parameter,
            Vertex::Variable(_) => VertexKind::Variable,
            Vertex::Instruction(_) => VertexKind::Instruction,
            Vertex::ExceptionHandler(_) => VertexKind::ExceptionHandler,
            Vertex::Property(_) => VertexKind::Property,
            Vertex::Event(_) => VertexKind::Event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotscope::metadata::token::Token;

    #[test]
    fn kind_matches_variant_and_two_handles_to_the_same_token_are_equal() {
        let a = Vertex::Type(weave_il::TypeHandle(Token::new(42)));
        let b = Vertex::Type(weave_il::TypeHandle(Token::new(42)));
        let c = Vertex::Field(weave_il::FieldHandle(Token::new(42)));

        assert_eq!(a.kind(), VertexKind::Type);
        assert_eq!(c.kind(), VertexKind::Field);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
