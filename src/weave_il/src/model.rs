//! Handle types for every metadata entity `weave_core` walks.
//!
//! Entities that own a metadata token (types, fields, methods, params,
//! properties, events, generic params) are addressed by that token.
//! Entities that don't (locals, instructions, exception handlers live only
//! inside a method body) are addressed by their owning method plus an
//! in-body index.

use dotscope::metadata::token::Token;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TypeHandle(pub Token);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldHandle(pub Token);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodHandle(pub Token);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ParamHandle(pub Token);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PropertyHandle(pub Token);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EventHandle(pub Token);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GenericParamHandle(pub Token);

/// A local variable, addressed by its owning method and slot index.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VariableHandle {
    pub method: MethodHandle,
    pub index: u16,
}

/// An instruction, addressed by its owning method and its position in the
/// method's linearized instruction stream (basic blocks flattened in
/// program order).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InstructionHandle {
    pub method: MethodHandle,
    pub index: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExceptionHandlerHandle {
    pub method: MethodHandle,
    pub index: u16,
}

/// The owner of a generic parameter: either a generic type or a generic
/// method. Distinguished because the `GenericParam` metadata table's
/// `Owner` column is a coded index over both.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GenericOwnerHandle {
    Type(TypeHandle),
    Method(MethodHandle),
}
