pub mod errors;
pub mod model;
pub mod signature;
pub mod source;
pub mod target;

pub use errors::{IlError, Result};
pub use model::{
    EventHandle, ExceptionHandlerHandle, FieldHandle, GenericOwnerHandle, GenericParamHandle,
    InstructionHandle, MethodHandle, ParamHandle, PropertyHandle, TypeHandle, VariableHandle,
};
pub use signature::{
    decode_custom_attribute_blob, encode_custom_attribute_blob, CustomAttrArg, CustomAttrInfo,
    CustomAttrValues, Operand, PrimitiveValue, TypeSig,
};
pub use source::{RawCustomAttribute, SourceModule};
pub use target::TargetModule;
