//! The structural type-reference union root-import recurses over (§4.E /
//! §9 "root-import as structural recursion"), plus the small set of
//! instruction-operand and custom-attribute-argument shapes the cloners
//! need to rewrite.

use crate::model::{GenericOwnerHandle, InstructionHandle, MethodHandle, TypeHandle, VariableHandle};

/// A type reference as it appears anywhere in metadata: a field's type, a
/// parameter's type, a method's return type, a base type, an instruction
/// operand, a custom-attribute `Type` argument.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeSig {
    /// A primitive element type (`System.Int32`, `System.Boolean`, ...),
    /// carried by its canonical full name so display/caching stays
    /// string-keyed like the rest of the engine.
    Primitive(&'static str),
    /// A named reference not yet known to be mixin-mapped or external;
    /// resolved by full name during root-import.
    Named(String),
    /// `T[]`/`T[,]`/... — element type plus rank.
    Array(Box<TypeSig>, u32),
    /// A by-ref type (`ref T` / `out T` / `&T`).
    ByRef(Box<TypeSig>),
    /// An open generic definition closed over concrete arguments,
    /// e.g. `Outer<int>`.
    GenericInstance(Box<TypeSig>, Vec<TypeSig>),
    /// A reference to a generic parameter declared by some owner, by
    /// index (`!0`, `!!0` in CIL's own notation for type- vs.
    /// method-level parameters — the owner kind disambiguates).
    GenericParameter { owner: GenericParamOwnerRef, index: u32 },
}

/// Enough of a generic parameter's owner to resolve it without yet having
/// a concrete `GenericOwnerHandle` (the owner may itself be mid-clone).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum GenericParamOwnerRef {
    Type(TypeHandle),
    Method(MethodHandle),
}

impl From<GenericOwnerHandle> for GenericParamOwnerRef {
    fn from(h: GenericOwnerHandle) -> Self {
        match h {
            GenericOwnerHandle::Type(t) => GenericParamOwnerRef::Type(t),
            GenericOwnerHandle::Method(m) => GenericParamOwnerRef::Method(m),
        }
    }
}

/// A literal operand payload (everything that is copied verbatim, never
/// root-imported).
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Byte(u8),
}

/// The rewritable shape of a single instruction's operand, per the
/// dispatch table in §4.D's InstructionCloner description.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    None,
    Type(TypeSig),
    Field { owner: TypeSig, name: String },
    Method { owner: TypeSig, name: String, signature: MethodSigRef },
    Param(u16),
    Variable(VariableHandle),
    Branch(InstructionHandle),
    BranchTable(Vec<InstructionHandle>),
    Primitive(PrimitiveValue),
    String(String),
}

/// Just enough of a method signature to support the substitution-based
/// equality oracle of §4.D without re-deriving a `MethodHandle` (the
/// referenced method may not exist yet on the source side either, e.g. a
/// call to a sibling mixin method).
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSigRef {
    pub has_this: bool,
    pub generic_arity: u32,
    pub return_type: TypeSig,
    pub params: Vec<TypeSig>,
    pub generic_args: Vec<TypeSig>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CustomAttrArg {
    Primitive(PrimitiveValue),
    String(String),
    Type(TypeSig),
    Array(Vec<CustomAttrArg>),
    Opaque(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct CustomAttrInfo {
    pub constructor: MethodHandleOrExternal,
    pub fixed_args: Vec<CustomAttrArg>,
    pub named_args: Vec<(String, CustomAttrArg)>,
}

/// A custom attribute's `#Blob` payload (ECMA-335 §II.23.3), split into the
/// fixed arguments this engine can decode structurally and the raw
/// named-argument tail. Only primitive, string, and `Type` fixed arguments
/// are decoded — anything else (arrays, boxed/enum-typed arguments) makes
/// `decode_custom_attribute_blob` bail with `IlError::Unsupported`, and the
/// caller falls back to copying the whole blob byte-for-byte, which is
/// still correct for any attribute that doesn't reference the mixin root.
#[derive(Clone, Debug)]
pub struct CustomAttrValues {
    pub fixed_args: Vec<CustomAttrArg>,
    pub named_args_tail: Vec<u8>,
}

fn read_compressed_u32(buf: &[u8], pos: &mut usize) -> Option<u32> {
    let b0 = *buf.get(*pos)?;
    if b0 & 0x80 == 0 {
        *pos += 1;
        Some(b0 as u32)
    } else if b0 & 0xC0 == 0x80 {
        let b1 = *buf.get(*pos + 1)?;
        *pos += 2;
        Some((((b0 & 0x3F) as u32) << 8) | b1 as u32)
    } else {
        let bytes = buf.get(*pos..*pos + 4)?;
        *pos += 4;
        Some((((bytes[0] & 0x1F) as u32) << 24) | ((bytes[1] as u32) << 16) | ((bytes[2] as u32) << 8) | bytes[3] as u32)
    }
}

fn write_compressed_u32(out: &mut Vec<u8>, v: u32) {
    if v < 0x80 {
        out.push(v as u8);
    } else if v < 0x4000 {
        out.push(0x80 | (v >> 8) as u8);
        out.push((v & 0xFF) as u8);
    } else {
        out.push(0xC0 | (v >> 24) as u8);
        out.push(((v >> 16) & 0xFF) as u8);
        out.push(((v >> 8) & 0xFF) as u8);
        out.push((v & 0xFF) as u8);
    }
}

fn read_ser_string(buf: &[u8], pos: &mut usize) -> Option<String> {
    let marker = *buf.get(*pos)?;
    if marker == 0xFF {
        *pos += 1;
        return Some(String::new());
    }
    let len = read_compressed_u32(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len)?;
    *pos += len;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn write_ser_string(out: &mut Vec<u8>, s: &str) {
    write_compressed_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

fn take_bytes<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Option<&'a [u8]> {
    let bytes = buf.get(*pos..*pos + len)?;
    *pos += len;
    Some(bytes)
}

fn decode_fixed_arg(ty: &TypeSig, buf: &[u8], pos: &mut usize) -> Option<CustomAttrArg> {
    match ty {
        TypeSig::Primitive(p) => match *p {
            "System.Boolean" | "System.Byte" | "System.SByte" => {
                Some(CustomAttrArg::Primitive(PrimitiveValue::Byte(*take_bytes(buf, pos, 1)?.first()?)))
            }
            "System.Int16" | "System.UInt16" | "System.Char" => {
                let b = take_bytes(buf, pos, 2)?;
                Some(CustomAttrArg::Primitive(PrimitiveValue::I32(i16::from_le_bytes([b[0], b[1]]) as i32)))
            }
            "System.Int32" | "System.UInt32" => {
                let b = take_bytes(buf, pos, 4)?;
                Some(CustomAttrArg::Primitive(PrimitiveValue::I32(i32::from_le_bytes(b.try_into().ok()?))))
            }
            "System.Int64" | "System.UInt64" => {
                let b = take_bytes(buf, pos, 8)?;
                Some(CustomAttrArg::Primitive(PrimitiveValue::I64(i64::from_le_bytes(b.try_into().ok()?))))
            }
            "System.Single" => {
                let b = take_bytes(buf, pos, 4)?;
                Some(CustomAttrArg::Primitive(PrimitiveValue::F32(f32::from_le_bytes(b.try_into().ok()?))))
            }
            "System.Double" => {
                let b = take_bytes(buf, pos, 8)?;
                Some(CustomAttrArg::Primitive(PrimitiveValue::F64(f64::from_le_bytes(b.try_into().ok()?))))
            }
            "System.String" => Some(CustomAttrArg::String(read_ser_string(buf, pos)?)),
            _ => None,
        },
        TypeSig::Named(fqn) if fqn == "System.Type" => Some(CustomAttrArg::Type(TypeSig::Named(read_ser_string(buf, pos)?))),
        _ => None,
    }
}

fn encode_fixed_arg(arg: &CustomAttrArg, out: &mut Vec<u8>) {
    match arg {
        CustomAttrArg::Primitive(PrimitiveValue::Byte(v)) => out.push(*v),
        CustomAttrArg::Primitive(PrimitiveValue::I32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        CustomAttrArg::Primitive(PrimitiveValue::I64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        CustomAttrArg::Primitive(PrimitiveValue::F32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        CustomAttrArg::Primitive(PrimitiveValue::F64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        CustomAttrArg::String(s) => write_ser_string(out, s),
        CustomAttrArg::Type(TypeSig::Named(fqn)) => write_ser_string(out, fqn),
        CustomAttrArg::Type(_) | CustomAttrArg::Array(_) | CustomAttrArg::Opaque(_) => {}
    }
}

/// Decodes a custom attribute blob's fixed arguments against the
/// constructor's parameter types. Returns `None` (rather than a partially
/// decoded result) the moment a parameter shape this decoder doesn't
/// understand is hit, since guessing its width would desynchronize every
/// argument after it.
pub fn decode_custom_attribute_blob(ctor_params: &[TypeSig], blob: &[u8]) -> Option<CustomAttrValues> {
    if blob.len() < 2 || u16::from_le_bytes([blob[0], blob[1]]) != 0x0001 {
        return None;
    }
    let mut pos = 2;
    let mut fixed_args = Vec::with_capacity(ctor_params.len());
    for param in ctor_params {
        fixed_args.push(decode_fixed_arg(param, blob, &mut pos)?);
    }
    let named_args_tail = blob.get(pos..)?.to_vec();
    Some(CustomAttrValues { fixed_args, named_args_tail })
}

pub fn encode_custom_attribute_blob(values: &CustomAttrValues) -> Vec<u8> {
    let mut out = vec![0x01, 0x00];
    for arg in &values.fixed_args {
        encode_fixed_arg(arg, &mut out);
    }
    out.extend_from_slice(&values.named_args_tail);
    out
}

/// A custom attribute's constructor may live in the mixin closure or be
/// external (resolved directly by the importer, never root-imported as a
/// mixin member).
#[derive(Clone, Debug)]
pub enum MethodHandleOrExternal {
    Local(crate::model::MethodHandle),
    External { owner: TypeSig, name: String, signature: MethodSigRef },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_an_int32_and_string_fixed_argument_list() {
        let ctor_params = vec![TypeSig::Primitive("System.Int32"), TypeSig::Primitive("System.String")];
        let mut blob = vec![0x01, 0x00];
        blob.extend_from_slice(&100i32.to_le_bytes());
        blob.push(5);
        blob.extend_from_slice(b"hello");
        blob.extend_from_slice(&[0xAB, 0xCD]); // named-arg count tail, preserved opaquely

        let decoded = decode_custom_attribute_blob(&ctor_params, &blob).unwrap();
        assert_eq!(decoded.fixed_args, vec![
            CustomAttrArg::Primitive(PrimitiveValue::I32(100)),
            CustomAttrArg::String("hello".to_string()),
        ]);
        assert_eq!(decoded.named_args_tail, vec![0xAB, 0xCD]);
    }

    #[test]
    fn encode_is_the_inverse_of_decode_for_supported_shapes() {
        let ctor_params = vec![TypeSig::Primitive("System.Int32"), TypeSig::Primitive("System.String")];
        let values = CustomAttrValues {
            fixed_args: vec![
                CustomAttrArg::Primitive(PrimitiveValue::I32(-7)),
                CustomAttrArg::String("mixin".to_string()),
            ],
            named_args_tail: vec![0x00, 0x00],
        };
        let blob = encode_custom_attribute_blob(&values);
        let decoded = decode_custom_attribute_blob(&ctor_params, &blob).unwrap();
        assert_eq!(decoded.fixed_args, values.fixed_args);
        assert_eq!(decoded.named_args_tail, values.named_args_tail);
    }

    #[test]
    fn decodes_a_type_argument_as_its_serialized_type_name() {
        let ctor_params = vec![TypeSig::Named("System.Type".to_string())];
        let mut blob = vec![0x01, 0x00];
        let fqn = "My.Namespace.SourceRoot";
        blob.push(fqn.len() as u8);
        blob.extend_from_slice(fqn.as_bytes());

        let decoded = decode_custom_attribute_blob(&ctor_params, &blob).unwrap();
        assert_eq!(decoded.fixed_args, vec![CustomAttrArg::Type(TypeSig::Named(fqn.to_string()))]);
    }

    #[test]
    fn rejects_a_blob_with_the_wrong_prolog() {
        let blob = vec![0x02, 0x00];
        assert!(decode_custom_attribute_blob(&[], &blob).is_none());
    }

    #[test]
    fn bails_rather_than_desynchronize_on_an_unsupported_parameter_shape() {
        let ctor_params = vec![TypeSig::Array(Box::new(TypeSig::Primitive("System.Int32")), 1)];
        let blob = vec![0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(decode_custom_attribute_blob(&ctor_params, &blob).is_none());
    }
}
