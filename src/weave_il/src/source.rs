//! Read-only access to a loaded assembly's metadata and IL, backed by
//! `dotscope::metadata::cilobject::CilObject`.
//!
//! This module is the "library providing a typed object model of metadata
//! and IL" the top-level spec treats as an external collaborator; it is
//! deliberately thin — it exposes exactly the shape `weave_core`'s graph
//! discovery and root-import engine need, and nothing of dotscope's own
//! API surface beyond that.

use std::collections::HashMap;
use std::path::Path;

use dotscope::metadata::cilobject::CilObject;
use dotscope::metadata::signatures::TypeSignature;
use dotscope::metadata::token::Token;

use crate::errors::{IlError, Result};
use crate::model::{
    EventHandle, ExceptionHandlerHandle, FieldHandle, GenericOwnerHandle, GenericParamHandle,
    InstructionHandle, MethodHandle, ParamHandle, PropertyHandle, TypeHandle, VariableHandle,
};
use crate::signature::{
    GenericParamOwnerRef, MethodSigRef, Operand, PrimitiveValue, TypeSig,
};

pub struct SourceModule {
    obj: CilObject,
    by_fqn: HashMap<String, TypeHandle>,
}

#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub name: String,
    pub namespace: String,
    pub full_name: String,
    pub flags: u32,
    pub is_value_type: bool,
    pub base: Option<TypeSig>,
    pub interfaces: Vec<TypeSig>,
    pub nested_types: Vec<TypeHandle>,
    pub fields: Vec<FieldHandle>,
    pub methods: Vec<MethodHandle>,
    pub properties: Vec<PropertyHandle>,
    pub events: Vec<EventHandle>,
    pub generic_params: Vec<GenericParamHandle>,
    pub custom_attribute_count: usize,
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub flags: u32,
    pub field_type: TypeSig,
    pub is_const: bool,
    pub constant: Option<PrimitiveValue>,
    /// Raw `FieldMarshal` native-type descriptor blob, carried through
    /// opaquely rather than decoded — mirrors how a custom attribute's
    /// untouched arguments pass through unparsed.
    pub marshal: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub name: String,
    pub flags: u32,
    pub impl_flags: u32,
    pub has_this: bool,
    pub return_type: TypeSig,
    pub params: Vec<ParamHandle>,
    pub generic_params: Vec<GenericParamHandle>,
    pub has_body: bool,
    pub max_stack: u32,
    pub init_locals: bool,
    pub locals: Vec<TypeSig>,
    pub instruction_count: u32,
    pub exception_handler_count: u16,
}

#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub name: String,
    pub flags: u32,
    pub sequence: u16,
    pub param_type: TypeSig,
    pub marshal: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct InstructionInfo {
    pub mnemonic: String,
    pub operand: Operand,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExceptionHandlerKind {
    Catch,
    Filter,
    Finally,
    Fault,
}

#[derive(Clone, Debug)]
pub struct ExceptionHandlerInfo {
    pub kind: ExceptionHandlerKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
    pub filter_start: Option<u32>,
    pub catch_type: Option<TypeSig>,
}

#[derive(Clone, Debug)]
pub struct PropertyInfo {
    pub name: String,
    pub flags: u32,
    pub property_type: TypeSig,
    pub getter: Option<MethodHandle>,
    pub setter: Option<MethodHandle>,
}

#[derive(Clone, Debug)]
pub struct EventInfo {
    pub name: String,
    pub flags: u32,
    pub event_type: TypeSig,
    pub add: Option<MethodHandle>,
    pub remove: Option<MethodHandle>,
}

/// One custom attribute as read directly off metadata: the constructor it
/// invokes, that constructor's parameter types (needed to decode the fixed
/// argument list), and the raw blob. `weave_core`'s attribute cloning is
/// the only consumer — it decides whether to rewrite a `Type` argument and
/// whether to pass the blob through unchanged.
#[derive(Clone, Debug)]
pub struct RawCustomAttribute {
    pub constructor: Token,
    pub ctor_owner: TypeSig,
    pub ctor_name: String,
    pub ctor_params: Vec<TypeSig>,
    pub blob: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct GenericParamInfo {
    pub name: String,
    pub index: u32,
    pub flags: u32,
    pub owner: GenericOwnerHandle,
    pub constraints: Vec<TypeSig>,
}

impl SourceModule {
    pub fn from_file(path: &Path) -> Result<Self> {
        let obj = CilObject::from_file(path).map_err(IlError::from)?;
        let mut by_fqn = HashMap::new();
        for entry in obj.types().all_types().iter() {
            let t = entry;
            let fqn = full_name(&t.namespace, &t.name);
            by_fqn.insert(fqn, TypeHandle(t.token));
        }
        Ok(Self { obj, by_fqn })
    }

    pub fn find_type(&self, fqn: &str) -> Option<TypeHandle> {
        self.by_fqn.get(fqn).copied()
    }

    fn type_def(&self, handle: TypeHandle) -> Result<&dotscope::metadata::typesystem::TypeDef> {
        self.obj
            .types()
            .all_types()
            .iter()
            .find(|t| t.token == handle.0)
            .ok_or_else(|| IlError::NotFound(format!("type token {:?}", handle.0)))
    }

    pub fn type_info(&self, handle: TypeHandle) -> Result<TypeInfo> {
        let t = self.type_def(handle)?;
        let full_name = full_name(&t.namespace, &t.name);

        let base = t.base().map(|b| TypeSig::Named(full_name(&b.namespace, &b.name)));
        let interfaces = t
            .interfaces
            .iter()
            .filter_map(|i| i.upgrade())
            .map(|i| TypeSig::Named(full_name(&i.namespace, &i.name)))
            .collect();

        let nested_types = t
            .nested_types
            .iter()
            .filter_map(|(_, r)| r.upgrade())
            .map(|nt| TypeHandle(nt.token))
            .collect();
        let fields = t.fields.iter().filter_map(|(_, r)| r.upgrade()).map(|f| FieldHandle(f.token)).collect();
        let methods = t.methods.iter().filter_map(|(_, r)| r.upgrade()).map(|m| MethodHandle(m.token)).collect();
        let properties = t
            .properties
            .iter()
            .filter_map(|(_, r)| r.upgrade())
            .map(|p| PropertyHandle(p.token))
            .collect();
        let events = t.events.iter().filter_map(|(_, r)| r.upgrade()).map(|e| EventHandle(e.token)).collect();
        let generic_params = t
            .generic_params
            .iter()
            .map(|gp| GenericParamHandle(gp.token))
            .collect();

        Ok(TypeInfo {
            name: t.name.clone(),
            namespace: t.namespace.clone(),
            full_name,
            flags: t.flags,
            is_value_type: t.is_value_type(),
            base,
            interfaces,
            nested_types,
            fields,
            methods,
            properties,
            events,
            generic_params,
            custom_attribute_count: t.custom_attributes.iter().count(),
        })
    }

    pub fn field_info(&self, handle: FieldHandle) -> Result<FieldInfo> {
        let f = self
            .all_fields()
            .find(|f| f.token == handle.0)
            .ok_or_else(|| IlError::NotFound(format!("field token {:?}", handle.0)))?;
        Ok(FieldInfo {
            name: f.name.clone(),
            flags: f.flags,
            field_type: self.map_type_signature(&f.signature.base),
            is_const: f.default.get().is_some(),
            constant: f.default.get().and_then(constant_from_default),
            marshal: f.marshal.get().map(|b| b.to_vec()),
        })
    }

    pub fn method_info(&self, handle: MethodHandle) -> Result<MethodInfo> {
        let m = self
            .all_methods()
            .find(|m| m.token == handle.0)
            .ok_or_else(|| IlError::NotFound(format!("method token {:?}", handle.0)))?;

        let params = m.params.iter().filter_map(|(_, r)| r.upgrade()).map(|p| ParamHandle(p.token)).collect();
        let generic_params = m.generic_params.iter().map(|gp| GenericParamHandle(gp.token)).collect();

        let (has_body, max_stack, init_locals, locals, instruction_count, exception_handler_count) =
            match m.body.get() {
                Some(body) => (
                    true,
                    body.max_stack as u32,
                    body.init_locals,
                    body.local_vars.iter().map(|l| self.map_type_signature(&l.base)).collect(),
                    linear_instruction_count(m),
                    body.exception_handlers.len() as u16,
                ),
                None => (false, 0, false, Vec::new(), 0, 0),
            };

        Ok(MethodInfo {
            name: m.name.clone(),
            flags: m.flags,
            impl_flags: m.impl_flags,
            has_this: m.signature.has_this,
            return_type: self.map_type_signature(&m.signature.return_type.base),
            params,
            generic_params,
            has_body,
            max_stack,
            init_locals,
            locals,
            instruction_count,
            exception_handler_count,
        })
    }

    /// A `Param` row carries no type of its own in ECMA-335 — the type is
    /// positional in the owning method's signature, indexed by `sequence`
    /// (0 = return value, 1.. = parameters in order).
    pub fn param_info(&self, method: MethodHandle, handle: ParamHandle) -> Result<ParamInfo> {
        let m = self
            .all_methods()
            .find(|m| m.token == method.0)
            .ok_or_else(|| IlError::NotFound(format!("method token {:?}", method.0)))?;
        let p = m
            .params
            .iter()
            .filter_map(|(_, r)| r.upgrade())
            .find(|p| p.token == handle.0)
            .ok_or_else(|| IlError::NotFound(format!("param token {:?}", handle.0)))?;
        let param_type = if p.sequence == 0 {
            self.map_type_signature(&m.signature.return_type.base)
        } else {
            m.signature
                .params
                .get(p.sequence as usize - 1)
                .map(|sp| self.map_type_signature(&sp.base))
                .unwrap_or(TypeSig::Named(String::new()))
        };
        Ok(ParamInfo {
            name: p.name.clone(),
            flags: p.flags,
            sequence: p.sequence,
            param_type,
            marshal: p.marshal.get().map(|b| b.to_vec()),
        })
    }

    pub fn instruction_at(&self, handle: InstructionHandle) -> Result<InstructionInfo> {
        let m = self
            .all_methods()
            .find(|m| m.token == handle.method.0)
            .ok_or_else(|| IlError::NotFound(format!("method token {:?}", handle.method.0)))?;
        let flat: Vec<_> = m.blocks().flat_map(|(_, b)| b.instructions.iter()).collect();
        let instr = flat
            .get(handle.index as usize)
            .ok_or_else(|| IlError::NotFound(format!("instruction index {}", handle.index)))?;
        Ok(InstructionInfo {
            mnemonic: instr.mnemonic.clone(),
            operand: self.classify_operand(&instr.mnemonic, &instr.operand, handle.method),
        })
    }

    pub fn exception_handler_info(&self, handle: ExceptionHandlerHandle) -> Result<ExceptionHandlerInfo> {
        let m = self
            .all_methods()
            .find(|m| m.token == handle.method.0)
            .ok_or_else(|| IlError::NotFound(format!("method token {:?}", handle.method.0)))?;
        let body = m.body.get().ok_or_else(|| IlError::NotFound("method body".into()))?;
        let eh = body
            .exception_handlers
            .get(handle.index as usize)
            .ok_or_else(|| IlError::NotFound(format!("exception handler {}", handle.index)))?;
        Ok(ExceptionHandlerInfo {
            kind: map_handler_kind(eh.kind),
            try_start: eh.try_offset,
            try_end: eh.try_offset + eh.try_length,
            handler_start: eh.handler_offset,
            handler_end: eh.handler_offset + eh.handler_length,
            filter_start: eh.filter_offset,
            catch_type: eh.catch_type.as_ref().map(|t| TypeSig::Named(full_name(&t.namespace, &t.name))),
        })
    }

    pub fn property_info(&self, handle: PropertyHandle) -> Result<PropertyInfo> {
        let p = self
            .all_properties()
            .find(|p| p.token == handle.0)
            .ok_or_else(|| IlError::NotFound(format!("property token {:?}", handle.0)))?;
        Ok(PropertyInfo {
            name: p.name.clone(),
            flags: p.flags,
            property_type: self.map_type_signature(&p.signature.base),
            getter: p.getter.get().and_then(|g| g.upgrade()).map(|m| MethodHandle(m.token)),
            setter: p.setter.get().and_then(|s| s.upgrade()).map(|m| MethodHandle(m.token)),
        })
    }

    pub fn event_info(&self, handle: EventHandle) -> Result<EventInfo> {
        let e = self
            .all_events()
            .find(|e| e.token == handle.0)
            .ok_or_else(|| IlError::NotFound(format!("event token {:?}", handle.0)))?;
        Ok(EventInfo {
            name: e.name.clone(),
            flags: e.flags,
            event_type: e.event_type.as_ref().map(|t| TypeSig::Named(full_name(&t.namespace, &t.name))).unwrap_or(TypeSig::Named(String::new())),
            add: e.add.get().and_then(|a| a.upgrade()).map(|m| MethodHandle(m.token)),
            remove: e.remove.get().and_then(|r| r.upgrade()).map(|m| MethodHandle(m.token)),
        })
    }

    pub fn generic_param_info(&self, handle: GenericParamHandle) -> Result<GenericParamInfo> {
        for t in self.obj.types().all_types().iter() {
            if let Some(gp) = t.generic_params.iter().find(|g| g.token == handle.0) {
                return Ok(generic_param_info_of(gp, GenericOwnerHandle::Type(TypeHandle(t.token))));
            }
        }
        for m in self.all_methods() {
            if let Some(gp) = m.generic_params.iter().find(|g| g.token == handle.0) {
                return Ok(generic_param_info_of(gp, GenericOwnerHandle::Method(MethodHandle(m.token))));
            }
        }
        Err(IlError::NotFound(format!("generic param token {:?}", handle.0)))
    }

    fn all_fields(&self) -> impl Iterator<Item = &dotscope::metadata::typesystem::FieldDef> {
        self.obj.types().all_types().iter().flat_map(|t| t.fields.iter().filter_map(|(_, r)| r.upgrade()))
    }

    fn all_methods(&self) -> impl Iterator<Item = &dotscope::metadata::typesystem::MethodDef> {
        self.obj.types().all_types().iter().flat_map(|t| t.methods.iter().filter_map(|(_, r)| r.upgrade()))
    }

    fn all_params(&self) -> impl Iterator<Item = &dotscope::metadata::typesystem::ParamDef> {
        self.all_methods().flat_map(|m| m.params.iter().filter_map(|(_, r)| r.upgrade()))
    }

    fn all_properties(&self) -> impl Iterator<Item = &dotscope::metadata::typesystem::PropertyDef> {
        self.obj.types().all_types().iter().flat_map(|t| t.properties.iter().filter_map(|(_, r)| r.upgrade()))
    }

    fn all_events(&self) -> impl Iterator<Item = &dotscope::metadata::typesystem::EventDef> {
        self.obj.types().all_types().iter().flat_map(|t| t.events.iter().filter_map(|(_, r)| r.upgrade()))
    }

    fn resolve_type_fqn(&self, tok: Token) -> String {
        if let Some(t) = self.obj.types().all_types().iter().find(|t| t.token == tok) {
            return full_name(&t.namespace, &t.name);
        }
        if let Some(import) = self.obj.imports().cil().by_token(tok) {
            return full_name(&import.namespace, &import.name);
        }
        format!("#{:08x}", tok.value())
    }

    fn resolve_method_ref(&self, tok: Token) -> (String, String) {
        for t in self.obj.types().all_types().iter() {
            if let Some((_, r)) = t.methods.iter().find(|(_, r)| r.upgrade().map(|m| m.token == tok).unwrap_or(false)) {
                if let Some(m) = r.upgrade() {
                    return (full_name(&t.namespace, &t.name), m.name.clone());
                }
            }
        }
        if let Some(import) = self.obj.imports().cil().by_token(tok) {
            return (full_name(&import.namespace, &import.name), import.name.clone());
        }
        (format!("#{:08x}", tok.value()), String::new())
    }

    /// Every custom attribute attached directly to `owner` (a `TypeDef`,
    /// `MethodDef`, `FieldDef`, `Param`, `Property`, or `Event` token), read
    /// straight off the raw `CustomAttribute` table rather than through the
    /// decoded object model — dotscope's higher-level types only expose a
    /// count for these (`custom_attributes.iter().count()`), not decoded
    /// argument values, so weaving reads the blob itself.
    pub fn custom_attributes_on(&self, owner: Token) -> Result<Vec<RawCustomAttribute>> {
        let tables = self.obj.tables().map_err(IlError::from)?;
        let Some(table) = tables.table::<dotscope::metadata::tables::CustomAttributeRaw>() else {
            return Ok(Vec::new());
        };
        let blob_heap = self.obj.blob();
        let mut out = Vec::new();
        for row in table.iter() {
            if row.parent.token != owner {
                continue;
            }
            let constructor = row.constructor.token;
            let blob = blob_heap
                .as_ref()
                .and_then(|h| h.get(row.value as usize).ok())
                .map(|b| b.to_vec())
                .unwrap_or_default();
            let (ctor_owner, ctor_name) = self.resolve_method_ref(constructor);
            out.push(RawCustomAttribute {
                constructor,
                ctor_owner: TypeSig::Named(ctor_owner),
                ctor_name,
                ctor_params: self.ctor_param_types(constructor)?,
                blob,
            });
        }
        Ok(out)
    }

    /// Constructor parameter types, needed to decode a custom attribute's
    /// fixed-argument blob. Local constructors already carry a decoded
    /// signature; an external constructor's comes from its own `MemberRef`
    /// signature blob. `decode_method_signature` mirrors
    /// `encode_method_signature` on the write side and was not directly
    /// exercised by any vendored test (see `DESIGN.md`).
    fn ctor_param_types(&self, tok: Token) -> Result<Vec<TypeSig>> {
        if let Some(m) = self.all_methods().find(|m| m.token == tok) {
            return Ok(m.signature.params.iter().map(|p| self.map_type_signature(&p.base)).collect());
        }
        let tables = self.obj.tables().map_err(IlError::from)?;
        if let Some(table) = tables.table::<dotscope::metadata::tables::MemberRefRaw>() {
            if let Some(row) = table.iter().find(|r| r.token == tok) {
                if let Some(blob_heap) = self.obj.blob() {
                    if let Ok(bytes) = blob_heap.get(row.signature as usize) {
                        if let Ok(sig) = dotscope::metadata::signatures::decode_method_signature(bytes) {
                            return Ok(sig.params.iter().map(|p| self.map_type_signature(&p.base)).collect());
                        }
                    }
                }
            }
        }
        Ok(Vec::new())
    }

    fn resolve_field_ref(&self, tok: Token) -> (String, String) {
        for t in self.obj.types().all_types().iter() {
            if let Some((_, r)) = t.fields.iter().find(|(_, r)| r.upgrade().map(|f| f.token == tok).unwrap_or(false)) {
                if let Some(f) = r.upgrade() {
                    return (full_name(&t.namespace, &t.name), f.name.clone());
                }
            }
        }
        if let Some(import) = self.obj.imports().cil().by_token(tok) {
            return (full_name(&import.namespace, &import.name), import.name.clone());
        }
        (format!("#{:08x}", tok.value()), String::new())
    }
}

fn full_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn linear_instruction_count(m: &dotscope::metadata::typesystem::MethodDef) -> u32 {
    m.blocks().map(|(_, b)| b.instructions.len() as u32).sum()
}

fn map_handler_kind(kind: dotscope::metadata::tables::ExceptionHandlerKind) -> ExceptionHandlerKind {
    use dotscope::metadata::tables::ExceptionHandlerKind as K;
    match kind {
        K::Catch => ExceptionHandlerKind::Catch,
        K::Filter => ExceptionHandlerKind::Filter,
        K::Finally => ExceptionHandlerKind::Finally,
        K::Fault => ExceptionHandlerKind::Fault,
    }
}

fn constant_from_default(blob: &[u8]) -> Option<PrimitiveValue> {
    match blob.len() {
        1 => Some(PrimitiveValue::Byte(blob[0])),
        4 => Some(PrimitiveValue::I32(i32::from_le_bytes(blob.try_into().ok()?))),
        8 => Some(PrimitiveValue::I64(i64::from_le_bytes(blob.try_into().ok()?))),
        _ => None,
    }
}

fn generic_param_info_of(gp: &dotscope::metadata::typesystem::GenericParam, owner: GenericOwnerHandle) -> GenericParamInfo {
    GenericParamInfo {
        name: gp.name.clone(),
        index: gp.number as u32,
        flags: gp.flags as u32,
        owner,
        constraints: gp
            .constraints
            .iter()
            .filter_map(|c| c.upgrade())
            .map(|c| TypeSig::Named(full_name(&c.namespace, &c.name)))
            .collect(),
    }
}

impl SourceModule {
    /// Maps dotscope's decoded signature element to the structural
    /// reference union the rest of the engine works with, resolving
    /// `Class`/`ValueType` tokens to fully-qualified names eagerly so
    /// later name-based lookups never see a bare token.
    pub fn map_type_signature(&self, ts: &TypeSignature) -> TypeSig {
        match ts {
            TypeSignature::Void => TypeSig::Primitive("System.Void"),
            TypeSignature::Boolean => TypeSig::Primitive("System.Boolean"),
            TypeSignature::Char => TypeSig::Primitive("System.Char"),
            TypeSignature::I1 => TypeSig::Primitive("System.SByte"),
            TypeSignature::U1 => TypeSig::Primitive("System.Byte"),
            TypeSignature::I2 => TypeSig::Primitive("System.Int16"),
            TypeSignature::U2 => TypeSig::Primitive("System.UInt16"),
            TypeSignature::I4 => TypeSig::Primitive("System.Int32"),
            TypeSignature::U4 => TypeSig::Primitive("System.UInt32"),
            TypeSignature::I8 => TypeSig::Primitive("System.Int64"),
            TypeSignature::U8 => TypeSig::Primitive("System.UInt64"),
            TypeSignature::R4 => TypeSig::Primitive("System.Single"),
            TypeSignature::R8 => TypeSig::Primitive("System.Double"),
            TypeSignature::String => TypeSig::Primitive("System.String"),
            TypeSignature::Object => TypeSig::Primitive("System.Object"),
            TypeSignature::I => TypeSig::Primitive("System.IntPtr"),
            TypeSignature::U => TypeSig::Primitive("System.UIntPtr"),
            TypeSignature::ByRef(inner) => TypeSig::ByRef(Box::new(self.map_type_signature(inner))),
            TypeSignature::SzArray(inner) => TypeSig::Array(Box::new(self.map_type_signature(inner)), 1),
            TypeSignature::Array(inner, shape) => {
                TypeSig::Array(Box::new(self.map_type_signature(inner)), shape.rank)
            }
            TypeSignature::GenericInstance(base, args) => TypeSig::GenericInstance(
                Box::new(self.map_type_signature(base)),
                args.iter().map(|a| self.map_type_signature(a)).collect(),
            ),
            TypeSignature::Var(index) => TypeSig::GenericParameter {
                owner: crate::signature::GenericParamOwnerRef::Type(TypeHandle(Token::new(0))),
                index: *index,
            },
            TypeSignature::MVar(index) => TypeSig::GenericParameter {
                owner: crate::signature::GenericParamOwnerRef::Method(MethodHandle(Token::new(0))),
                index: *index,
            },
            TypeSignature::Class(tok) | TypeSignature::ValueType(tok) => {
                TypeSig::Named(self.resolve_type_fqn(*tok))
            }
            _ => TypeSig::Named("<unsupported>".into()),
        }
    }
}

impl SourceModule {
    fn classify_operand(
        &self,
        mnemonic: &str,
        raw: &dotscope::disassembler::Operand,
        method: MethodHandle,
    ) -> Operand {
        use dotscope::disassembler::Operand as RawOperand;

        match raw {
            RawOperand::None => classify_implicit(mnemonic, method),
            RawOperand::Token(tok) => self.classify_token(mnemonic, *tok),
            RawOperand::Int8(v) => Operand::Primitive(PrimitiveValue::I32(*v as i32)),
            RawOperand::Int32(v) => Operand::Primitive(PrimitiveValue::I32(*v)),
            RawOperand::Int64(v) => Operand::Primitive(PrimitiveValue::I64(*v)),
            RawOperand::Float32(v) => Operand::Primitive(PrimitiveValue::F32(*v)),
            RawOperand::Float64(v) => Operand::Primitive(PrimitiveValue::F64(*v)),
            RawOperand::Variable(slot) => Operand::Variable(VariableHandle { method, index: *slot }),
            RawOperand::Argument(slot) => Operand::Param(*slot),
            RawOperand::BranchTarget(target) => {
                Operand::Branch(InstructionHandle { method, index: *target as u32 })
            }
            RawOperand::Switch(targets) => Operand::BranchTable(
                targets
                    .iter()
                    .map(|t| InstructionHandle { method, index: *t as u32 })
                    .collect(),
            ),
            RawOperand::String(s) => Operand::String(s.clone()),
        }
    }

    fn classify_token(&self, mnemonic: &str, tok: Token) -> Operand {
        match mnemonic {
            "call" | "callvirt" | "newobj" | "ldftn" | "ldvirtftn" => {
                let (owner, name) = self.resolve_method_ref(tok);
                Operand::Method { owner: TypeSig::Named(owner), name, signature: unresolved_sig() }
            }
            "ldfld" | "stfld" | "ldflda" | "ldsfld" | "stsfld" | "ldsflda" => {
                let (owner, name) = self.resolve_field_ref(tok);
                Operand::Field { owner: TypeSig::Named(owner), name }
            }
            "ldstr" => Operand::String(self.resolve_user_string(tok)),
            _ => Operand::Type(TypeSig::Named(self.resolve_type_fqn(tok))),
        }
    }

    /// `ldstr` tokens index the `#US` heap by offset (the token's low 24
    /// bits), not the metadata tables `resolve_type_fqn`/`resolve_method_ref`
    /// walk.
    fn resolve_user_string(&self, tok: Token) -> String {
        let offset = tok.value() & 0x00ff_ffff;
        self.obj
            .userstrings()
            .and_then(|heap| heap.iter().find(|(o, _)| *o as u32 == offset).map(|(_, s)| s.to_string()))
            .unwrap_or_default()
    }
}

fn classify_implicit(mnemonic: &str, method: MethodHandle) -> Operand {
    if let Some(rest) = mnemonic.strip_prefix("ldarg.").or_else(|| mnemonic.strip_prefix("starg.")) {
        if let Ok(n) = rest.parse::<u16>() {
            return Operand::Param(n);
        }
    }
    if let Some(rest) = mnemonic.strip_prefix("ldloc.").or_else(|| mnemonic.strip_prefix("stloc.")) {
        if let Ok(n) = rest.parse::<u16>() {
            return Operand::Variable(VariableHandle { method, index: n });
        }
    }
    Operand::None
}

fn unresolved_sig() -> MethodSigRef {
    MethodSigRef {
        has_this: false,
        generic_arity: 0,
        return_type: TypeSig::Primitive("System.Void"),
        params: Vec::new(),
        generic_args: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_namespace_and_name_only_when_namespaced() {
        assert_eq!(full_name("My.Namespace", "Thing"), "My.Namespace.Thing");
        assert_eq!(full_name("", "Thing"), "Thing");
    }

    #[test]
    fn constant_from_default_decodes_by_blob_width() {
        assert_eq!(constant_from_default(&[7]), Some(PrimitiveValue::Byte(7)));
        assert_eq!(constant_from_default(&42i32.to_le_bytes()), Some(PrimitiveValue::I32(42)));
        assert_eq!(constant_from_default(&(-9i64).to_le_bytes()), Some(PrimitiveValue::I64(-9)));
        assert_eq!(constant_from_default(&[1, 2, 3]), None);
    }

    #[test]
    fn classify_implicit_recognizes_short_form_ldarg_and_ldloc() {
        let method = MethodHandle(Token::new(1));
        assert_eq!(classify_implicit("ldarg.2", method), Operand::Param(2));
        assert_eq!(classify_implicit("starg.0", method), Operand::Param(0));
        assert_eq!(
            classify_implicit("ldloc.1", method),
            Operand::Variable(VariableHandle { method, index: 1 })
        );
        assert_eq!(classify_implicit("nop", method), Operand::None);
    }
}
