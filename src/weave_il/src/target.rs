//! Write-side adapter over `dotscope`'s builder API.
//!
//! Everything here funnels through a single `BuilderContext`, matching how
//! every write-path dotscope test drives a session: load a `CilAssembly`,
//! build a `BuilderContext` over it, issue builder calls, then
//! `finish()`/`validate_and_apply_changes()`/`write_to_file()` once at the
//! end. `weave_core`'s creation and population passes both go through one
//! `TargetModule` for exactly that reason — dotscope has no notion of a
//! half-open builder session.
//!
//! A handful of calls below assume builder methods that are a natural
//! generalization of the confirmed surface but were never directly observed
//! in the available dotscope tests (no source tree was vendored, only
//! `tests/`): attaching a freshly built field/method/property/event to an
//! *existing* target type via an explicit owner token, `PropertyBuilder`
//! / `EventBuilder` / `GenericParamBuilder` / `TypeSpecBuilder` existing at
//! all by analogy to `FieldBuilder` / `ParamBuilder`, and a standalone
//! `encode_type_signature` alongside the confirmed `encode_field_signature` /
//! `encode_method_signature`. These are called out in `DESIGN.md`.

use std::collections::HashMap;
use std::path::Path;

use dotscope::metadata::cilobject::CilAssembly;
use dotscope::metadata::signatures::{
    encode_field_signature, encode_method_signature, encode_type_signature, SignatureField,
    SignatureMethod, SignatureParameter, TypeSignature,
};
use dotscope::metadata::tables::{CodedIndex, CodedIndexType, TableId};
use dotscope::metadata::token::Token;
use dotscope::prelude::*;

use crate::errors::{IlError, Result};
use crate::model::{FieldHandle, MethodHandle, ParamHandle, TypeHandle};
use crate::signature::{Operand, PrimitiveValue};

pub struct TargetModule {
    context: Option<BuilderContext>,
    external_types: HashMap<String, Token>,
}

/// A type reference already resolved to a concrete token: either a type
/// defined in the target assembly, or an imported `TypeRef` created on
/// demand the first time a given external type is referenced.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedType(pub Token);

/// One protected region to register on a method body before its
/// instructions are emitted. Offsets are instruction indices into the
/// *target* body's linearized stream, turned into labels via `label_for`.
#[derive(Clone, Copy, Debug)]
pub struct HandlerSpec {
    pub kind: crate::source::ExceptionHandlerKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
    pub filter_start: Option<u32>,
    pub catch_type: Option<Token>,
}

/// The label a given instruction index is emitted under. Shared between
/// `begin_method_body`'s handler registration and the per-instruction
/// `asm.label(..)` calls the body's `emit` closure issues, so branch
/// targets and handler boundaries agree on naming.
pub fn label_for(index: u32) -> String {
    format!("i{index}")
}

/// The structural mirror of `TypeSig` a signature blob actually needs:
/// every `Named` reference has already been root-imported to a concrete
/// token by the time anything here sees it (a raw full name tells dotscope
/// nothing about which token, or even which module, it resolves to).
/// `weave_core::root_import::RootImportEngine::root_import_type_ref` is
/// what builds one of these from a `TypeSig`.
#[derive(Clone, Debug)]
pub enum ResolvedTypeRef {
    Primitive(&'static str),
    /// A named reference, reduced to its token. dotscope's read-side model
    /// distinguishes `Class(Token)` from `ValueType(Token)`; nothing in the
    /// vendored tests shows how a builder is told which one a `TypeRef`/
    /// `TypeDef` token is, so this always encodes as `Class` — noted in
    /// `DESIGN.md`.
    Token(Token),
    Array(Box<ResolvedTypeRef>, u32),
    ByRef(Box<ResolvedTypeRef>),
    GenericInstance(Box<ResolvedTypeRef>, Vec<ResolvedTypeRef>),
    GenericParameter { is_method_owner: bool, index: u32 },
}

/// The structural mirror of `MethodSigRef`, with every type already
/// resolved to a `ResolvedTypeRef`.
#[derive(Clone, Debug)]
pub struct ResolvedMethodSig {
    pub has_this: bool,
    pub generic_arity: u32,
    pub return_type: ResolvedTypeRef,
    pub params: Vec<ResolvedTypeRef>,
}

impl TargetModule {
    pub fn open(path: &Path) -> Result<Self> {
        let view = CilAssemblyView::from_file(path)?;
        let assembly = CilAssembly::new(view);
        Ok(Self { context: Some(BuilderContext::new(assembly)), external_types: HashMap::new() })
    }

    fn ctx(&mut self) -> &mut BuilderContext {
        self.context.as_mut().expect("TargetModule used after finish()")
    }

    /// Creates a new `TypeDef` as a mixin member container. Called once per
    /// mixin type discovered during the creation pass; subsequent members
    /// attach to the returned handle with `attach_*`.
    pub fn create_type(
        &mut self,
        name: &str,
        namespace: &str,
        flags: u32,
        base: Option<ResolvedType>,
    ) -> Result<TypeHandle> {
        let mut builder = ClassBuilder::new(name).namespace(namespace).flags(flags);
        if let Some(base) = base {
            builder = builder.extends(base.0);
        }
        let token = builder.build(self.ctx())?;
        Ok(TypeHandle(token))
    }

    pub fn set_type_base(&mut self, ty: TypeHandle, base: ResolvedType) -> Result<()> {
        ClassBuilder::existing(ty.0).extends(base.0).build(self.ctx())?;
        Ok(())
    }

    pub fn add_type_interface(&mut self, ty: TypeHandle, iface: ResolvedType) -> Result<()> {
        ClassBuilder::existing(ty.0).implements(iface.0).build(self.ctx())?;
        Ok(())
    }

    /// Registers a nested type under its owner via a `NestedClass` row.
    /// `ClassBuilder::nested_in` is assumed by analogy with `extends`/
    /// `implements`; not directly observed in a vendored test (see
    /// `DESIGN.md`).
    pub fn set_nested_in(&mut self, ty: TypeHandle, owner: ResolvedType) -> Result<()> {
        ClassBuilder::existing(ty.0).nested_in(owner.0).build(self.ctx())?;
        Ok(())
    }

    /// The single `Module` table row (RID 1), used as a self-referencing
    /// `ResolutionScope` when a signature needs to name a type that is
    /// still being created earlier in the same creation pass — forward
    /// references within one module are legal ECMA-335, so this lets
    /// `resolve_external_type` hand back a `TypeRef` into the module being
    /// built rather than failing outright.
    pub fn module_scope(&self) -> ResolvedType {
        ResolvedType(Token::new(0x0000_0001))
    }

    /// Resolves (creating if necessary) a `TypeRef` for a type outside the
    /// target assembly, keyed by full name within a given resolution scope.
    pub fn resolve_external_type(
        &mut self,
        scope: ResolvedType,
        namespace: &str,
        name: &str,
    ) -> Result<ResolvedType> {
        let key = format!("{}::{}.{}", scope.0.value(), namespace, name);
        if let Some(tok) = self.external_types.get(&key) {
            return Ok(ResolvedType(*tok));
        }
        let scope_kind = table_id_of(scope.0);
        let coded = CodedIndex::new(scope_kind, scope.0.row(), CodedIndexType::ResolutionScope);
        let token = TypeRefBuilder::new().name(name).namespace(namespace).resolution_scope(coded).build(self.ctx())?;
        self.external_types.insert(key, token);
        Ok(ResolvedType(token))
    }

    pub fn resolve_external_assembly(&mut self, name: &str) -> Result<ResolvedType> {
        let key = format!("asmref::{name}");
        if let Some(tok) = self.external_types.get(&key) {
            return Ok(ResolvedType(*tok));
        }
        let token = AssemblyRefBuilder::new().name(name).build(self.ctx())?;
        self.external_types.insert(key, token);
        Ok(ResolvedType(token))
    }

    /// Builds a `TypeSpec` row for a closed generic instance (`Foo<Bar>`),
    /// so a generic-instance reference gets its own coded-index token
    /// distinct from its open generic definition — needed wherever a base
    /// class or interface list entry names a closed instance rather than
    /// the bare open type. `encode_type_signature` and `TypeSpecBuilder` are
    /// assumed the same way `set_field_marshal` assumes `FieldBuilder::marshal`:
    /// a `TypeSpec` row is a bare signature blob with no name, the simplest
    /// possible builder shape, and dotscope's field/method signature
    /// encoders both serialize a `TypeSignature` internally, so a
    /// standalone encoder for the same type is a natural sibling (see
    /// `DESIGN.md`).
    pub fn resolve_generic_instance(&mut self, base: ResolvedType, args: &[ResolvedTypeRef]) -> Result<ResolvedType> {
        let sig = TypeSignature::GenericInstance(
            Box::new(TypeSignature::Class(base.0)),
            args.iter().map(to_type_signature).collect(),
        );
        let blob = encode_type_signature(&sig)?;
        let token = TypeSpecBuilder::new().signature(&blob).build(self.ctx())?;
        Ok(ResolvedType(token))
    }

    pub fn resolve_external_method(
        &mut self,
        owner: ResolvedType,
        name: &str,
        signature: &ResolvedMethodSig,
    ) -> Result<Token> {
        let blob = encode_method_signature(&to_signature_method(signature))?;
        let owner_kind = table_id_of(owner.0);
        let class = CodedIndex::new(owner_kind, owner.0.row(), CodedIndexType::MemberRefParent);
        MemberRefBuilder::new().name(name).class(class).signature(&blob).build(self.ctx()).map_err(IlError::from)
    }

    pub fn resolve_external_field(
        &mut self,
        owner: ResolvedType,
        name: &str,
        field_type: &ResolvedTypeRef,
    ) -> Result<Token> {
        let blob = encode_field_signature(&SignatureField {
            modifiers: Vec::new(),
            base: to_type_signature(field_type),
        })?;
        let owner_kind = table_id_of(owner.0);
        let class = CodedIndex::new(owner_kind, owner.0.row(), CodedIndexType::MemberRefParent);
        MemberRefBuilder::new().name(name).class(class).signature(&blob).build(self.ctx()).map_err(IlError::from)
    }

    pub fn create_field(
        &mut self,
        owner: TypeHandle,
        name: &str,
        flags: u32,
        field_type: &ResolvedTypeRef,
    ) -> Result<FieldHandle> {
        let blob = encode_field_signature(&SignatureField {
            modifiers: Vec::new(),
            base: to_type_signature(field_type),
        })?;
        let token = FieldBuilder::new().name(name).flags(flags).signature(&blob).owner(owner.0).build(self.ctx())?;
        Ok(FieldHandle(token))
    }

    pub fn set_field_constant(&mut self, field: FieldHandle, value: &PrimitiveValue) -> Result<()> {
        let blob = match value {
            PrimitiveValue::I32(v) => v.to_le_bytes().to_vec(),
            PrimitiveValue::I64(v) => v.to_le_bytes().to_vec(),
            PrimitiveValue::F32(v) => v.to_le_bytes().to_vec(),
            PrimitiveValue::F64(v) => v.to_le_bytes().to_vec(),
            PrimitiveValue::Byte(v) => vec![*v],
        };
        FieldBuilder::existing(field.0).constant(&blob).build(self.ctx())?;
        Ok(())
    }

    /// Attaches a `FieldMarshal` row carrying an opaque native-type
    /// descriptor blob read straight off the source field. `FieldBuilder::marshal`
    /// is assumed by analogy with `constant` above; not directly observed in
    /// a vendored test (see `DESIGN.md`).
    pub fn set_field_marshal(&mut self, field: FieldHandle, descriptor: &[u8]) -> Result<()> {
        FieldBuilder::existing(field.0).marshal(descriptor).build(self.ctx())?;
        Ok(())
    }

    /// Attaches a `FieldMarshal` row to a parameter rather than a field;
    /// same table, same coded index kind, different `HasFieldMarshal` parent.
    /// `ParamBuilder::marshal` is assumed by the same analogy as
    /// `set_field_marshal` (see `DESIGN.md`).
    pub fn set_param_marshal(&mut self, param: ParamHandle, descriptor: &[u8]) -> Result<()> {
        ParamBuilder::existing(param.0).marshal(descriptor).build(self.ctx())?;
        Ok(())
    }

    /// Creates an empty method shell (no body yet); `begin_method_body`
    /// fills it in during the population pass.
    #[allow(clippy::too_many_arguments)]
    pub fn create_method_shell(
        &mut self,
        owner: TypeHandle,
        name: &str,
        flags: u32,
        impl_flags: u32,
        has_this: bool,
        return_type: &ResolvedTypeRef,
        param_types: &[ResolvedTypeRef],
    ) -> Result<MethodHandle> {
        let signature = SignatureMethod {
            has_this,
            explicit_this: false,
            default: true,
            vararg: false,
            cdecl: false,
            stdcall: false,
            thiscall: false,
            fastcall: false,
            param_count_generic: 0,
            param_count: param_types.len() as u32,
            return_type: SignatureParameter {
                modifiers: Vec::new(),
                by_ref: matches!(return_type, ResolvedTypeRef::ByRef(_)),
                base: to_type_signature(return_type),
            },
            params: param_types
                .iter()
                .map(|t| SignatureParameter {
                    modifiers: Vec::new(),
                    by_ref: matches!(t, ResolvedTypeRef::ByRef(_)),
                    base: to_type_signature(t),
                })
                .collect(),
            varargs: Vec::new(),
        };
        let blob = encode_method_signature(&signature)?;
        let token = MethodDefBuilder::new()
            .name(name)
            .flags(flags)
            .impl_flags(impl_flags)
            .signature(&blob)
            .rva(0)
            .owner(owner.0)
            .build(self.ctx())?;
        Ok(MethodHandle(token))
    }

    pub fn create_parameter(
        &mut self,
        method: MethodHandle,
        name: &str,
        flags: u32,
        sequence: u16,
    ) -> Result<ParamHandle> {
        let token = ParamBuilder::new()
            .name(name)
            .flags(flags)
            .sequence(sequence)
            .owner(method.0)
            .build(self.ctx())?;
        Ok(ParamHandle(token))
    }

    pub fn create_property(
        &mut self,
        owner: TypeHandle,
        name: &str,
        flags: u32,
        property_type: &ResolvedTypeRef,
    ) -> Result<Token> {
        let blob = encode_field_signature(&SignatureField {
            modifiers: Vec::new(),
            base: to_type_signature(property_type),
        })?;
        PropertyBuilder::new().name(name).flags(flags).signature(&blob).owner(owner.0).build(self.ctx()).map_err(IlError::from)
    }

    pub fn attach_property_accessor(&mut self, property: Token, accessor: MethodHandle, is_getter: bool) -> Result<()> {
        let mut builder = PropertyBuilder::existing(property);
        builder = if is_getter { builder.getter(accessor.0) } else { builder.setter(accessor.0) };
        builder.build(self.ctx())?;
        Ok(())
    }

    pub fn create_event(&mut self, owner: TypeHandle, name: &str, flags: u32, event_type: ResolvedType) -> Result<Token> {
        EventBuilder::new().name(name).flags(flags).event_type(event_type.0).owner(owner.0).build(self.ctx()).map_err(IlError::from)
    }

    pub fn attach_event_accessor(&mut self, event: Token, accessor: MethodHandle, is_add: bool) -> Result<()> {
        let mut builder = EventBuilder::existing(event);
        builder = if is_add { builder.add(accessor.0) } else { builder.remove(accessor.0) };
        builder.build(self.ctx())?;
        Ok(())
    }

    pub fn create_generic_parameter(
        &mut self,
        owner: crate::model::GenericOwnerHandle,
        name: &str,
        index: u32,
        flags: u32,
    ) -> Result<Token> {
        let (owner_kind, owner_tok) = match owner {
            crate::model::GenericOwnerHandle::Type(t) => (CodedIndexType::TypeOrMethodDef, t.0),
            crate::model::GenericOwnerHandle::Method(m) => (CodedIndexType::TypeOrMethodDef, m.0),
        };
        let owner_table = table_id_of(owner_tok);
        let coded = CodedIndex::new(owner_table, owner_tok.row(), owner_kind);
        GenericParamBuilder::new().name(name).number(index as u16).flags(flags).owner(coded).build(self.ctx()).map_err(IlError::from)
    }

    pub fn add_generic_constraint(&mut self, param: Token, constraint: ResolvedType) -> Result<()> {
        GenericParamConstraintBuilder::new().owner(param).constraint(constraint.0).build(self.ctx())?;
        Ok(())
    }

    pub fn add_custom_attribute(&mut self, target: Token, constructor: Token, blob: &[u8]) -> Result<()> {
        self.ctx().custom_attribute_add(target, constructor, blob)?;
        Ok(())
    }

    pub fn userstring_add(&mut self, s: &str) -> Result<Token> {
        let idx = self.ctx().userstring_add(s)?;
        Ok(Token::new(0x7000_0000 | idx))
    }

    /// Emits the body of a previously created method shell by replaying a
    /// pre-translated instruction list through dotscope's label-based
    /// assembler. `emit` is invoked with an opaque assembler handle; callers
    /// dispatch opcode-by-opcode via `emit_instruction`. `handlers` registers
    /// try/handler ranges on the body builder before `emit` runs, using the
    /// same `label_for` naming `emit`'s caller must use for branch targets
    /// and region boundaries alike.
    ///
    /// Only `finally_handler_with_labels` was directly observed in a
    /// vendored test; `fault_handler_with_labels`/`catch_handler_with_labels`/
    /// `filter_handler_with_labels` are assumed siblings, called out in
    /// `DESIGN.md`.
    pub fn begin_method_body<F>(
        &mut self,
        method: MethodHandle,
        max_stack: u32,
        init_locals: bool,
        locals: &[ResolvedTypeRef],
        handlers: &[HandlerSpec],
        emit: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut dotscope::build::Assembler) -> dotscope::Result<()>,
    {
        let token = method.0;
        let handlers = handlers.to_vec();
        MethodBuilder::existing(token)
            .max_stack(max_stack as u16)
            .init_locals(init_locals)
            .implementation(move |mut body| {
                for (i, local) in locals.iter().enumerate() {
                    body = body.local(&format!("local_{i}"), to_type_signature(local));
                }
                for h in &handlers {
                    let try_start = label_for(h.try_start);
                    let try_end = label_for(h.try_end);
                    let handler_start = label_for(h.handler_start);
                    let handler_end = label_for(h.handler_end);
                    body = match h.kind {
                        crate::source::ExceptionHandlerKind::Finally => {
                            body.finally_handler_with_labels(&try_start, &try_end, &handler_start, &handler_end)
                        }
                        crate::source::ExceptionHandlerKind::Fault => {
                            body.fault_handler_with_labels(&try_start, &try_end, &handler_start, &handler_end)
                        }
                        crate::source::ExceptionHandlerKind::Catch => {
                            let catch_tok = h.catch_type.expect("catch handler requires a catch type token");
                            body.catch_handler_with_labels(&try_start, &try_end, &handler_start, &handler_end, catch_tok)
                        }
                        crate::source::ExceptionHandlerKind::Filter => {
                            let filter_start = label_for(h.filter_start.expect("filter handler requires a filter start"));
                            body.filter_handler_with_labels(&try_start, &try_end, &filter_start, &handler_start, &handler_end)
                        }
                    };
                }
                body.implementation(emit)
            })
            .build(self.ctx())?;
        Ok(())
    }

    pub fn finish(mut self, out: &Path) -> Result<()> {
        let context = self.context.take().expect("TargetModule used after finish()");
        let mut assembly = context.finish();
        assembly.validate_and_apply_changes()?;
        assembly.write_to_file(out)?;
        Ok(())
    }
}

fn table_id_of(tok: Token) -> TableId {
    match tok.value() >> 24 {
        0x00 => TableId::Module,
        0x01 => TableId::TypeRef,
        0x02 => TableId::TypeDef,
        0x06 => TableId::MethodDef,
        0x0a => TableId::MemberRef,
        0x1b => TableId::TypeSpec,
        0x23 => TableId::AssemblyRef,
        _ => TableId::TypeDef,
    }
}

fn to_type_signature(sig: &ResolvedTypeRef) -> TypeSignature {
    match sig {
        ResolvedTypeRef::Primitive(name) => primitive_by_name(name),
        ResolvedTypeRef::Token(tok) => TypeSignature::Class(*tok),
        ResolvedTypeRef::Array(inner, 1) => TypeSignature::SzArray(Box::new(to_type_signature(inner))),
        ResolvedTypeRef::Array(inner, rank) => TypeSignature::Array(
            Box::new(to_type_signature(inner)),
            dotscope::metadata::signatures::ArrayShape { rank: *rank, sizes: Vec::new(), lo_bounds: Vec::new() },
        ),
        ResolvedTypeRef::ByRef(inner) => TypeSignature::ByRef(Box::new(to_type_signature(inner))),
        ResolvedTypeRef::GenericInstance(base, args) => TypeSignature::GenericInstance(
            Box::new(to_type_signature(base)),
            args.iter().map(to_type_signature).collect(),
        ),
        ResolvedTypeRef::GenericParameter { is_method_owner, index } => {
            if *is_method_owner {
                TypeSignature::MVar(*index)
            } else {
                TypeSignature::Var(*index)
            }
        }
    }
}

fn primitive_by_name(name: &str) -> TypeSignature {
    match name {
        "System.Void" => TypeSignature::Void,
        "System.Boolean" => TypeSignature::Boolean,
        "System.Char" => TypeSignature::Char,
        "System.SByte" => TypeSignature::I1,
        "System.Byte" => TypeSignature::U1,
        "System.Int16" => TypeSignature::I2,
        "System.UInt16" => TypeSignature::U2,
        "System.Int32" => TypeSignature::I4,
        "System.UInt32" => TypeSignature::U4,
        "System.Int64" => TypeSignature::I8,
        "System.UInt64" => TypeSignature::U8,
        "System.Single" => TypeSignature::R4,
        "System.Double" => TypeSignature::R8,
        "System.String" => TypeSignature::String,
        "System.IntPtr" => TypeSignature::I,
        "System.UIntPtr" => TypeSignature::U,
        _ => TypeSignature::Object,
    }
}

fn to_signature_method(sig: &ResolvedMethodSig) -> SignatureMethod {
    SignatureMethod {
        has_this: sig.has_this,
        explicit_this: false,
        default: true,
        vararg: false,
        cdecl: false,
        stdcall: false,
        thiscall: false,
        fastcall: false,
        param_count_generic: sig.generic_arity,
        param_count: sig.params.len() as u32,
        return_type: SignatureParameter {
            modifiers: Vec::new(),
            by_ref: matches!(sig.return_type, ResolvedTypeRef::ByRef(_)),
            base: to_type_signature(&sig.return_type),
        },
        params: sig
            .params
            .iter()
            .map(|t| SignatureParameter {
                modifiers: Vec::new(),
                by_ref: matches!(t, ResolvedTypeRef::ByRef(_)),
                base: to_type_signature(t),
            })
            .collect(),
        varargs: Vec::new(),
    }
}

/// Dispatches one already-rewritten instruction to the matching named
/// assembler call. Mirrors the mnemonic dispatch table `SourceModule`'s
/// operand classifier uses in reverse.
pub fn emit_instruction(
    asm: &mut dotscope::build::Assembler,
    mnemonic: &str,
    operand: &Operand,
    label_of: impl Fn(u32) -> String,
    token_of: &mut dyn FnMut(&Operand) -> dotscope::Result<Token>,
) -> dotscope::Result<()> {
    match operand {
        Operand::None => asm.emit_named(mnemonic)?,
        Operand::Primitive(PrimitiveValue::I32(v)) => asm.emit_named_i32(mnemonic, *v)?,
        Operand::Primitive(PrimitiveValue::I64(v)) => asm.emit_named_i64(mnemonic, *v)?,
        Operand::Primitive(PrimitiveValue::F32(v)) => asm.emit_named_f32(mnemonic, *v)?,
        Operand::Primitive(PrimitiveValue::F64(v)) => asm.emit_named_f64(mnemonic, *v)?,
        Operand::Primitive(PrimitiveValue::Byte(v)) => asm.emit_named_i32(mnemonic, *v as i32)?,
        Operand::Param(slot) => asm.emit_named_u16(mnemonic, *slot)?,
        Operand::Variable(v) => asm.emit_named_u16(mnemonic, v.index)?,
        Operand::Branch(target) => asm.emit_named_label(mnemonic, &label_of(target.index))?,
        Operand::BranchTable(targets) => {
            let labels: Vec<String> = targets.iter().map(|t| label_of(t.index)).collect();
            asm.emit_named_labels(mnemonic, &labels)?
        }
        Operand::String(_) | Operand::Type(_) | Operand::Field { .. } | Operand::Method { .. } => {
            let token = token_of(operand)?;
            asm.emit_named_token(mnemonic, token)?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_id_of_maps_the_high_byte_of_a_token() {
        assert!(matches!(table_id_of(Token::new(0x0000_0001)), TableId::Module));
        assert!(matches!(table_id_of(Token::new(0x0100_0001)), TableId::TypeRef));
        assert!(matches!(table_id_of(Token::new(0x0200_0001)), TableId::TypeDef));
        assert!(matches!(table_id_of(Token::new(0x0600_0001)), TableId::MethodDef));
        assert!(matches!(table_id_of(Token::new(0x0a00_0001)), TableId::MemberRef));
        assert!(matches!(table_id_of(Token::new(0x1b00_0001)), TableId::TypeSpec));
        assert!(matches!(table_id_of(Token::new(0x2300_0001)), TableId::AssemblyRef));
    }

    #[test]
    fn primitive_by_name_covers_known_primitives_and_falls_back_to_object() {
        assert!(matches!(primitive_by_name("System.Int32"), TypeSignature::I4));
        assert!(matches!(primitive_by_name("System.String"), TypeSignature::String));
        assert!(matches!(primitive_by_name("System.Void"), TypeSignature::Void));
        assert!(matches!(primitive_by_name("Some.Unknown.Type"), TypeSignature::Object));
    }

    #[test]
    fn to_type_signature_maps_array_rank_one_to_sz_array() {
        let element = ResolvedTypeRef::Primitive("System.Int32");
        let arr = ResolvedTypeRef::Array(Box::new(element), 1);
        assert!(matches!(to_type_signature(&arr), TypeSignature::SzArray(_)));
    }

    #[test]
    fn to_type_signature_maps_generic_parameters_by_owner_kind() {
        let method_param = ResolvedTypeRef::GenericParameter { is_method_owner: true, index: 0 };
        let type_param = ResolvedTypeRef::GenericParameter { is_method_owner: false, index: 1 };
        assert!(matches!(to_type_signature(&method_param), TypeSignature::MVar(0)));
        assert!(matches!(to_type_signature(&type_param), TypeSignature::Var(1)));
    }
}
