//! The root-import engine: substitution of source references into the
//! target module's frame (§4.E).
//!
//! Modeled as mutually recursive cases over the tagged `TypeSig` union per
//! §9's design note, with one memoization table per reference kind, keyed
//! by the source's fully-qualified name as the spec prescribes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use weave_il::signature::GenericParamOwnerRef;
use weave_il::{MethodHandle, ParamHandle, SourceModule, TypeSig, VariableHandle};

use crate::errors::{Result, WeaveError};
use crate::registry::ClonerRegistry;
use crate::vertex::Vertex;

use weave_il::target::{ResolvedMethodSig, ResolvedType, ResolvedTypeRef, TargetModule};

fn type_sig_key(t: &TypeSig) -> String {
    match t {
        TypeSig::Primitive(n) => (*n).to_string(),
        TypeSig::Named(n) => n.clone(),
        TypeSig::Array(inner, rank) => format!("{}[{}]", type_sig_key(inner), rank),
        TypeSig::ByRef(inner) => format!("{}&", type_sig_key(inner)),
        TypeSig::GenericInstance(base, args) => format!(
            "{}<{}>",
            type_sig_key(base),
            args.iter().map(type_sig_key).collect::<Vec<_>>().join(",")
        ),
        TypeSig::GenericParameter { index, .. } => format!("!{index}"),
    }
}

/// An optional hook a reimplementer can install to rewrite open-generic
/// references to non-mixin types, per §9's open question. Left unset by
/// default, which preserves the legacy limitation: only closed generics
/// resolve through the ordinary importer.
pub type OpenGenericHook = Box<dyn Fn(&TypeSig) -> Option<TypeSig>>;

pub struct RootImportEngine {
    source: Rc<SourceModule>,
    registry: Rc<RefCell<ClonerRegistry>>,
    target: Rc<RefCell<TargetModule>>,
    module_scope: ResolvedType,

    type_cache: RefCell<HashMap<String, ResolvedType>>,
    field_cache: RefCell<HashMap<String, weave_il::FieldHandle>>,
    method_cache: RefCell<HashMap<String, MethodHandle>>,

    open_generic_hook: Option<OpenGenericHook>,
}

impl RootImportEngine {
    pub fn new(
        source: Rc<SourceModule>,
        registry: Rc<RefCell<ClonerRegistry>>,
        target: Rc<RefCell<TargetModule>>,
        module_scope: ResolvedType,
    ) -> Self {
        Self {
            source,
            registry,
            target,
            module_scope,
            type_cache: RefCell::new(HashMap::new()),
            field_cache: RefCell::new(HashMap::new()),
            method_cache: RefCell::new(HashMap::new()),
            open_generic_hook: None,
        }
    }

    pub fn with_open_generic_hook(mut self, hook: OpenGenericHook) -> Self {
        self.open_generic_hook = Some(hook);
        self
    }

    pub fn root_import_type(&self, ts: &TypeSig) -> Result<ResolvedType> {
        let key = type_sig_key(ts);
        if let Some(cached) = self.type_cache.borrow().get(&key) {
            return Ok(*cached);
        }

        let resolved = match ts {
            TypeSig::GenericParameter { owner, index } => {
                return self.root_import_generic_parameter(owner.clone(), *index);
            }
            TypeSig::Array(inner, _rank) => {
                // dotscope encodes SzArray/Array structurally in the
                // signature blob rather than as a standalone token; the
                // element still needs importing so its target exists by
                // the time a field/param/return signature is encoded.
                self.root_import_type(inner)?;
                self.module_scope
            }
            TypeSig::GenericInstance(base, args) => {
                // §4.E item 5 (import open definition, then import each
                // argument) describes the inputs, but the result callers
                // need is the *closed* instance, not the open definition —
                // a mixin type's `class Foo : List<int>` must resolve its
                // `Extends` row to `List<int>`, not the open `List<T>`.
                let open = self.root_import_type(base)?;
                let arg_refs =
                    args.iter().map(|a| self.root_import_type_ref(a)).collect::<Result<Vec<_>>>()?;
                self.target.borrow_mut().resolve_generic_instance(open, &arg_refs)?
            }
            TypeSig::Named(fqn) => {
                if let Some(mapped) = self.find_mixin_type_target(fqn) {
                    mapped
                } else {
                    self.import_external_named(fqn)?
                }
            }
            TypeSig::Primitive(_) | TypeSig::ByRef(_) => self.module_scope,
        };

        self.type_cache.borrow_mut().insert(key, resolved);
        Ok(resolved)
    }

    fn find_mixin_type_target(&self, fqn: &str) -> Option<ResolvedType> {
        let handle = self.source.find_type(fqn)?;
        let registry = self.registry.borrow();
        match registry.try_get_target_for(Vertex::Type(handle))? {
            Vertex::Type(t) => Some(ResolvedType(t.0)),
            _ => None,
        }
    }

    /// Builds the token-carrying structural mirror of a `TypeSig` that
    /// `TargetModule`'s signature-blob encoders need, reusing
    /// `root_import_type`'s cache and mixin-vs-external resolution for
    /// every `Named` occurrence.
    pub fn root_import_type_ref(&self, ts: &TypeSig) -> Result<ResolvedTypeRef> {
        Ok(match ts {
            TypeSig::Primitive(name) => ResolvedTypeRef::Primitive(name),
            TypeSig::Named(_) => ResolvedTypeRef::Token(self.root_import_type(ts)?.0),
            TypeSig::Array(inner, rank) => ResolvedTypeRef::Array(Box::new(self.root_import_type_ref(inner)?), *rank),
            TypeSig::ByRef(inner) => ResolvedTypeRef::ByRef(Box::new(self.root_import_type_ref(inner)?)),
            TypeSig::GenericInstance(base, args) => ResolvedTypeRef::GenericInstance(
                Box::new(self.root_import_type_ref(base)?),
                args.iter().map(|a| self.root_import_type_ref(a)).collect::<Result<Vec<_>>>()?,
            ),
            TypeSig::GenericParameter { owner, index } => ResolvedTypeRef::GenericParameter {
                is_method_owner: matches!(owner, GenericParamOwnerRef::Method(_)),
                index: *index,
            },
        })
    }

    /// Resolves every type in a method signature, for `resolve_external_method`.
    pub fn root_import_method_sig(&self, sig: &weave_il::signature::MethodSigRef) -> Result<ResolvedMethodSig> {
        Ok(ResolvedMethodSig {
            has_this: sig.has_this,
            generic_arity: sig.generic_arity,
            return_type: self.root_import_type_ref(&sig.return_type)?,
            params: sig.params.iter().map(|p| self.root_import_type_ref(p)).collect::<Result<Vec<_>>>()?,
        })
    }

    fn import_external_named(&self, fqn: &str) -> Result<ResolvedType> {
        if let Some(hook) = &self.open_generic_hook {
            if let Some(rewritten) = hook(&TypeSig::Named(fqn.to_string())) {
                return self.root_import_type(&rewritten);
            }
        }
        let (namespace, name) = split_fqn(fqn);
        self.target.borrow_mut().resolve_external_type(self.module_scope, namespace, name).map_err(WeaveError::from)
    }

    pub fn root_import_generic_parameter(
        &self,
        owner: weave_il::signature::GenericParamOwnerRef,
        index: u32,
    ) -> Result<ResolvedType> {
        let owner_vertex = match owner {
            weave_il::signature::GenericParamOwnerRef::Type(t) => Vertex::Type(t),
            weave_il::signature::GenericParamOwnerRef::Method(m) => Vertex::Method(m),
        };
        let registry = self.registry.borrow();
        match registry.try_get_target_for(owner_vertex) {
            None => Err(WeaveError::UnknownGenericParameter(format!(
                "no registered owner for generic parameter {index} of {owner_vertex:?}"
            ))),
            Some(_) => {
                // The owner's target exists, but the generic parameter's
                // own target is materialized by `GenericParameterCloner`
                // and keyed as its own vertex, not derivable from the
                // owner alone; callers resolve it by looking up the
                // specific `GenericParamHandle` vertex through the registry
                // directly rather than through this helper.
                Err(WeaveError::UnmaterializedGenericParameter(format!(
                    "generic parameter index {index}"
                )))
            }
        }
    }

    /// Mirrors §4.E's "field reference": if the source field itself is a
    /// mixin member already in the registry, use its cloned target;
    /// otherwise delegate to the metadata importer as an external
    /// `MemberRef`. The earlier revision skipped the registry check and
    /// always emitted a `MemberRef` — harmless for the new field's identity
    /// (a `MemberRef` pointing at a `FieldDef` in the same assembly still
    /// resolves) but wrong for signature fidelity, so mixin fields now
    /// resolve to the real cloned `FieldDef` directly.
    pub fn root_import_field(&self, owner: &TypeSig, name: &str) -> Result<weave_il::FieldHandle> {
        let key = format!("{}::{name}", type_sig_key(owner));
        if let Some(cached) = self.field_cache.borrow().get(&key) {
            return Ok(*cached);
        }

        let handle = match self.find_local_field(owner, name)? {
            Some(h) => h,
            None => {
                let owner_resolved = self.root_import_type(owner)?;
                // The exact field type only matters for matching an
                // existing MemberRef signature byte-for-byte; `System.Object`
                // is a placeholder until custom-attribute/field-ref type
                // plumbing carries the real one through (see `DESIGN.md`).
                let token = self.target.borrow_mut().resolve_external_field(
                    owner_resolved,
                    name,
                    &ResolvedTypeRef::Primitive("System.Object"),
                )?;
                weave_il::FieldHandle(token)
            }
        };
        self.field_cache.borrow_mut().insert(key, handle);
        Ok(handle)
    }

    fn find_local_field(&self, owner: &TypeSig, name: &str) -> Result<Option<weave_il::FieldHandle>> {
        let TypeSig::Named(fqn) = owner else { return Ok(None) };
        let Some(owner_handle) = self.source.find_type(fqn) else { return Ok(None) };
        let owner_info = self.source.type_info(owner_handle)?;
        for f in &owner_info.fields {
            let info = self.source.field_info(*f)?;
            if info.name == name {
                return Ok(self.registry.borrow().try_get_target_for(Vertex::Field(*f)).and_then(|t| match t {
                    Vertex::Field(t) => Some(t),
                    _ => None,
                }));
            }
        }
        Ok(None)
    }

    /// Mirrors §4.E's "method reference, non-generic case": a call whose
    /// declaring type is a mixin member resolves to the already-cloned
    /// method definition rather than a fresh `MemberRef`; only a call into a
    /// type outside the cloning closure goes through the metadata importer.
    /// Matching "the local method" is done by name and parameter count;
    /// overloaded mixin methods sharing a name and arity are a known gap,
    /// noted in `DESIGN.md`. `find_local_method` also only matches a
    /// `TypeSig::Named` owner — a call whose declaring type is itself a
    /// closed generic instance of a mixin type (`Outer<int>.Method()`) falls
    /// through to the external-`MemberRef` path below rather than resolving
    /// to the already-cloned method, a second known gap noted in
    /// `DESIGN.md`.
    pub fn root_import_method(
        &self,
        owner: &TypeSig,
        name: &str,
        signature: &weave_il::signature::MethodSigRef,
    ) -> Result<MethodHandle> {
        let key = format!("{}::{name}({})", type_sig_key(owner), signature.params.len());
        if let Some(cached) = self.method_cache.borrow().get(&key) {
            return Ok(*cached);
        }

        let handle = match self.find_local_method(owner, name, signature)? {
            Some(h) => h,
            None => {
                let owner_resolved = self
                    .root_import_type(owner)
                    .map_err(|_| WeaveError::UnresolvedDeclaringType(name.to_string()))?;
                let resolved_sig = self.root_import_method_sig(signature)?;
                let token = self.target.borrow_mut().resolve_external_method(owner_resolved, name, &resolved_sig)?;
                MethodHandle(token)
            }
        };
        self.method_cache.borrow_mut().insert(key, handle);
        Ok(handle)
    }

    fn find_local_method(
        &self,
        owner: &TypeSig,
        name: &str,
        signature: &weave_il::signature::MethodSigRef,
    ) -> Result<Option<MethodHandle>> {
        let TypeSig::Named(fqn) = owner else { return Ok(None) };
        let Some(owner_handle) = self.source.find_type(fqn) else { return Ok(None) };
        // An in-module type that is not itself part of the cloning closure
        // (the registry has no target for it) is not a mixin owner; fall
        // through to the external path like any non-mixin reference.
        if self.registry.borrow().try_get_target_for(Vertex::Type(owner_handle)).is_none() {
            return Ok(None);
        }
        let owner_info = self.source.type_info(owner_handle)?;
        for m in &owner_info.methods {
            let info = self.source.method_info(*m)?;
            if info.name == name && info.params.len() == signature.params.len() {
                return match self.registry.borrow().try_get_target_for(Vertex::Method(*m)) {
                    Some(Vertex::Method(t)) => Ok(Some(t)),
                    _ => Err(WeaveError::SignatureMatchMissing {
                        declaring_type: fqn.clone(),
                        method: name.to_string(),
                    }),
                };
            }
        }
        Err(WeaveError::SignatureMatchMissing { declaring_type: fqn.clone(), method: name.to_string() })
    }

    /// Parameters, variables, and instructions are only ever meaningful
    /// inside the cloning closure; references outside it pass through
    /// unchanged rather than round-tripping through a cache.
    pub fn root_import_param(&self, p: ParamHandle) -> Option<ParamHandle> {
        match self.registry.borrow().try_get_target_for(Vertex::Parameter(p))? {
            Vertex::Parameter(t) => Some(t),
            _ => None,
        }
    }

    pub fn root_import_variable(&self, v: VariableHandle) -> Option<VariableHandle> {
        match self.registry.borrow().try_get_target_for(Vertex::Variable(v))? {
            Vertex::Variable(t) => Some(t),
            _ => None,
        }
    }

    pub fn root_import_instruction(&self, i: weave_il::InstructionHandle) -> Option<weave_il::InstructionHandle> {
        match self.registry.borrow().try_get_target_for(Vertex::Instruction(i))? {
            Vertex::Instruction(t) => Some(t),
            _ => None,
        }
    }

    /// Looks up the already-cloned target of a local mixin method by its
    /// source handle, e.g. a property accessor or event add/remove method
    /// whose own cloner has already created its shell.
    pub fn root_import_local_method(&self, m: MethodHandle) -> Option<MethodHandle> {
        match self.registry.borrow().try_get_target_for(Vertex::Method(m))? {
            Vertex::Method(t) => Some(t),
            _ => None,
        }
    }
}

fn split_fqn(fqn: &str) -> (&str, &str) {
    match fqn.rfind('.') {
        Some(idx) => (&fqn[..idx], &fqn[idx + 1..]),
        None => ("", fqn),
    }
}
