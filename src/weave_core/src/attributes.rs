//! Custom-attribute cloning: a post-pass run once the population pass has
//! closed, rather than a vertex kind of its own (§4.E's "custom attribute
//! propagation" note). Attributes don't participate in the dependency graph
//! — they never reference a local variable, instruction, or exception
//! handler — so giving them a `Vertex` variant would only add sibling/parent
//! bookkeeping with no ordering payoff. Instead this walks every known
//! source/target pairing once discovery has closed and reattaches each
//! attribute directly.

use std::cell::RefCell;

use weave_il::signature::{CustomAttrArg, MethodSigRef};
use weave_il::target::TargetModule;
use weave_il::{CustomAttrValues, SourceModule, TypeSig};

use crate::config::WeaveOptions;
use crate::errors::Result;
use crate::registry::ClonerRegistry;
use crate::root_import::RootImportEngine;
use crate::vertex::Vertex;

fn token_of(v: Vertex) -> Option<dotscope::metadata::token::Token> {
    match v {
        Vertex::Type(h) => Some(h.0),
        Vertex::GenericParameter(h) => Some(h.0),
        Vertex::Field(h) => Some(h.0),
        Vertex::Method(h) => Some(h.0),
        Vertex::Parameter(h) => Some(h.0),
        Vertex::Property(h) => Some(h.0),
        Vertex::Event(h) => Some(h.0),
        Vertex::Variable(_) | Vertex::Instruction(_) | Vertex::ExceptionHandler(_) => None,
    }
}

/// Rewrites a fixed `Type` argument that names the source root to name the
/// target root instead; every other argument passes through unchanged. This
/// is the one structural edit this pass ever makes to a decoded blob — named
/// arguments and anything this decoder didn't understand are carried as an
/// opaque tail already.
fn rewrite_root_reference(arg: CustomAttrArg, root_source_fqn: &str, root_target_fqn: &str) -> CustomAttrArg {
    match arg {
        CustomAttrArg::Type(TypeSig::Named(fqn)) if fqn == root_source_fqn => {
            CustomAttrArg::Type(TypeSig::Named(root_target_fqn.to_string()))
        }
        other => other,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn clone_attributes(
    source: &SourceModule,
    registry: &ClonerRegistry,
    importer: &RootImportEngine,
    target: &RefCell<TargetModule>,
    options: &WeaveOptions,
    root_source: Vertex,
    root_source_fqn: &str,
    root_target_fqn: &str,
) -> Result<()> {
    for (source_vertex, target_vertex) in registry.all_targets() {
        let (Some(source_token), Some(target_token)) = (token_of(source_vertex), token_of(target_vertex)) else {
            continue;
        };
        let is_root = source_vertex == root_source;

        for attr in source.custom_attributes_on(source_token)? {
            let TypeSig::Named(ctor_owner_fqn) = &attr.ctor_owner else { continue };
            if is_root && options.is_meta_attribute(ctor_owner_fqn) {
                continue;
            }

            let ctor_sig = MethodSigRef {
                has_this: true,
                generic_arity: 0,
                return_type: TypeSig::Primitive("System.Void"),
                params: attr.ctor_params.clone(),
                generic_args: Vec::new(),
            };
            let ctor_handle = importer.root_import_method(&attr.ctor_owner, &attr.ctor_name, &ctor_sig)?;

            let blob = match weave_il::decode_custom_attribute_blob(&attr.ctor_params, &attr.blob) {
                Some(values) => {
                    let fixed_args = values
                        .fixed_args
                        .into_iter()
                        .map(|a| rewrite_root_reference(a, root_source_fqn, root_target_fqn))
                        .collect();
                    weave_il::encode_custom_attribute_blob(&CustomAttrValues {
                        fixed_args,
                        named_args_tail: values.named_args_tail,
                    })
                }
                None => attr.blob.clone(),
            };

            target.borrow_mut().add_custom_attribute(target_token, ctor_handle.0, &blob)?;
        }
    }
    Ok(())
}
