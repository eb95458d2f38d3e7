//! Weave-wide options (§6 "Configuration options recognized").

use weave_il::{RawCustomAttribute, TypeSig};

#[derive(Clone, Debug, Default)]
pub struct WeaveOptions {
    /// Full name of the attribute that marks a member "exclude me from
    /// cloning" (*skip-constructor-mark*). `None` disables the check.
    pub skip_attribute: Option<String>,
    /// Full names of attributes considered meta on the source root —
    /// describing the weave itself rather than something to propagate
    /// (*custom-attribute-filter*). Only checked against the root type's
    /// own attributes; every other member's attributes always propagate.
    pub attribute_filter: Vec<String>,
}

impl WeaveOptions {
    pub fn is_skip_marked(&self, attrs: &[RawCustomAttribute]) -> bool {
        match &self.skip_attribute {
            Some(marker) => attrs.iter().any(|a| matches!(&a.ctor_owner, TypeSig::Named(n) if n == marker)),
            None => false,
        }
    }

    pub fn is_meta_attribute(&self, ctor_owner_fqn: &str) -> bool {
        self.attribute_filter.iter().any(|f| f == ctor_owner_fqn)
    }
}
