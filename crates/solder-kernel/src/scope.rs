//! Scope tags: cache-lifetime markers for bound values.
//!
//! A scope tag on a binding means the computed value is cached once per
//! matching component instance. The component tree constrains the
//! lattice: a subcomponent must not repeat an ancestor's tag.

use serde::{Deserialize, Serialize};

/// A scope tag carried by components and scoped bindings.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ScopeTag(pub String);

impl ScopeTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
