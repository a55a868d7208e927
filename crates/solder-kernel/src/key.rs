//! Keys: the identity of a requested value.
//!
//! A key is a canonical type name plus at most one qualifier. Equality
//! is structural, and boxed-primitive spellings collapse to their
//! unboxed form at construction, so unboxing-equivalent types are
//! identity-same.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};

/// Boxed-primitive aliases. Left spellings canonicalize to the right.
const UNBOXED_ALIASES: &[(&str, &str)] = &[
    ("Integer", "int"),
    ("Long", "long"),
    ("Short", "short"),
    ("Byte", "byte"),
    ("Double", "double"),
    ("Float", "float"),
    ("Boolean", "bool"),
    ("boolean", "bool"),
    ("Character", "char"),
];

/// Canonicalize a raw type name: trim, reject blanks, collapse boxed
/// aliases. Returns `None` for blank input.
pub fn canonical_type_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for (alias, unboxed) in UNBOXED_ALIASES {
        if trimmed == *alias {
            return Some((*unboxed).to_string());
        }
    }
    Some(trimmed.to_string())
}

/// A qualifier distinguishing two keys of the same type.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Qualifier(pub String);

impl Qualifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Qualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The identity of an injectable value: canonical type plus at most one
/// qualifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<Qualifier>,
}

impl Key {
    /// An unqualified key.
    pub fn bare(type_name: impl AsRef<str>) -> Result<Self, KernelError> {
        let type_name =
            canonical_type_name(type_name.as_ref()).ok_or(KernelError::EmptyTypeName)?;
        Ok(Self {
            type_name,
            qualifier: None,
        })
    }

    /// A qualified key. A blank qualifier normalizes to no qualifier.
    pub fn qualified(
        type_name: impl AsRef<str>,
        qualifier: impl AsRef<str>,
    ) -> Result<Self, KernelError> {
        let mut key = Self::bare(type_name)?;
        let qualifier = qualifier.as_ref().trim();
        if !qualifier.is_empty() {
            key.qualifier = Some(Qualifier::new(qualifier));
        }
        Ok(key)
    }

    /// The canonical rendering used in reports and digests.
    pub fn canonical(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{} {qualifier}", self.type_name),
            None => self.type_name.clone(),
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
