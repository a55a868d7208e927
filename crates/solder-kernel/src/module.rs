//! Modules: named bundles of binding declarations.

use crate::binding::Binding;
use crate::error::KernelError;
use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named source of bindings, installed into components by name.
///
/// Besides concrete bindings, a module may declare multibinding
/// collection keys (aggregated from contributions across all installed
/// modules) and optional keys (present exactly when the underlying key
/// is producible).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDecl {
    pub name: String,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Keys resolved by aggregating `into_collection` contributions.
    #[serde(default)]
    pub collections: Vec<Key>,
    /// Keys resolved to a present/absent wrapper over the same key.
    #[serde(default)]
    pub optionals: Vec<Key>,
}

impl ModuleDecl {
    pub fn new(name: impl Into<String>, bindings: Vec<Binding>) -> Result<Self, KernelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(KernelError::EmptyIdentifier("module name".to_string()));
        }
        let module = Self {
            name,
            bindings,
            collections: Vec::new(),
            optionals: Vec::new(),
        };
        module.check_binding_ids()?;
        Ok(module)
    }

    /// Declare a multibinding collection key.
    pub fn with_collection(mut self, key: Key) -> Self {
        self.collections.push(key);
        self
    }

    /// Declare an optional key.
    pub fn with_optional(mut self, key: Key) -> Self {
        self.optionals.push(key);
        self
    }

    /// Binding ids must be unique within a module. User declarations
    /// also must not use synthetic kinds.
    pub fn check_binding_ids(&self) -> Result<(), KernelError> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for binding in &self.bindings {
            if binding.kind.is_synthetic() {
                return Err(KernelError::SyntheticKindDeclared {
                    binding_id: binding.id.0.clone(),
                    kind: binding.kind.as_str().to_string(),
                });
            }
            if !seen.insert(binding.id.0.as_str()) {
                return Err(KernelError::DuplicateBindingId {
                    module: self.name.clone(),
                    binding_id: binding.id.0.clone(),
                });
            }
        }
        Ok(())
    }
}
