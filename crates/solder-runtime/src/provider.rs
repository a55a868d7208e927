//! Provider registry: user-supplied producer functions by binding id.
//!
//! Runtime values are JSON values. A provider receives the binding's
//! resolved dependencies in declaration order; a deferred request
//! arrives as a [`Deferred`] handle instead of an eager value.
//! Synthetic bindings (collections, optionals, component references,
//! aliases) execute inside the runtime and never consult the registry.

use crate::deferred::Deferred;
use crate::error::RuntimeError;
use serde_json::Value;
use solder_kernel::BindingId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One resolved input of a binding.
#[derive(Debug, Clone)]
pub enum ResolvedDep {
    Value(Value),
    Deferred(Deferred),
}

impl ResolvedDep {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResolvedDep::Value(value) => Some(value),
            ResolvedDep::Deferred(_) => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            ResolvedDep::Value(_) => None,
            ResolvedDep::Deferred(deferred) => Some(deferred),
        }
    }
}

/// A producer function for one user binding.
pub type ProviderFn = Arc<dyn Fn(&[ResolvedDep]) -> Result<Value, RuntimeError> + Send + Sync>;

/// Providers keyed by binding id.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<BindingId, ProviderFn>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for a binding id. A second registration for
    /// the same id replaces the first.
    pub fn register<F>(&mut self, id: impl Into<String>, provider: F)
    where
        F: Fn(&[ResolvedDep]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.providers
            .insert(BindingId::new(id), Arc::new(provider));
    }

    /// Register a provider producing a fixed value, ignoring inputs.
    pub fn literal(&mut self, id: impl Into<String>, value: Value) {
        self.register(id, move |_| Ok(value.clone()));
    }

    pub fn get(&self, id: &BindingId) -> Option<&ProviderFn> {
        self.providers.get(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field(
                "bindings",
                &self.providers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
