//! Bindings: rules producing a value for one key.
//!
//! A binding maps an ordered list of dependency requests to exactly one
//! produced key. User-declared bindings come from modules; synthetic
//! bindings (collections, optionals, component references) are
//! generated during graph assembly and never appear in input rows.

use crate::error::KernelError;
use crate::key::Key;
use crate::scope::ScopeTag;
use serde::{Deserialize, Serialize};

/// Identifier for a binding within a wiring spec.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BindingId(pub String);

impl BindingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a dependency is requested.
///
/// A deferred request is the only sanctioned way through a dependency
/// cycle: the value arrives as a handle observed after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMode {
    Direct,
    Deferred,
}

impl DependencyMode {
    pub fn is_deferred(&self) -> bool {
        matches!(self, DependencyMode::Deferred)
    }
}

/// One requested input of a binding (or an entry point of a component).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRequest {
    pub key: Key,
    pub mode: DependencyMode,
}

impl DependencyRequest {
    pub fn direct(key: Key) -> Self {
        Self {
            key,
            mode: DependencyMode::Direct,
        }
    }

    pub fn deferred(key: Key) -> Self {
        Self {
            key,
            mode: DependencyMode::Deferred,
        }
    }
}

/// Classification of binding rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// User rule wiring a type's own construction from its inputs.
    Constructor,
    /// User rule delegating to an opaque producer function.
    Factory,
    /// User rule aliasing one key to another (single pass-through dep).
    Alias,
    /// Synthetic: aggregates multibinding contributions into one value.
    Collection,
    /// Synthetic: present/absent wrapper over an underlying key.
    Optional,
    /// Synthetic: the component instance itself as an injectable value.
    ComponentRef,
}

impl BindingKind {
    /// Whether this kind is generated during graph assembly rather than
    /// declared by the user.
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self,
            BindingKind::Collection | BindingKind::Optional | BindingKind::ComponentRef
        )
    }

    /// String representation for reports and digests.
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Constructor => "constructor",
            BindingKind::Factory => "factory",
            BindingKind::Alias => "alias",
            BindingKind::Collection => "collection",
            BindingKind::Optional => "optional",
            BindingKind::ComponentRef => "component_ref",
        }
    }
}

/// A rule producing a value for exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: BindingId,
    pub key: Key,
    pub kind: BindingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeTag>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,
    /// A contribution into a declared multibinding collection. The
    /// produced key names the collection; graph assembly rewrites the
    /// contribution onto a synthetic element key.
    #[serde(default)]
    pub into_collection: bool,
}

impl Binding {
    fn user(
        id: impl Into<String>,
        key: Key,
        kind: BindingKind,
        dependencies: Vec<DependencyRequest>,
    ) -> Result<Self, KernelError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(KernelError::EmptyIdentifier("binding id".to_string()));
        }
        Ok(Self {
            id: BindingId::new(id),
            key,
            kind,
            scope: None,
            dependencies,
            into_collection: false,
        })
    }

    /// A constructor binding: builds `key` from its inputs.
    pub fn constructor(
        id: impl Into<String>,
        key: Key,
        dependencies: Vec<DependencyRequest>,
    ) -> Result<Self, KernelError> {
        Self::user(id, key, BindingKind::Constructor, dependencies)
    }

    /// A factory binding: delegates production of `key` to a provider.
    pub fn factory(
        id: impl Into<String>,
        key: Key,
        dependencies: Vec<DependencyRequest>,
    ) -> Result<Self, KernelError> {
        Self::user(id, key, BindingKind::Factory, dependencies)
    }

    /// An alias binding: `key` resolves to the value of `source`.
    pub fn alias(id: impl Into<String>, key: Key, source: Key) -> Result<Self, KernelError> {
        Self::user(
            id,
            key,
            BindingKind::Alias,
            vec![DependencyRequest::direct(source)],
        )
    }

    /// Attach a scope tag.
    pub fn scoped(mut self, scope: ScopeTag) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Mark this binding as a multibinding contribution.
    pub fn contributing(mut self) -> Self {
        self.into_collection = true;
        self
    }

    /// The dependency keys requested directly (not deferred).
    pub fn direct_dependency_keys(&self) -> Vec<&Key> {
        self.dependencies
            .iter()
            .filter(|request| !request.mode.is_deferred())
            .map(|request| &request.key)
            .collect()
    }
}
