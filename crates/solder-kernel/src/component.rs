//! Component declarations: named scopes bundling modules and entry
//! points into a tree.
//!
//! A binding lookup in a subcomponent may resolve via any ancestor; the
//! binding is owned by the component where it is found. Scope tags on a
//! subcomponent must not repeat an ancestor's tags.

use crate::binding::DependencyRequest;
use crate::error::KernelError;
use crate::scope::ScopeTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Slash-joined path from the root component to a node in the tree,
/// e.g. `app/request`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ComponentPath(pub String);

impl ComponentPath {
    pub fn root(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_string())
    }

    pub fn child(&self, name: impl AsRef<str>) -> Self {
        Self(format!("{}/{}", self.0, name.as_ref()))
    }

    /// The parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('/').map(|(head, _)| Self(head.to_string()))
    }
}

impl std::fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A component: scope tags, installed modules, entry points, and nested
/// subcomponents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDecl {
    pub name: String,
    #[serde(default)]
    pub scopes: BTreeSet<ScopeTag>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub entry_points: Vec<DependencyRequest>,
    #[serde(default)]
    pub subcomponents: Vec<ComponentDecl>,
}

impl ComponentDecl {
    pub fn new(name: impl Into<String>) -> Result<Self, KernelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(KernelError::EmptyIdentifier("component name".to_string()));
        }
        Ok(Self {
            name,
            scopes: BTreeSet::new(),
            modules: Vec::new(),
            entry_points: Vec::new(),
            subcomponents: Vec::new(),
        })
    }

    pub fn with_scope(mut self, scope: ScopeTag) -> Self {
        self.scopes.insert(scope);
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }

    pub fn with_entry_point(mut self, request: DependencyRequest) -> Self {
        self.entry_points.push(request);
        self
    }

    pub fn with_subcomponent(mut self, child: ComponentDecl) -> Self {
        self.subcomponents.push(child);
        self
    }

    /// Visit this component and every descendant, depth-first, with the
    /// path from the root.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&ComponentPath, &'a ComponentDecl)) {
        fn inner<'a>(
            decl: &'a ComponentDecl,
            path: ComponentPath,
            visit: &mut dyn FnMut(&ComponentPath, &'a ComponentDecl),
        ) {
            visit(&path, decl);
            for child in &decl.subcomponents {
                inner(child, path.child(&child.name), visit);
            }
        }
        inner(self, ComponentPath::root(&self.name), visit);
    }
}
