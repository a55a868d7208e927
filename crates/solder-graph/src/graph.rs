//! The bipartite binding graph.
//!
//! Nodes are bindings and keys; a binding produces exactly one key and
//! depends on the keys its requests name. The graph is stored per
//! component with parent links, so key lookup walks the chain from the
//! requesting component toward the root.

use serde::{Deserialize, Serialize};
use solder_kernel::{Binding, BindingId, ComponentPath, DependencyRequest, Key, ScopeTag};
use std::collections::{BTreeMap, BTreeSet};

/// A binding located at its owning component.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct BindingRef {
    pub owner: ComponentPath,
    pub id: BindingId,
}

impl std::fmt::Display for BindingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.owner, self.id)
    }
}

/// One component's slice of the graph: the bindings it owns, the keys
/// they produce, and the link to its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub path: ComponentPath,
    pub name: String,
    pub scopes: BTreeSet<ScopeTag>,
    pub entry_points: Vec<DependencyRequest>,
    pub parent: Option<ComponentPath>,
    /// Bindings owned by this component, by id.
    pub bindings: BTreeMap<BindingId, Binding>,
    /// Producers declared at this component. More than one producer per
    /// key is a validation failure, not a storage constraint.
    pub producers: BTreeMap<Key, Vec<BindingId>>,
}

impl ComponentNode {
    /// Producers of `key` declared at this component.
    pub fn local_producers(&self, key: &Key) -> &[BindingId] {
        self.producers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The assembled graph for a whole component tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingGraph {
    pub root: ComponentPath,
    pub components: BTreeMap<ComponentPath, ComponentNode>,
}

impl BindingGraph {
    pub fn node(&self, path: &ComponentPath) -> Option<&ComponentNode> {
        self.components.get(path)
    }

    /// The chain of components from `from` up to the root.
    pub fn chain(&self, from: &ComponentPath) -> Vec<&ComponentNode> {
        let mut chain = Vec::new();
        let mut cursor = self.components.get(from);
        while let Some(node) = cursor {
            chain.push(node);
            cursor = node
                .parent
                .as_ref()
                .and_then(|parent| self.components.get(parent));
        }
        chain
    }

    /// Resolve a key as seen from `from`: nearest producer wins, walking
    /// the chain toward the root. On a validated graph the producer is
    /// unique.
    pub fn resolve(&self, from: &ComponentPath, key: &Key) -> Option<BindingRef> {
        for node in self.chain(from) {
            if let Some(id) = node.local_producers(key).first() {
                return Some(BindingRef {
                    owner: node.path.clone(),
                    id: id.clone(),
                });
            }
        }
        None
    }

    pub fn binding(&self, binding_ref: &BindingRef) -> Option<&Binding> {
        self.components
            .get(&binding_ref.owner)
            .and_then(|node| node.bindings.get(&binding_ref.id))
    }

    /// Total binding count across all components.
    pub fn binding_count(&self) -> usize {
        self.components
            .values()
            .map(|node| node.bindings.len())
            .sum()
    }
}
