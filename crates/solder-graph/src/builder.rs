//! Graph assembly: per-component catalogs, synthetic bindings, and
//! ancestor inheritance.
//!
//! Assembly walks the component tree top-down. Each component collects
//! the bindings of its installed modules, then synthesizes:
//!
//! - one `collection` binding per declared multibinding key, depending
//!   on a synthetic element key per contribution gathered from this
//!   component and its ancestors;
//! - one `optional` binding per declared optional key, present exactly
//!   when the underlying key is producible in the chain;
//! - one `component_ref` binding producing the component's own key.

use crate::error::GraphError;
use crate::graph::{BindingGraph, ComponentNode};
use serde::{Deserialize, Serialize};
use solder_kernel::{
    Binding, BindingId, BindingKind, ComponentDecl, ComponentPath, DependencyRequest, Key,
    ModuleDecl,
};
use std::collections::{BTreeMap, BTreeSet};

/// A complete wiring declaration: module definitions plus the root
/// component tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiringSpec {
    pub modules: Vec<ModuleDecl>,
    pub root: ComponentDecl,
}

/// The synthetic key produced by one multibinding contribution.
pub fn element_key(collection: &Key, contribution: &BindingId) -> Key {
    Key {
        type_name: format!("{}[elem:{}]", collection.canonical(), contribution),
        qualifier: None,
    }
}

/// The key produced by an optional binding over `underlying`.
pub fn optional_key(underlying: &Key) -> Key {
    Key {
        type_name: format!("Optional<{}>", underlying.canonical()),
        qualifier: None,
    }
}

/// Collected multibinding contributions: collection key to
/// (contribution id, element key) pairs, in contribution-id order.
type Contributions = BTreeMap<Key, Vec<(BindingId, Key)>>;

/// Assemble the binding graph for a wiring spec.
///
/// Structural problems (unknown modules, duplicate ids) error here;
/// semantic problems are left for [`crate::check_graph`].
pub fn build_graph(spec: &WiringSpec) -> Result<BindingGraph, GraphError> {
    let mut modules: BTreeMap<&str, &ModuleDecl> = BTreeMap::new();
    for module in &spec.modules {
        module.check_binding_ids()?;
        if modules.insert(module.name.as_str(), module).is_some() {
            return Err(GraphError::DuplicateModule(module.name.clone()));
        }
    }

    let mut components = BTreeMap::new();
    let root_path = ComponentPath::root(&spec.root.name);
    build_component(
        &spec.root,
        root_path.clone(),
        None,
        &modules,
        &BTreeSet::new(),
        &Contributions::new(),
        &mut components,
    )?;

    Ok(BindingGraph {
        root: root_path,
        components,
    })
}

fn build_component(
    decl: &ComponentDecl,
    path: ComponentPath,
    parent: Option<ComponentPath>,
    modules: &BTreeMap<&str, &ModuleDecl>,
    inherited_keys: &BTreeSet<Key>,
    inherited_contributions: &Contributions,
    out: &mut BTreeMap<ComponentPath, ComponentNode>,
) -> Result<(), GraphError> {
    let mut node = ComponentNode {
        path: path.clone(),
        name: decl.name.clone(),
        scopes: decl.scopes.clone(),
        entry_points: decl.entry_points.clone(),
        parent,
        bindings: BTreeMap::new(),
        producers: BTreeMap::new(),
    };

    let mut contributions = inherited_contributions.clone();
    let mut collection_decls: BTreeSet<Key> = BTreeSet::new();
    let mut optional_decls: BTreeSet<Key> = BTreeSet::new();

    for module_name in &decl.modules {
        let module =
            modules
                .get(module_name.as_str())
                .copied()
                .ok_or_else(|| GraphError::UnknownModule {
                    component: path.0.clone(),
                    module: module_name.clone(),
                })?;

        for binding in &module.bindings {
            let mut binding = binding.clone();
            if binding.into_collection {
                let collection = binding.key.clone();
                let element = element_key(&collection, &binding.id);
                binding.key = element.clone();
                contributions
                    .entry(collection)
                    .or_default()
                    .push((binding.id.clone(), element));
            }
            add_binding(&mut node, binding)?;
        }
        collection_decls.extend(module.collections.iter().cloned());
        optional_decls.extend(module.optionals.iter().cloned());
    }

    for (_, rows) in contributions.iter_mut() {
        rows.sort();
        rows.dedup();
    }

    for collection in &collection_decls {
        let elements = contributions
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let dependencies = elements
            .iter()
            .map(|(_, element)| DependencyRequest::direct(element.clone()))
            .collect();
        add_binding(
            &mut node,
            Binding {
                id: BindingId::new(format!("syn.collection.{}", collection.canonical())),
                key: collection.clone(),
                kind: BindingKind::Collection,
                scope: None,
                dependencies,
                into_collection: false,
            },
        )?;
    }

    for underlying in &optional_decls {
        let producible =
            node.producers.contains_key(underlying) || inherited_keys.contains(underlying);
        let dependencies = if producible {
            vec![DependencyRequest::direct(underlying.clone())]
        } else {
            Vec::new()
        };
        add_binding(
            &mut node,
            Binding {
                id: BindingId::new(format!("syn.optional.{}", underlying.canonical())),
                key: optional_key(underlying),
                kind: BindingKind::Optional,
                scope: None,
                dependencies,
                into_collection: false,
            },
        )?;
    }

    add_binding(
        &mut node,
        Binding {
            id: BindingId::new(format!("syn.component.{}", path)),
            key: Key::bare(&decl.name)?,
            kind: BindingKind::ComponentRef,
            scope: None,
            dependencies: Vec::new(),
            into_collection: false,
        },
    )?;

    let mut child_keys = inherited_keys.clone();
    child_keys.extend(node.producers.keys().cloned());

    out.insert(path.clone(), node);

    for child in &decl.subcomponents {
        build_component(
            child,
            path.child(&child.name),
            Some(path.clone()),
            modules,
            &child_keys,
            &contributions,
            out,
        )?;
    }

    Ok(())
}

fn add_binding(node: &mut ComponentNode, binding: Binding) -> Result<(), GraphError> {
    if node.bindings.contains_key(&binding.id) {
        return Err(GraphError::DuplicateBindingId {
            component: node.path.0.clone(),
            binding_id: binding.id.0.clone(),
        });
    }
    node.producers
        .entry(binding.key.clone())
        .or_default()
        .push(binding.id.clone());
    node.bindings.insert(binding.id.clone(), binding);
    Ok(())
}
