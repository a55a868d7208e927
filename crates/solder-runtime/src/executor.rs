//! Synchronous execution over a validated binding graph.
//!
//! A component instance resolves keys on demand: lookup walks the
//! instance chain to the owning component, then the binding executes
//! inline with its direct dependencies resolved first. Scoped bindings
//! cache at the owning instance; the cache slot stays locked through
//! the computation so a scoped binding runs at most once per instance.

use crate::deferred::Deferred;
use crate::error::RuntimeError;
use crate::provider::{ProviderRegistry, ResolvedDep};
use parking_lot::Mutex;
use serde_json::{Value, json};
use solder_graph::{BindingGraph, BindingRef, check_graph};
use solder_kernel::{Binding, BindingId, BindingKind, ComponentPath, Key};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether a resolution may block on a cache slot another computation
/// holds. Deferred observation must not: inside a cycle the held slot
/// is its own, and blocking would never return.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
    Block,
    NoBlock,
}

type ScopeSlot = Arc<Mutex<Option<Value>>>;

/// One live component in the instance chain.
pub(crate) struct InstanceCore {
    graph: Arc<BindingGraph>,
    providers: Arc<ProviderRegistry>,
    path: ComponentPath,
    parent: Option<Arc<InstanceCore>>,
    slots: Mutex<BTreeMap<BindingId, ScopeSlot>>,
}

impl InstanceCore {
    fn instance_for(self: &Arc<Self>, owner: &ComponentPath) -> Option<Arc<InstanceCore>> {
        let mut cursor = Some(Arc::clone(self));
        while let Some(core) = cursor {
            if core.path == *owner {
                return Some(core);
            }
            cursor = core.parent.clone();
        }
        None
    }

    pub(crate) fn resolve_key(
        self: &Arc<Self>,
        key: &Key,
        wait: Wait,
    ) -> Result<Value, RuntimeError> {
        let binding_ref =
            self.graph
                .resolve(&self.path, key)
                .ok_or_else(|| RuntimeError::UnknownKey {
                    component: self.path.0.clone(),
                    key: key.canonical(),
                })?;
        let owner = self
            .instance_for(&binding_ref.owner)
            .ok_or_else(|| RuntimeError::UnknownComponent(binding_ref.owner.0.clone()))?;
        owner.evaluate(&binding_ref, wait)
    }

    fn evaluate(self: &Arc<Self>, binding_ref: &BindingRef, wait: Wait) -> Result<Value, RuntimeError> {
        let binding = self
            .graph
            .binding(binding_ref)
            .ok_or_else(|| RuntimeError::UnknownComponent(binding_ref.owner.0.clone()))?
            .clone();
        if binding.scope.is_none() {
            return self.compute(&binding);
        }

        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(binding_ref.id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };
        let mut guard = match wait {
            Wait::Block => slot.lock(),
            Wait::NoBlock => slot.try_lock().ok_or_else(|| RuntimeError::DeferredPending {
                key: binding.key.canonical(),
            })?,
        };
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        let value = self.compute(&binding)?;
        *guard = Some(value.clone());
        Ok(value)
    }

    fn compute(self: &Arc<Self>, binding: &Binding) -> Result<Value, RuntimeError> {
        tracing::debug!(
            binding = %binding.id,
            component = %self.path,
            kind = binding.kind.as_str(),
            "executing binding"
        );
        match binding.kind {
            BindingKind::Constructor | BindingKind::Factory => self.run_provider(binding),
            BindingKind::Alias => {
                let source = binding.dependencies.first().ok_or_else(|| {
                    RuntimeError::Provider {
                        binding_id: binding.id.0.clone(),
                        component: self.path.0.clone(),
                        message: "alias binding without a source key".to_string(),
                    }
                })?;
                self.resolve_key(&source.key, Wait::Block)
            }
            BindingKind::Collection => {
                let mut elements = Vec::with_capacity(binding.dependencies.len());
                for request in &binding.dependencies {
                    elements.push(self.resolve_key(&request.key, Wait::Block)?);
                }
                Ok(Value::Array(elements))
            }
            BindingKind::Optional => match binding.dependencies.first() {
                Some(request) => {
                    let value = self.resolve_key(&request.key, Wait::Block)?;
                    Ok(json!({ "present": true, "value": value }))
                }
                None => Ok(json!({ "present": false, "value": Value::Null })),
            },
            BindingKind::ComponentRef => Ok(Value::String(self.path.0.clone())),
        }
    }

    fn run_provider(self: &Arc<Self>, binding: &Binding) -> Result<Value, RuntimeError> {
        let provider = self.providers.get(&binding.id).ok_or_else(|| {
            RuntimeError::MissingProvider {
                binding_id: binding.id.0.clone(),
            }
        })?;

        let mut deps = Vec::with_capacity(binding.dependencies.len());
        for request in &binding.dependencies {
            if request.mode.is_deferred() {
                deps.push(ResolvedDep::Deferred(Deferred::lazy(
                    request.key.clone(),
                    Arc::downgrade(self),
                )));
            } else {
                deps.push(ResolvedDep::Value(
                    self.resolve_key(&request.key, Wait::Block)?,
                ));
            }
        }

        provider(&deps).map_err(|err| {
            tracing::warn!(
                binding = %binding.id,
                component = %self.path,
                error = %err,
                "provider failed"
            );
            match err {
                RuntimeError::Provider {
                    binding_id,
                    component,
                    message,
                } if binding_id.is_empty() && component.is_empty() => RuntimeError::Provider {
                    binding_id: binding.id.0.clone(),
                    component: self.path.0.clone(),
                    message,
                },
                other => other,
            }
        })
    }
}

/// A live component: the entry surface of synchronous execution.
pub struct ComponentInstance {
    core: Arc<InstanceCore>,
}

impl ComponentInstance {
    /// Instantiate the root component. The graph is validated first;
    /// a rejected graph never executes.
    pub fn root(graph: BindingGraph, providers: ProviderRegistry) -> Result<Self, RuntimeError> {
        let report = check_graph(&graph);
        if !report.accepted() {
            return Err(RuntimeError::RejectedGraph {
                failure_classes: report.failure_classes,
            });
        }
        let path = graph.root.clone();
        Ok(Self {
            core: Arc::new(InstanceCore {
                graph: Arc::new(graph),
                providers: Arc::new(providers),
                path,
                parent: None,
                slots: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    /// Instantiate a child component with this instance as its parent.
    /// The child gets fresh scope caches; ancestor-owned scoped values
    /// stay cached at the ancestor.
    pub fn subcomponent(&self, name: &str) -> Result<Self, RuntimeError> {
        let path = self.core.path.child(name);
        if self.core.graph.node(&path).is_none() {
            return Err(RuntimeError::UnknownComponent(path.0));
        }
        Ok(Self {
            core: Arc::new(InstanceCore {
                graph: Arc::clone(&self.core.graph),
                providers: Arc::clone(&self.core.providers),
                path,
                parent: Some(Arc::clone(&self.core)),
                slots: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    pub fn path(&self) -> &ComponentPath {
        &self.core.path
    }

    /// Resolve one key as seen from this component.
    pub fn resolve(&self, key: &Key) -> Result<Value, RuntimeError> {
        self.core.resolve_key(key, Wait::Block)
    }

    /// Resolve every declared entry point, keyed by canonical key form.
    pub fn resolve_entry_points(&self) -> Result<BTreeMap<String, Value>, RuntimeError> {
        let node = self
            .core
            .graph
            .node(&self.core.path)
            .ok_or_else(|| RuntimeError::UnknownComponent(self.core.path.0.clone()))?;
        let entries = node.entry_points.clone();
        let mut out = BTreeMap::new();
        for request in &entries {
            out.insert(request.key.canonical(), self.resolve(&request.key)?);
        }
        Ok(out)
    }
}
