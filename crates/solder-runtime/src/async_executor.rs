//! Asynchronous execution over a validated binding graph.
//!
//! One wave per `execute` call: every binding reachable from the
//! component's entry points becomes a task on a caller-supplied tokio
//! runtime. A task awaits the completion slots of its direct
//! dependencies and runs as soon as all of them settle, so independent
//! bindings run concurrently. Deferred requests get a settled handle
//! backed by the producer's slot instead of an await. Scoped bindings
//! initialize a per-instance cell at most once, even under concurrent
//! waves; the cached outcome includes failures.

use crate::deferred::{Deferred, SettledSlot};
use crate::error::RuntimeError;
use crate::provider::{ProviderRegistry, ResolvedDep};
use parking_lot::Mutex;
use serde_json::{Value, json};
use solder_graph::{BindingGraph, BindingRef, check_graph, plan_component};
use solder_kernel::{Binding, BindingId, BindingKind, ComponentPath};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{OnceCell, watch};

type ScopeCell = Arc<OnceCell<Result<Value, String>>>;

struct AsyncCore {
    graph: Arc<BindingGraph>,
    providers: Arc<ProviderRegistry>,
    path: ComponentPath,
    parent: Option<Arc<AsyncCore>>,
    cells: Mutex<BTreeMap<BindingId, ScopeCell>>,
}

impl AsyncCore {
    fn instance_for(self: &Arc<Self>, owner: &ComponentPath) -> Option<Arc<AsyncCore>> {
        let mut cursor = Some(Arc::clone(self));
        while let Some(core) = cursor {
            if core.path == *owner {
                return Some(core);
            }
            cursor = core.parent.clone();
        }
        None
    }

    /// The scope cell for a binding, created on first use. The map lock
    /// is held only for the lookup; initialization happens outside it.
    fn cell(&self, id: &BindingId) -> ScopeCell {
        let mut cells = self.cells.lock();
        cells
            .entry(id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

/// A dependency of a spawned task, gathered before dispatch.
enum PendingDep {
    Direct {
        key: String,
        slot: watch::Receiver<SettledSlot>,
    },
    Deferred(Deferred),
}

/// Execute a user or synthetic binding once its inputs are in hand.
fn produce(
    binding: &Binding,
    owner: &ComponentPath,
    providers: &ProviderRegistry,
    deps: &[ResolvedDep],
) -> Result<Value, String> {
    match binding.kind {
        BindingKind::Constructor | BindingKind::Factory => {
            let provider = providers
                .get(&binding.id)
                .ok_or_else(|| format!("no provider registered for binding {}", binding.id))?;
            provider(deps).map_err(|err| match err {
                RuntimeError::Provider {
                    binding_id,
                    component,
                    message,
                } if binding_id.is_empty() && component.is_empty() => message,
                other => other.to_string(),
            })
        }
        BindingKind::Alias => deps
            .first()
            .and_then(ResolvedDep::as_value)
            .cloned()
            .ok_or_else(|| "alias binding without a source value".to_string()),
        BindingKind::Collection => {
            let mut elements = Vec::with_capacity(deps.len());
            for dep in deps {
                elements.push(
                    dep.as_value()
                        .cloned()
                        .ok_or_else(|| "collection element is not an eager value".to_string())?,
                );
            }
            Ok(Value::Array(elements))
        }
        BindingKind::Optional => match deps.first() {
            Some(dep) => {
                let value = dep
                    .as_value()
                    .cloned()
                    .ok_or_else(|| "optional underlying value is not eager".to_string())?;
                Ok(json!({ "present": true, "value": value }))
            }
            None => Ok(json!({ "present": false, "value": Value::Null })),
        },
        BindingKind::ComponentRef => Ok(Value::String(owner.0.clone())),
    }
}

/// A live component for task-based execution.
pub struct AsyncComponentInstance {
    core: Arc<AsyncCore>,
}

impl AsyncComponentInstance {
    /// Instantiate the root component. The graph is validated first; a
    /// rejected graph never executes.
    pub fn root(graph: BindingGraph, providers: ProviderRegistry) -> Result<Self, RuntimeError> {
        let report = check_graph(&graph);
        if !report.accepted() {
            return Err(RuntimeError::RejectedGraph {
                failure_classes: report.failure_classes,
            });
        }
        let path = graph.root.clone();
        Ok(Self {
            core: Arc::new(AsyncCore {
                graph: Arc::new(graph),
                providers: Arc::new(providers),
                path,
                parent: None,
                cells: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    /// Instantiate a child component with fresh scope cells; ancestor
    /// scoped values stay cached at the ancestor instance.
    pub fn subcomponent(&self, name: &str) -> Result<Self, RuntimeError> {
        let path = self.core.path.child(name);
        if self.core.graph.node(&path).is_none() {
            return Err(RuntimeError::UnknownComponent(path.0));
        }
        Ok(Self {
            core: Arc::new(AsyncCore {
                graph: Arc::clone(&self.core.graph),
                providers: Arc::clone(&self.core.providers),
                path,
                parent: Some(Arc::clone(&self.core)),
                cells: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    pub fn path(&self) -> &ComponentPath {
        &self.core.path
    }

    /// Run every binding reachable from this component's entry points
    /// and await the entry values, keyed by canonical key form.
    ///
    /// The first failing non-deferred binding propagates to its
    /// dependents and surfaces as the error of the affected entry.
    pub async fn execute(
        &self,
        handle: &Handle,
    ) -> Result<BTreeMap<String, Value>, RuntimeError> {
        let core = &self.core;
        let plan = plan_component(&core.graph, &core.path)?;

        let mut senders: BTreeMap<BindingRef, watch::Sender<SettledSlot>> = BTreeMap::new();
        let mut receivers: BTreeMap<BindingRef, watch::Receiver<SettledSlot>> = BTreeMap::new();
        for binding_ref in &plan.order {
            let (tx, rx) = watch::channel(None);
            senders.insert(binding_ref.clone(), tx);
            receivers.insert(binding_ref.clone(), rx);
        }

        for binding_ref in &plan.order {
            let binding = core
                .graph
                .binding(binding_ref)
                .ok_or_else(|| RuntimeError::UnknownComponent(binding_ref.owner.0.clone()))?
                .clone();
            let owner = core
                .instance_for(&binding_ref.owner)
                .ok_or_else(|| RuntimeError::UnknownComponent(binding_ref.owner.0.clone()))?;

            let mut pending = Vec::with_capacity(binding.dependencies.len());
            for request in &binding.dependencies {
                let dep_ref = core
                    .graph
                    .resolve(&binding_ref.owner, &request.key)
                    .ok_or_else(|| RuntimeError::UnknownKey {
                        component: binding_ref.owner.0.clone(),
                        key: request.key.canonical(),
                    })?;
                let slot =
                    receivers
                        .get(&dep_ref)
                        .cloned()
                        .ok_or_else(|| RuntimeError::UnknownKey {
                            component: binding_ref.owner.0.clone(),
                            key: request.key.canonical(),
                        })?;
                if request.mode.is_deferred() {
                    pending.push(PendingDep::Deferred(Deferred::settled(
                        request.key.clone(),
                        slot,
                    )));
                } else {
                    pending.push(PendingDep::Direct {
                        key: request.key.canonical(),
                        slot,
                    });
                }
            }

            let tx = senders
                .remove(binding_ref)
                .ok_or_else(|| RuntimeError::UnknownComponent(binding_ref.owner.0.clone()))?;
            let providers = Arc::clone(&core.providers);
            let scope_cell = binding.scope.as_ref().map(|_| owner.cell(&binding.id));
            let owner_path = owner.path.clone();
            handle.spawn(async move {
                let mut deps = Vec::with_capacity(pending.len());
                for dep in pending {
                    match dep {
                        PendingDep::Deferred(deferred) => {
                            deps.push(ResolvedDep::Deferred(deferred));
                        }
                        PendingDep::Direct { key, mut slot } => {
                            let outcome = match slot.wait_for(|filled| filled.is_some()).await {
                                Ok(filled) => filled.clone(),
                                Err(_) => Some(Err("producer task stopped".to_string())),
                            };
                            match outcome {
                                Some(Ok(value)) => deps.push(ResolvedDep::Value(value)),
                                Some(Err(message)) => {
                                    let _ = tx.send(Some(Err(format!(
                                        "dependency {key} failed: {message}"
                                    ))));
                                    return;
                                }
                                None => {
                                    let _ = tx.send(Some(Err(format!(
                                        "dependency {key} never settled"
                                    ))));
                                    return;
                                }
                            }
                        }
                    }
                }

                tracing::debug!(
                    binding = %binding.id,
                    component = %owner_path,
                    kind = binding.kind.as_str(),
                    "dispatching binding"
                );
                let outcome = match &scope_cell {
                    Some(cell) => cell
                        .get_or_init(|| async {
                            produce(&binding, &owner_path, &providers, &deps)
                        })
                        .await
                        .clone(),
                    None => produce(&binding, &owner_path, &providers, &deps),
                };
                if let Err(message) = &outcome {
                    tracing::warn!(
                        binding = %binding.id,
                        component = %owner_path,
                        error = %message,
                        "binding failed"
                    );
                }
                let _ = tx.send(Some(outcome));
            });
        }

        let node = core
            .graph
            .node(&core.path)
            .ok_or_else(|| RuntimeError::UnknownComponent(core.path.0.clone()))?;
        let mut out = BTreeMap::new();
        for request in &node.entry_points {
            let entry_ref = core
                .graph
                .resolve(&core.path, &request.key)
                .ok_or_else(|| RuntimeError::UnknownKey {
                    component: core.path.0.clone(),
                    key: request.key.canonical(),
                })?;
            let mut slot =
                receivers
                    .get(&entry_ref)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownKey {
                        component: core.path.0.clone(),
                        key: request.key.canonical(),
                    })?;
            let filled = slot
                .wait_for(|outcome| outcome.is_some())
                .await
                .map_err(|_| RuntimeError::InstanceDropped)?;
            match filled.as_ref() {
                Some(Ok(value)) => {
                    out.insert(request.key.canonical(), value.clone());
                }
                Some(Err(message)) => {
                    return Err(RuntimeError::Provider {
                        binding_id: entry_ref.id.0.clone(),
                        component: entry_ref.owner.0.clone(),
                        message: message.clone(),
                    });
                }
                None => {
                    return Err(RuntimeError::DeferredPending {
                        key: request.key.canonical(),
                    });
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solder_graph::{WiringSpec, build_graph};
    use solder_kernel::{DependencyRequest, Key, ModuleDecl, ScopeTag};
    use solder_kernel::ComponentDecl;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(name: &str) -> Key {
        Key::bare(name).expect("key must build")
    }

    fn built(spec: &WiringSpec) -> BindingGraph {
        build_graph(spec).expect("graph must build")
    }

    fn diamond_spec() -> WiringSpec {
        WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "main",
                    vec![
                        Binding::factory("b.config", key("Config"), vec![]).expect("must build"),
                        Binding::constructor(
                            "b.db",
                            key("Database"),
                            vec![DependencyRequest::direct(key("Config"))],
                        )
                        .expect("must build"),
                        Binding::constructor(
                            "b.cache",
                            key("Cache"),
                            vec![DependencyRequest::direct(key("Config"))],
                        )
                        .expect("must build"),
                        Binding::constructor(
                            "b.server",
                            key("Server"),
                            vec![
                                DependencyRequest::direct(key("Database")),
                                DependencyRequest::direct(key("Cache")),
                            ],
                        )
                        .expect("must build"),
                    ],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_module("main")
                .with_entry_point(DependencyRequest::direct(key("Server"))),
        }
    }

    fn diamond_providers() -> ProviderRegistry {
        let mut providers = ProviderRegistry::new();
        providers.literal("b.config", json!({"port": 5432}));
        providers.register("b.db", |deps| {
            Ok(json!({"db": deps[0].as_value().cloned().unwrap_or(Value::Null)}))
        });
        providers.register("b.cache", |deps| {
            Ok(json!({"cache": deps[0].as_value().cloned().unwrap_or(Value::Null)}))
        });
        providers.register("b.server", |deps| {
            Ok(json!({
                "db": deps[0].as_value().cloned().unwrap_or(Value::Null),
                "cache": deps[1].as_value().cloned().unwrap_or(Value::Null),
            }))
        });
        providers
    }

    #[tokio::test]
    async fn executes_the_wave_and_awaits_entries() {
        let instance = AsyncComponentInstance::root(built(&diamond_spec()), diamond_providers())
            .expect("instance must build");
        let entries = instance
            .execute(&Handle::current())
            .await
            .expect("wave must complete");
        assert_eq!(
            entries.get("Server").expect("entry must resolve"),
            &json!({
                "db": {"db": {"port": 5432}},
                "cache": {"cache": {"port": 5432}},
            })
        );
    }

    #[tokio::test]
    async fn scoped_binding_initializes_once_under_concurrent_waves() {
        let spec = WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "main",
                    vec![
                        Binding::factory("b.scoped", key("Database"), vec![])
                            .expect("must build")
                            .scoped(ScopeTag::new("singleton")),
                    ],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_scope(ScopeTag::new("singleton"))
                .with_module("main")
                .with_entry_point(DependencyRequest::direct(key("Database"))),
        };
        let runs = Arc::new(AtomicUsize::new(0));
        let mut providers = ProviderRegistry::new();
        {
            let runs = Arc::clone(&runs);
            providers.register("b.scoped", move |_| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(json!("db"))
            });
        }

        let instance =
            AsyncComponentInstance::root(built(&spec), providers).expect("instance must build");
        let handle = Handle::current();
        let (first, second) = tokio::join!(instance.execute(&handle), instance.execute(&handle));
        first.expect("first wave must complete");
        second.expect("second wave must complete");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deferred_handle_settles_when_the_producer_completes() {
        let spec = WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "main",
                    vec![
                        Binding::constructor(
                            "b.server",
                            key("Server"),
                            vec![DependencyRequest::direct(key("Client"))],
                        )
                        .expect("must build"),
                        Binding::constructor(
                            "b.client",
                            key("Client"),
                            vec![DependencyRequest::deferred(key("Server"))],
                        )
                        .expect("must build"),
                    ],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_module("main")
                .with_entry_point(DependencyRequest::direct(key("Server"))),
        };
        let held: Arc<Mutex<Option<Deferred>>> = Arc::new(Mutex::new(None));
        let mut providers = ProviderRegistry::new();
        {
            let held = Arc::clone(&held);
            providers.register("b.client", move |deps| {
                *held.lock() = deps[0].as_deferred().cloned();
                Ok(json!("client"))
            });
        }
        providers.register("b.server", |deps| {
            Ok(json!({"client": deps[0].as_value().cloned().unwrap_or(Value::Null)}))
        });

        let instance =
            AsyncComponentInstance::root(built(&spec), providers).expect("instance must build");
        let entries = instance
            .execute(&Handle::current())
            .await
            .expect("wave must complete");
        let server = entries.get("Server").expect("entry must resolve").clone();

        let handle = held.lock().clone().expect("handle must be captured");
        assert_eq!(handle.wait().await.expect("must settle"), server);
    }

    #[tokio::test]
    async fn failure_propagates_through_dependents_to_the_entry() {
        let spec = WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "main",
                    vec![
                        Binding::factory("b.bad", key("Flaky"), vec![]).expect("must build"),
                        Binding::constructor(
                            "b.server",
                            key("Server"),
                            vec![DependencyRequest::direct(key("Flaky"))],
                        )
                        .expect("must build"),
                    ],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_module("main")
                .with_entry_point(DependencyRequest::direct(key("Server"))),
        };
        let mut providers = ProviderRegistry::new();
        providers.register("b.bad", |_| {
            Err(RuntimeError::provider_failure("connection refused"))
        });
        providers.register("b.server", |_| Ok(json!("unreachable")));

        let instance =
            AsyncComponentInstance::root(built(&spec), providers).expect("instance must build");
        let err = instance
            .execute(&Handle::current())
            .await
            .expect_err("wave must fail");
        match err {
            RuntimeError::Provider {
                binding_id,
                message,
                ..
            } => {
                assert_eq!(binding_id, "b.server");
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn ancestor_scoped_value_is_shared_across_child_waves() {
        let spec = WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "base",
                    vec![
                        Binding::factory("b.db", key("Database"), vec![])
                            .expect("must build")
                            .scoped(ScopeTag::new("singleton")),
                    ],
                )
                .expect("must build"),
                ModuleDecl::new(
                    "req",
                    vec![
                        Binding::constructor(
                            "b.handler",
                            key("Handler"),
                            vec![DependencyRequest::direct(key("Database"))],
                        )
                        .expect("must build"),
                    ],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_scope(ScopeTag::new("singleton"))
                .with_module("base")
                .with_subcomponent(
                    ComponentDecl::new("request")
                        .expect("must build")
                        .with_module("req")
                        .with_entry_point(DependencyRequest::direct(key("Handler"))),
                ),
        };
        let runs = Arc::new(AtomicUsize::new(0));
        let mut providers = ProviderRegistry::new();
        {
            let runs = Arc::clone(&runs);
            providers.register("b.db", move |_| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(json!("db"))
            });
        }
        providers.register("b.handler", |deps| {
            Ok(json!({"uses": deps[0].as_value().cloned().unwrap_or(Value::Null)}))
        });

        let root = AsyncComponentInstance::root(built(&spec), providers)
            .expect("instance must build");
        let first = root.subcomponent("request").expect("child must build");
        let second = root.subcomponent("request").expect("child must build");
        let handle = Handle::current();
        first.execute(&handle).await.expect("wave must complete");
        second.execute(&handle).await.expect("wave must complete");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
