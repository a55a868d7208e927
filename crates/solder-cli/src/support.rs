use serde_json::{Value, json};
use solder_graph::builder::WiringSpec;
use solder_graph::{BindingGraph, ProviderRows, WIRING_SPEC_KIND, WiringSpecInput, build_graph};
use solder_kernel::{BindingId, ComponentPath, Key};
use solder_runtime::{ProviderRegistry, ResolvedDep};
use std::collections::BTreeMap;
use std::fs;

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn read_json_file_or_exit<T>(path: &str, label: &str) -> T
where
    T: serde::de::DeserializeOwned,
{
    let bytes = fs::read(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {label} at {path}: {e}");
        std::process::exit(1);
    });
    serde_json::from_slice::<T>(&bytes).unwrap_or_else(|e| {
        eprintln!("error: failed to parse {label} JSON at {path}: {e}");
        std::process::exit(1);
    })
}

pub fn load_spec_or_exit(path: &str) -> (WiringSpec, ProviderRows) {
    let input: WiringSpecInput = read_json_file_or_exit(path, "wiring spec");
    if !input.spec_kind.is_empty() && input.spec_kind != WIRING_SPEC_KIND {
        eprintln!(
            "error: unsupported spec kind `{}` (expected {WIRING_SPEC_KIND})",
            input.spec_kind
        );
        std::process::exit(1);
    }
    input.into_spec().unwrap_or_else(|e| {
        eprintln!("error: invalid wiring spec: {e}");
        std::process::exit(1);
    })
}

pub fn build_graph_or_exit(spec: &WiringSpec) -> BindingGraph {
    build_graph(spec).unwrap_or_else(|e| {
        eprintln!("error: failed to assemble binding graph: {e}");
        std::process::exit(1);
    })
}

/// Resolve the requested component path, defaulting to the root.
pub fn component_path_or_exit(graph: &BindingGraph, component: Option<String>) -> ComponentPath {
    let path = match component {
        None => graph.root.clone(),
        Some(raw) => ComponentPath(raw),
    };
    if graph.node(&path).is_none() {
        eprintln!("error: unknown component path `{path}`");
        std::process::exit(1);
    }
    path
}

/// Parse `Type` or `Type @qualifier` into a key.
pub fn parse_key_or_exit(raw: &str) -> Key {
    let (type_name, qualifier) = match raw.split_once('@') {
        Some((type_name, qualifier)) => (type_name, qualifier),
        None => (raw, ""),
    };
    Key::qualified(type_name, qualifier).unwrap_or_else(|e| {
        eprintln!("error: invalid key `{raw}`: {e}");
        std::process::exit(1);
    })
}

pub fn render_json_or_exit<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render JSON output: {e}");
        std::process::exit(2);
    })
}

/// Canonical dependency-key labels per user binding, in declaration
/// order. Record providers use them as field names.
pub fn dependency_labels(spec: &WiringSpec) -> BTreeMap<BindingId, Vec<String>> {
    let mut labels = BTreeMap::new();
    for module in &spec.modules {
        for binding in &module.bindings {
            labels.insert(
                binding.id.clone(),
                binding
                    .dependencies
                    .iter()
                    .map(|request| request.key.canonical())
                    .collect(),
            );
        }
    }
    labels
}

/// Build a provider registry from the spec's provider rows.
///
/// `literal` rows return a fixed value. `record` rows assemble an
/// object of dependency values keyed by canonical key; a deferred
/// dependency renders as `{"deferred": key}` without being observed.
pub fn registry_from_rows(
    rows: &ProviderRows,
    labels: &BTreeMap<BindingId, Vec<String>>,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for (id, row) in rows {
        match row.kind.as_str() {
            "literal" | "" => {
                registry.literal(id.0.clone(), row.value.clone().unwrap_or(Value::Null));
            }
            "record" => {
                let labels = labels.get(id).cloned().unwrap_or_default();
                registry.register(id.0.clone(), move |deps| {
                    let mut record = serde_json::Map::new();
                    for (index, dep) in deps.iter().enumerate() {
                        let label = labels
                            .get(index)
                            .cloned()
                            .unwrap_or_else(|| index.to_string());
                        let value = match dep {
                            ResolvedDep::Value(value) => value.clone(),
                            ResolvedDep::Deferred(deferred) => {
                                json!({ "deferred": deferred.key().canonical() })
                            }
                        };
                        record.insert(label, value);
                    }
                    Ok(Value::Object(record))
                });
            }
            other => {
                eprintln!("error: unknown provider kind `{other}` for binding {id}");
                std::process::exit(1);
            }
        }
    }
    registry
}
