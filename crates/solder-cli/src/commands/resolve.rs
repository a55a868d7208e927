use crate::support::{
    build_graph_or_exit, component_path_or_exit, dependency_labels, load_spec_or_exit,
    parse_key_or_exit, registry_from_rows, render_json_or_exit,
};
use serde_json::{Value, json};
use solder_graph::digest::digest_material;
use solder_kernel::ComponentPath;
use solder_runtime::{
    AsyncComponentInstance, ComponentInstance, ProviderRegistry, RuntimeError,
};
use std::collections::BTreeMap;

pub const RESOLVE_KIND: &str = "solder.graph.resolve.v1";
const RESOLVE_DIGEST_PREFIX: &str = "rs1_";

pub struct Args {
    pub spec: String,
    pub component: Option<String>,
    pub entries: Vec<String>,
    pub use_async: bool,
    pub json: bool,
}

fn exit_runtime(err: RuntimeError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}

pub fn run(args: Args) {
    let (spec, provider_rows) = load_spec_or_exit(&args.spec);
    let labels = dependency_labels(&spec);
    let graph = build_graph_or_exit(&spec);
    let path = component_path_or_exit(&graph, args.component);
    let registry = registry_from_rows(&provider_rows, &labels);

    let entries = if args.use_async {
        run_async(graph, registry, &path, &args.entries)
    } else {
        run_sync(graph, registry, &path, &args.entries)
    };

    let mode = if args.use_async { "async" } else { "sync" };
    let mut material = vec![path.0.clone(), mode.to_string()];
    material.extend(entries.iter().map(|(key, value)| format!("{key}={value}")));
    let semantic_digest = digest_material(RESOLVE_DIGEST_PREFIX, &material);

    if args.json {
        let payload = json!({
            "resolveKind": RESOLVE_KIND,
            "component": path.0,
            "mode": mode,
            "entries": entries,
            "semanticDigest": semantic_digest,
        });
        println!("{}", render_json_or_exit(&payload));
        return;
    }

    println!("solder resolve {path} ({mode})");
    println!("  Entries: {}", entries.len());
    for (key, value) in &entries {
        println!("  {key}: {value}");
    }
    println!("  Semantic Digest: {semantic_digest}");
}

fn run_sync(
    graph: solder_graph::BindingGraph,
    registry: ProviderRegistry,
    path: &ComponentPath,
    wanted: &[String],
) -> BTreeMap<String, Value> {
    let mut instance =
        ComponentInstance::root(graph, registry).unwrap_or_else(|err| exit_runtime(err));
    for segment in path.0.split('/').skip(1) {
        instance = instance
            .subcomponent(segment)
            .unwrap_or_else(|err| exit_runtime(err));
    }

    if wanted.is_empty() {
        return instance
            .resolve_entry_points()
            .unwrap_or_else(|err| exit_runtime(err));
    }
    let mut out = BTreeMap::new();
    for raw in wanted {
        let key = parse_key_or_exit(raw);
        let value = instance
            .resolve(&key)
            .unwrap_or_else(|err| exit_runtime(err));
        out.insert(key.canonical(), value);
    }
    out
}

fn run_async(
    graph: solder_graph::BindingGraph,
    registry: ProviderRegistry,
    path: &ComponentPath,
    wanted: &[String],
) -> BTreeMap<String, Value> {
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to start tokio runtime: {e}");
        std::process::exit(2);
    });

    let mut instance =
        AsyncComponentInstance::root(graph, registry).unwrap_or_else(|err| exit_runtime(err));
    for segment in path.0.split('/').skip(1) {
        instance = instance
            .subcomponent(segment)
            .unwrap_or_else(|err| exit_runtime(err));
    }

    let handle = runtime.handle().clone();
    let entries = runtime
        .block_on(instance.execute(&handle))
        .unwrap_or_else(|err| exit_runtime(err));

    if wanted.is_empty() {
        return entries;
    }
    let mut out = BTreeMap::new();
    for raw in wanted {
        let key = parse_key_or_exit(raw).canonical();
        let value = entries.get(&key).cloned().unwrap_or_else(|| {
            eprintln!("error: `{key}` is not a declared entry point of {path}");
            std::process::exit(1);
        });
        out.insert(key, value);
    }
    out
}
