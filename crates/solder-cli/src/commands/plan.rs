use crate::support::{
    build_graph_or_exit, component_path_or_exit, load_spec_or_exit, render_json_or_exit,
};
use solder_graph::{check_graph, plan_component};

pub fn run(spec_path: String, component: Option<String>, json_output: bool) {
    let (spec, _providers) = load_spec_or_exit(&spec_path);
    let graph = build_graph_or_exit(&spec);

    let report = check_graph(&graph);
    if !report.accepted() {
        eprintln!(
            "error: graph rejected by validation: {}",
            report.failure_classes.join(", ")
        );
        std::process::exit(1);
    }

    let path = component_path_or_exit(&graph, component);
    let plan = plan_component(&graph, &path).unwrap_or_else(|e| {
        eprintln!("error: planning failed: {e}");
        std::process::exit(1);
    });

    if json_output {
        println!("{}", render_json_or_exit(&plan));
        return;
    }

    println!("solder plan {path}");
    println!("  Steps: {}", plan.steps.len());
    for (index, step) in plan.steps.iter().enumerate() {
        println!(
            "  {:>3}. {}::{} -> {} ({}{})",
            index + 1,
            step.owner,
            step.binding_id,
            step.key,
            step.kind,
            if step.scoped { ", scoped" } else { "" }
        );
    }
    println!("  Semantic Digest: {}", plan.semantic_digest);
}
