use crate::support::{build_graph_or_exit, load_spec_or_exit, render_json_or_exit};
use solder_graph::check_graph;

pub fn run(spec_path: String, json_output: bool) {
    let (spec, _providers) = load_spec_or_exit(&spec_path);
    let graph = build_graph_or_exit(&spec);
    let report = check_graph(&graph);

    if json_output {
        println!("{}", render_json_or_exit(&report));
    } else {
        println!("solder graph-check {spec_path}");
        println!("  Result: {}", report.result);
        println!("  Components: {}", report.summary.component_count);
        println!("  Bindings: {}", report.summary.binding_count);
        if !report.failure_classes.is_empty() {
            println!("  Failure Classes: {}", report.failure_classes.join(", "));
        }
        for finding in &report.findings {
            println!(
                "    - [{}] {} at {}: {}",
                finding.class, finding.subject, finding.component, finding.message
            );
        }
        println!("  Graph Digest: {}", report.graph_digest);
        println!("  Semantic Digest: {}", report.semantic_digest);
    }

    if !report.accepted() {
        std::process::exit(1);
    }
}
