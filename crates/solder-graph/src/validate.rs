//! Graph validation: well-formedness checks over an assembled graph.
//!
//! Semantic problems come back as string failure classes on a digested
//! report; the graph itself is never mutated. The checks cover the
//! model invariants: exactly one producer per key (multibinding
//! collections exempt by construction), cycles only through deferred
//! requests, scoped bindings owned by components carrying the scope,
//! and no scope tag repeated down the component tree.

use crate::digest::{digest_material, digest_serializable};
use crate::graph::{BindingGraph, BindingRef, ComponentNode};
use serde::{Deserialize, Serialize};
use solder_kernel::BindingId;
use std::collections::{BTreeMap, BTreeSet};

pub const GRAPH_CHECK_KIND: &str = "solder.graph.check.v1";
const GRAPH_CHECK_DIGEST_PREFIX: &str = "bg1_";

pub mod failure_class {
    pub const BINDING_MISSING: &str = "graph.binding.missing";
    pub const BINDING_DUPLICATE: &str = "graph.binding.duplicate";
    pub const CYCLE_UNBROKEN: &str = "graph.cycle.unbroken";
    pub const SCOPE_UNSATISFIED: &str = "graph.scope.unsatisfied";
    pub const SCOPE_SHADOWED: &str = "graph.scope.shadowed";
}

/// One validation finding, located at a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphFinding {
    pub component: String,
    pub class: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub component_count: usize,
    pub binding_count: usize,
    pub error_count: usize,
}

/// The outcome of validating a binding graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphCheckReport {
    pub check_kind: String,
    pub result: String,
    pub failure_classes: Vec<String>,
    pub findings: Vec<GraphFinding>,
    pub summary: GraphSummary,
    pub graph_digest: String,
    pub semantic_digest: String,
}

impl GraphCheckReport {
    pub fn accepted(&self) -> bool {
        self.result == "accepted"
    }
}

/// Validate an assembled graph.
pub fn check_graph(graph: &BindingGraph) -> GraphCheckReport {
    let mut findings: BTreeSet<GraphFinding> = BTreeSet::new();

    for node in graph.components.values() {
        check_duplicates(graph, node, &mut findings);
        check_missing(graph, node, &mut findings);
        check_cycles(graph, node, &mut findings);
        check_scopes(graph, node, &mut findings);
    }

    let findings: Vec<GraphFinding> = findings.into_iter().collect();
    let failure_classes: Vec<String> = findings
        .iter()
        .map(|finding| finding.class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let result = if findings.is_empty() {
        "accepted".to_string()
    } else {
        "rejected".to_string()
    };

    let summary = GraphSummary {
        component_count: graph.components.len(),
        binding_count: graph.binding_count(),
        error_count: findings.len(),
    };

    let mut material = vec![result.clone()];
    material.extend(failure_classes.iter().cloned());
    material.extend(findings.iter().map(|finding| {
        format!(
            "{}|{}|{}",
            finding.component, finding.class, finding.subject
        )
    }));
    let semantic_digest = digest_material(GRAPH_CHECK_DIGEST_PREFIX, &material);

    GraphCheckReport {
        check_kind: GRAPH_CHECK_KIND.to_string(),
        result,
        failure_classes,
        findings,
        summary,
        graph_digest: digest_serializable(graph),
        semantic_digest,
    }
}

fn check_duplicates(
    graph: &BindingGraph,
    node: &ComponentNode,
    findings: &mut BTreeSet<GraphFinding>,
) {
    for (key, producers) in &node.producers {
        if producers.len() > 1 {
            findings.insert(GraphFinding {
                component: node.path.0.clone(),
                class: failure_class::BINDING_DUPLICATE.to_string(),
                subject: key.canonical(),
                message: format!(
                    "{} producers for one key: {}",
                    producers.len(),
                    producers
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }

        let shadowed = graph
            .chain(&node.path)
            .into_iter()
            .skip(1)
            .any(|ancestor| !ancestor.local_producers(key).is_empty());
        if shadowed {
            findings.insert(GraphFinding {
                component: node.path.0.clone(),
                class: failure_class::BINDING_DUPLICATE.to_string(),
                subject: key.canonical(),
                message: "key is already produced by an ancestor component".to_string(),
            });
        }
    }
}

fn check_missing(
    graph: &BindingGraph,
    node: &ComponentNode,
    findings: &mut BTreeSet<GraphFinding>,
) {
    for binding in node.bindings.values() {
        for request in &binding.dependencies {
            if graph.resolve(&node.path, &request.key).is_none() {
                findings.insert(GraphFinding {
                    component: node.path.0.clone(),
                    class: failure_class::BINDING_MISSING.to_string(),
                    subject: request.key.canonical(),
                    message: format!("no producer for key required by binding {}", binding.id),
                });
            }
        }
    }
    for request in &node.entry_points {
        if graph.resolve(&node.path, &request.key).is_none() {
            findings.insert(GraphFinding {
                component: node.path.0.clone(),
                class: failure_class::BINDING_MISSING.to_string(),
                subject: request.key.canonical(),
                message: "no producer for entry point key".to_string(),
            });
        }
    }
}

/// Cycle detection over one component's own bindings.
///
/// A dependency edge into an ancestor can never come back down (keys
/// are looked up toward the root only), so every cycle lives within a
/// single component's ownership set. Deferred requests carry no edge:
/// they are the sanctioned way through a cycle.
fn check_cycles(
    graph: &BindingGraph,
    node: &ComponentNode,
    findings: &mut BTreeSet<GraphFinding>,
) {
    let mut edges: BTreeMap<&BindingId, Vec<&BindingId>> = BTreeMap::new();
    for (id, binding) in &node.bindings {
        let mut targets = Vec::new();
        for key in binding.direct_dependency_keys() {
            if let Some(BindingRef { owner, id: target }) = graph.resolve(&node.path, key)
                && owner == node.path
                && let Some((resolved, _)) = node.bindings.get_key_value(&target)
            {
                targets.push(resolved);
            }
        }
        edges.insert(id, targets);
    }

    // White/gray/black DFS in id order; each back edge reports one cycle.
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;
    let mut color: BTreeMap<&BindingId, u8> = edges.keys().map(|id| (*id, WHITE)).collect();
    let mut path: Vec<&BindingId> = Vec::new();

    fn visit<'a>(
        id: &'a BindingId,
        edges: &BTreeMap<&'a BindingId, Vec<&'a BindingId>>,
        color: &mut BTreeMap<&'a BindingId, u8>,
        path: &mut Vec<&'a BindingId>,
        component: &str,
        findings: &mut BTreeSet<GraphFinding>,
    ) {
        color.insert(id, GRAY);
        path.push(id);
        for target in edges.get(id).map(Vec::as_slice).unwrap_or(&[]) {
            match color.get(target).copied().unwrap_or(WHITE) {
                WHITE => visit(target, edges, color, path, component, findings),
                GRAY => {
                    let start = path
                        .iter()
                        .position(|entry| entry == target)
                        .unwrap_or_default();
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(ToString::to_string).collect();
                    cycle.push(target.to_string());
                    findings.insert(GraphFinding {
                        component: component.to_string(),
                        class: failure_class::CYCLE_UNBROKEN.to_string(),
                        subject: cycle.join(" -> "),
                        message: "dependency cycle with no deferred request".to_string(),
                    });
                }
                _ => {}
            }
        }
        path.pop();
        color.insert(id, BLACK);
    }

    let ids: Vec<&BindingId> = edges.keys().copied().collect();
    for id in ids {
        if color.get(id).copied().unwrap_or(WHITE) == WHITE {
            visit(id, &edges, &mut color, &mut path, &node.path.0, findings);
        }
    }
}

fn check_scopes(
    graph: &BindingGraph,
    node: &ComponentNode,
    findings: &mut BTreeSet<GraphFinding>,
) {
    for binding in node.bindings.values() {
        if let Some(scope) = &binding.scope
            && !node.scopes.contains(scope)
        {
            findings.insert(GraphFinding {
                component: node.path.0.clone(),
                class: failure_class::SCOPE_UNSATISFIED.to_string(),
                subject: binding.id.to_string(),
                message: format!("binding scope {scope} is not carried by its component"),
            });
        }
    }
    for scope in &node.scopes {
        let repeated = graph
            .chain(&node.path)
            .into_iter()
            .skip(1)
            .any(|ancestor| ancestor.scopes.contains(scope));
        if repeated {
            findings.insert(GraphFinding {
                component: node.path.0.clone(),
                class: failure_class::SCOPE_SHADOWED.to_string(),
                subject: scope.to_string(),
                message: "scope tag is already carried by an ancestor component".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{WiringSpec, build_graph};
    use solder_kernel::{
        Binding, ComponentDecl, DependencyRequest, Key, ModuleDecl, ScopeTag,
    };

    fn key(name: &str) -> Key {
        Key::bare(name).expect("key must build")
    }

    fn checked(spec: WiringSpec) -> GraphCheckReport {
        check_graph(&build_graph(&spec).expect("graph must build"))
    }

    fn simple_spec(bindings: Vec<Binding>) -> WiringSpec {
        WiringSpec {
            modules: vec![ModuleDecl::new("main", bindings).expect("must build")],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_module("main")
                .with_entry_point(DependencyRequest::direct(key("Server"))),
        }
    }

    #[test]
    fn well_formed_graph_is_accepted() {
        let report = checked(simple_spec(vec![
            Binding::factory("b.db", key("Database"), vec![]).expect("must build"),
            Binding::constructor(
                "b.server",
                key("Server"),
                vec![DependencyRequest::direct(key("Database"))],
            )
            .expect("must build"),
        ]));
        assert!(report.accepted());
        assert_eq!(report.failure_classes, Vec::<String>::new());
        assert!(report.semantic_digest.starts_with("bg1_"));
    }

    #[test]
    fn check_digest_is_deterministic() {
        let build = || {
            checked(simple_spec(vec![
                Binding::factory("b.server", key("Server"), vec![]).expect("must build"),
            ]))
        };
        assert_eq!(build().semantic_digest, build().semantic_digest);
        assert_eq!(build().graph_digest, build().graph_digest);
    }

    #[test]
    fn missing_producer_is_rejected() {
        let report = checked(simple_spec(vec![
            Binding::constructor(
                "b.server",
                key("Server"),
                vec![DependencyRequest::direct(key("Database"))],
            )
            .expect("must build"),
        ]));
        assert!(!report.accepted());
        assert_eq!(
            report.failure_classes,
            vec![failure_class::BINDING_MISSING.to_string()]
        );
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let report = checked(simple_spec(vec![]));
        assert!(
            report
                .findings
                .iter()
                .any(|finding| finding.message.contains("entry point"))
        );
    }

    #[test]
    fn duplicate_producers_are_rejected() {
        let report = checked(simple_spec(vec![
            Binding::factory("b.one", key("Server"), vec![]).expect("must build"),
            Binding::factory("b.two", key("Server"), vec![]).expect("must build"),
        ]));
        assert_eq!(
            report.failure_classes,
            vec![failure_class::BINDING_DUPLICATE.to_string()]
        );
    }

    #[test]
    fn child_shadowing_ancestor_key_is_rejected() {
        let spec = WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "base",
                    vec![Binding::factory("b.db", key("Database"), vec![]).expect("must build")],
                )
                .expect("must build"),
                ModuleDecl::new(
                    "override",
                    vec![Binding::factory("b.db2", key("Database"), vec![]).expect("must build")],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_module("base")
                .with_subcomponent(
                    ComponentDecl::new("request")
                        .expect("must build")
                        .with_module("override"),
                ),
        };
        let report = checked(spec);
        assert_eq!(
            report.failure_classes,
            vec![failure_class::BINDING_DUPLICATE.to_string()]
        );
        assert_eq!(report.findings[0].component, "app/request");
    }

    #[test]
    fn unbroken_cycle_is_rejected() {
        let report = checked(simple_spec(vec![
            Binding::constructor(
                "b.server",
                key("Server"),
                vec![DependencyRequest::direct(key("Client"))],
            )
            .expect("must build"),
            Binding::constructor(
                "b.client",
                key("Client"),
                vec![DependencyRequest::direct(key("Server"))],
            )
            .expect("must build"),
        ]));
        assert_eq!(
            report.failure_classes,
            vec![failure_class::CYCLE_UNBROKEN.to_string()]
        );
        assert!(report.findings[0].subject.contains(" -> "));
    }

    #[test]
    fn cycle_through_deferred_request_is_accepted() {
        let report = checked(simple_spec(vec![
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
        ]));
        assert!(report.accepted());
    }

    #[test]
    fn scoped_binding_outside_its_scope_is_rejected() {
        let report = checked(simple_spec(vec![
            Binding::factory("b.server", key("Server"), vec![])
                .expect("must build")
                .scoped(ScopeTag::new("request")),
        ]));
        assert_eq!(
            report.failure_classes,
            vec![failure_class::SCOPE_UNSATISFIED.to_string()]
        );
    }

    #[test]
    fn scoped_binding_inside_its_scope_is_accepted() {
        let mut spec = simple_spec(vec![
            Binding::factory("b.server", key("Server"), vec![])
                .expect("must build")
                .scoped(ScopeTag::new("singleton")),
        ]);
        spec.root = spec.root.with_scope(ScopeTag::new("singleton"));
        assert!(checked(spec).accepted());
    }

    #[test]
    fn subcomponent_repeating_ancestor_scope_is_rejected() {
        let spec = WiringSpec {
            modules: vec![],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_scope(ScopeTag::new("singleton"))
                .with_subcomponent(
                    ComponentDecl::new("request")
                        .expect("must build")
                        .with_scope(ScopeTag::new("singleton")),
                ),
        };
        let report = checked(spec);
        assert_eq!(
            report.failure_classes,
            vec![failure_class::SCOPE_SHADOWED.to_string()]
        );
    }

    #[test]
    fn subcomponent_resolves_via_ancestor() {
        let spec = WiringSpec {
            modules: vec![
                ModuleDecl::new(
                    "base",
                    vec![Binding::factory("b.db", key("Database"), vec![]).expect("must build")],
                )
                .expect("must build"),
            ],
            root: ComponentDecl::new("app")
                .expect("must build")
                .with_module("base")
                .with_subcomponent(
                    ComponentDecl::new("request")
                        .expect("must build")
                        .with_entry_point(DependencyRequest::direct(key("Database"))),
                ),
        };
        assert!(checked(spec).accepted());
    }
}
