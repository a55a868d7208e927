//! Deterministic execution planning.
//!
//! A plan is the topological order of the bindings reachable from one
//! component's entry points. Deferred requests contribute to
//! reachability (the value will be observed eventually) but carry no
//! ordering constraint, which is exactly how a deferred cycle stays
//! executable. Ties break on canonical binding-ref order so equal
//! graphs yield byte-equal plans.

use crate::digest::digest_material;
use crate::error::GraphError;
use crate::graph::{BindingGraph, BindingRef};
use serde::{Deserialize, Serialize};
use solder_kernel::ComponentPath;
use std::collections::{BTreeMap, BTreeSet};

pub const PLAN_KIND: &str = "solder.graph.plan.v1";
const PLAN_DIGEST_PREFIX: &str = "pl1_";

/// One executable step in the plan projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub binding_id: String,
    pub owner: String,
    pub key: String,
    pub kind: String,
    pub scoped: bool,
}

/// The ordered plan for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub plan_kind: String,
    pub component: ComponentPath,
    pub order: Vec<BindingRef>,
    pub steps: Vec<PlanStep>,
    pub semantic_digest: String,
}

/// Plan execution for the component at `path`.
///
/// Expects a graph that passed [`crate::check_graph`]; an unresolved
/// key or an unbroken cycle is an error here, not a report.
pub fn plan_component(
    graph: &BindingGraph,
    path: &ComponentPath,
) -> Result<ExecutionPlan, GraphError> {
    let node = graph
        .node(path)
        .ok_or_else(|| GraphError::UnknownComponent(path.0.clone()))?;

    // Reachability over every request mode.
    let mut reachable: BTreeSet<BindingRef> = BTreeSet::new();
    let mut frontier: Vec<BindingRef> = Vec::new();
    for request in &node.entry_points {
        let binding_ref = graph.resolve(path, &request.key).ok_or_else(|| {
            GraphError::UnresolvedKey {
                component: path.0.clone(),
                key: request.key.canonical(),
            }
        })?;
        frontier.push(binding_ref);
    }
    while let Some(binding_ref) = frontier.pop() {
        if !reachable.insert(binding_ref.clone()) {
            continue;
        }
        let binding = graph
            .binding(&binding_ref)
            .ok_or_else(|| GraphError::UnknownComponent(binding_ref.owner.0.clone()))?;
        for request in &binding.dependencies {
            let dep_ref = graph.resolve(&binding_ref.owner, &request.key).ok_or_else(|| {
                GraphError::UnresolvedKey {
                    component: binding_ref.owner.0.clone(),
                    key: request.key.canonical(),
                }
            })?;
            frontier.push(dep_ref);
        }
    }

    // Ordering edges: direct requests only.
    let mut in_degree: BTreeMap<BindingRef, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<BindingRef, Vec<BindingRef>> = BTreeMap::new();
    for binding_ref in &reachable {
        in_degree.entry(binding_ref.clone()).or_insert(0);
        let binding = graph
            .binding(binding_ref)
            .ok_or_else(|| GraphError::UnknownComponent(binding_ref.owner.0.clone()))?;
        for key in binding.direct_dependency_keys() {
            let dep_ref = graph.resolve(&binding_ref.owner, key).ok_or_else(|| {
                GraphError::UnresolvedKey {
                    component: binding_ref.owner.0.clone(),
                    key: key.canonical(),
                }
            })?;
            *in_degree.entry(binding_ref.clone()).or_insert(0) += 1;
            dependents
                .entry(dep_ref)
                .or_default()
                .push(binding_ref.clone());
        }
    }

    let mut ready: BTreeSet<BindingRef> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(binding_ref, _)| binding_ref.clone())
        .collect();
    let mut order: Vec<BindingRef> = Vec::new();
    while let Some(next) = ready.pop_first() {
        order.push(next.clone());
        for dependent in dependents.get(&next).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent.clone());
                }
            }
        }
    }
    if order.len() != reachable.len() {
        return Err(GraphError::CyclicPlan {
            component: path.0.clone(),
        });
    }

    let mut steps = Vec::with_capacity(order.len());
    for binding_ref in &order {
        let binding = graph
            .binding(binding_ref)
            .ok_or_else(|| GraphError::UnknownComponent(binding_ref.owner.0.clone()))?;
        steps.push(PlanStep {
            binding_id: binding_ref.id.to_string(),
            owner: binding_ref.owner.to_string(),
            key: binding.key.canonical(),
            kind: binding.kind.as_str().to_string(),
            scoped: binding.scope.is_some(),
        });
    }

    let mut material = vec![path.0.clone()];
    material.extend(steps.iter().map(|step| {
        format!("{}::{}::{}::{}", step.owner, step.binding_id, step.key, step.kind)
    }));
    let semantic_digest = digest_material(PLAN_DIGEST_PREFIX, &material);

    Ok(ExecutionPlan {
        plan_kind: PLAN_KIND.to_string(),
        component: path.clone(),
        order,
        steps,
        semantic_digest,
    })
}
