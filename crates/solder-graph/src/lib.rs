//! # Solder Graph
//!
//! Assembly, validation, and planning over the kernel model.
//!
//! A [`WiringSpec`] (modules + component tree) is assembled into a
//! [`BindingGraph`]: a bipartite directed graph of binding nodes and
//! key nodes stored per component with parent links. [`check_graph`]
//! validates the model invariants and returns a digested
//! [`GraphCheckReport`]; [`plan_component`] turns an accepted graph
//! into a deterministic [`ExecutionPlan`] for one component.
//!
//! Semantic failures are reported as string failure classes, never as
//! panics; structurally unusable input is a [`GraphError`].

pub mod builder;
pub mod digest;
pub mod error;
pub mod graph;
pub mod plan;
pub mod spec;
pub mod validate;

pub use builder::{WiringSpec, build_graph, element_key, optional_key};
pub use error::GraphError;
pub use graph::{BindingGraph, BindingRef, ComponentNode};
pub use plan::{ExecutionPlan, PLAN_KIND, PlanStep, plan_component};
pub use spec::{ProviderRow, ProviderRows, WIRING_SPEC_KIND, WiringSpecInput};
pub use validate::{
    GRAPH_CHECK_KIND, GraphCheckReport, GraphFinding, GraphSummary, check_graph, failure_class,
};
