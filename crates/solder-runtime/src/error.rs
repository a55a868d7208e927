//! Error types for graph execution.

use thiserror::Error;

/// Errors arising while executing a binding graph.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The graph did not pass validation; execution refuses to start.
    #[error("graph rejected by validation: {}", failure_classes.join(", "))]
    RejectedGraph { failure_classes: Vec<String> },

    #[error(transparent)]
    Graph(#[from] solder_graph::GraphError),

    /// A component path not present in the graph.
    #[error("unknown component path {0}")]
    UnknownComponent(String),

    /// A key with no producer as seen from a component.
    #[error("no producer for key {key} as seen from component {component}")]
    UnknownKey { component: String, key: String },

    /// A user binding with no registered provider.
    #[error("no provider registered for binding {binding_id}")]
    MissingProvider { binding_id: String },

    /// A provider failed while producing a value.
    #[error("provider for binding {binding_id} in component {component} failed: {message}")]
    Provider {
        binding_id: String,
        component: String,
        message: String,
    },

    /// A deferred value was observed before its producer completed.
    #[error("deferred value for key {key} is not yet available")]
    DeferredPending { key: String },

    /// The producer behind a deferred value failed; the failure
    /// surfaces at observation.
    #[error("deferred value for key {key} failed: {message}")]
    DeferredFailed { key: String, message: String },

    /// A deferred handle outlived its component instance.
    #[error("component instance behind a deferred value was dropped")]
    InstanceDropped,
}

impl RuntimeError {
    /// A provider-level failure with free-form message, for use inside
    /// provider closures.
    pub fn provider_failure(message: impl Into<String>) -> Self {
        RuntimeError::Provider {
            binding_id: String::new(),
            component: String::new(),
            message: message.into(),
        }
    }
}
