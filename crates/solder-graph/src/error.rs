//! Error types for graph assembly and planning.

use thiserror::Error;

/// Errors arising while assembling or planning a binding graph.
///
/// Semantic problems (missing producers, duplicates, cycles, scope
/// violations) are not errors here: they come back as failure classes
/// on a [`crate::GraphCheckReport`]. These variants cover input that is
/// structurally unusable.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Kernel(#[from] solder_kernel::KernelError),

    /// Two modules in the wiring spec share a name.
    #[error("duplicate module name {0}")]
    DuplicateModule(String),

    /// A component installs a module the spec does not define.
    #[error("component {component} installs unknown module {module}")]
    UnknownModule { component: String, module: String },

    /// Two bindings owned by the same component share an id.
    #[error("duplicate binding id {binding_id} in component {component}")]
    DuplicateBindingId {
        component: String,
        binding_id: String,
    },

    /// An alias row did not carry exactly one dependency.
    #[error("alias binding {binding_id} must have exactly one dependency")]
    MalformedAlias { binding_id: String },

    /// A binding row named a kind the model does not define.
    #[error("binding {binding_id} names unknown kind {kind}")]
    UnknownBindingKind { binding_id: String, kind: String },

    /// A key had no producer while planning; the graph was not checked
    /// first.
    #[error("no producer for key {key} as seen from component {component}")]
    UnresolvedKey { component: String, key: String },

    /// A plan was requested for a component path not in the graph.
    #[error("unknown component path {0}")]
    UnknownComponent(String),

    /// Planning found an unbroken cycle; the graph was not checked
    /// first.
    #[error("cannot plan component {component}: unbroken dependency cycle")]
    CyclicPlan { component: String },
}
