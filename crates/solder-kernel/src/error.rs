//! Error types for kernel-level invariants.

use thiserror::Error;

/// Errors arising from malformed model declarations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A key was declared with an empty or blank type name.
    #[error("empty type name in key declaration")]
    EmptyTypeName,

    /// A binding, module, or component carried a blank identifier.
    #[error("empty identifier: {0}")]
    EmptyIdentifier(String),

    /// Two bindings in the same module share an id.
    #[error("duplicate binding id {binding_id} in module {module}")]
    DuplicateBindingId { module: String, binding_id: String },

    /// A user declaration used a binding kind reserved for synthesis.
    #[error("binding {binding_id} declares synthetic kind {kind}")]
    SyntheticKindDeclared { binding_id: String, kind: String },
}
