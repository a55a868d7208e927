//! # Solder Kernel
//!
//! The data model for dependency-graph resolution: a requested value is
//! identified by a [`Key`] (type plus optional qualifier), produced by a
//! [`Binding`], and looked up inside a [`ComponentDecl`] tree whose
//! nodes carry scope tags.
//!
//! This crate is model-only: it prescribes how keys, bindings, and
//! components relate, not how values are produced or in what order.
//! Graph assembly and validation live in `solder-graph`; execution lives
//! in `solder-runtime`.
//!
//! ## Architecture
//!
//! ```text
//! Key              ← (canonical type, optional qualifier)
//!     │
//! Binding          ← one producer per key; deps are DependencyRequests
//!     │
//! ModuleDecl       ← named bundle of bindings + multibinding decls
//!     │
//! ComponentDecl    ← scope tags, installed modules, entry points,
//!                    nested subcomponents (a tree)
//! ```

pub mod binding;
pub mod component;
pub mod error;
pub mod key;
pub mod module;
pub mod scope;

pub use binding::{Binding, BindingId, BindingKind, DependencyMode, DependencyRequest};
pub use component::{ComponentDecl, ComponentPath};
pub use error::KernelError;
pub use key::{Key, Qualifier, canonical_type_name};
pub use module::ModuleDecl;
pub use scope::ScopeTag;
