//! # Solder Runtime
//!
//! Executors over validated binding graphs.
//!
//! Values are JSON documents; user bindings execute through a
//! [`ProviderRegistry`] while synthetic bindings (collections,
//! optionals, component references, aliases) execute internally.
//! [`ComponentInstance`] resolves keys inline with per-instance scope
//! caches; [`AsyncComponentInstance`] dispatches whole waves onto a
//! tokio runtime with one task per reachable binding. Both hand out
//! [`Deferred`] handles for cycle-breaking requests, observable after
//! construction.

pub mod async_executor;
pub mod deferred;
pub mod error;
pub mod executor;
pub mod provider;

pub use async_executor::AsyncComponentInstance;
pub use deferred::Deferred;
pub use error::RuntimeError;
pub use executor::ComponentInstance;
pub use provider::{ProviderFn, ProviderRegistry, ResolvedDep};
