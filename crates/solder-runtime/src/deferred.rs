//! Deferred value handles.
//!
//! A deferred dependency request breaks a cycle: the consumer is built
//! first and receives a handle instead of a value. The handle is
//! observed after construction; a failure in the underlying binding
//! surfaces at observation, not at handle creation.

use crate::error::RuntimeError;
use crate::executor::{InstanceCore, Wait};
use serde_json::Value;
use solder_kernel::Key;
use std::sync::Weak;
use tokio::sync::watch;

/// The shared slot a settled handle reads: empty until the producing
/// binding completes, then its outcome.
pub(crate) type SettledSlot = Option<Result<Value, String>>;

/// A handle to a value that becomes observable after construction.
///
/// Synchronous execution hands out lazy handles bound to the owning
/// component instance; asynchronous execution hands out settled handles
/// backed by the producing task's completion slot.
#[derive(Clone)]
pub struct Deferred {
    key: Key,
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Lazy(Weak<InstanceCore>),
    Settled(watch::Receiver<SettledSlot>),
}

impl Deferred {
    pub(crate) fn lazy(key: Key, core: Weak<InstanceCore>) -> Self {
        Self {
            key,
            inner: Inner::Lazy(core),
        }
    }

    pub(crate) fn settled(key: Key, slot: watch::Receiver<SettledSlot>) -> Self {
        Self {
            key,
            inner: Inner::Settled(slot),
        }
    }

    /// The key this handle resolves to.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Observe the value now.
    ///
    /// A lazy handle resolves through its component instance; if the
    /// producing binding is still mid-construction the observation
    /// reports pending rather than blocking on itself. A settled handle
    /// reads the completion slot without waiting.
    pub fn observe(&self) -> Result<Value, RuntimeError> {
        match &self.inner {
            Inner::Lazy(core) => {
                let core = core.upgrade().ok_or(RuntimeError::InstanceDropped)?;
                core.resolve_key(&self.key, Wait::NoBlock)
            }
            Inner::Settled(slot) => match slot.borrow().as_ref() {
                None => Err(RuntimeError::DeferredPending {
                    key: self.key.canonical(),
                }),
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(message)) => Err(RuntimeError::DeferredFailed {
                    key: self.key.canonical(),
                    message: message.clone(),
                }),
            },
        }
    }

    /// Await the value.
    ///
    /// A settled handle waits for the producing task to complete; a lazy
    /// handle resolves immediately, as [`observe`](Self::observe) does.
    pub async fn wait(&self) -> Result<Value, RuntimeError> {
        match &self.inner {
            Inner::Lazy(_) => self.observe(),
            Inner::Settled(slot) => {
                let mut slot = slot.clone();
                let filled = slot
                    .wait_for(|outcome| outcome.is_some())
                    .await
                    .map_err(|_| RuntimeError::InstanceDropped)?;
                match filled.as_ref() {
                    Some(Ok(value)) => Ok(value.clone()),
                    Some(Err(message)) => Err(RuntimeError::DeferredFailed {
                        key: self.key.canonical(),
                        message: message.clone(),
                    }),
                    None => Err(RuntimeError::DeferredPending {
                        key: self.key.canonical(),
                    }),
                }
            }
        }
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.inner {
            Inner::Lazy(_) => "lazy",
            Inner::Settled(slot) => {
                if slot.borrow().is_some() {
                    "settled"
                } else {
                    "pending"
                }
            }
        };
        f.debug_struct("Deferred")
            .field("key", &self.key.canonical())
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settled_handle_reports_pending_until_filled() {
        let (tx, rx) = watch::channel(None);
        let deferred = Deferred::settled(
            Key::bare("Server").expect("key must build"),
            rx,
        );
        assert!(matches!(
            deferred.observe(),
            Err(RuntimeError::DeferredPending { .. })
        ));

        tx.send(Some(Ok(json!("up")))).expect("receiver must live");
        assert_eq!(deferred.observe().expect("value must be settled"), json!("up"));
    }

    #[test]
    fn settled_handle_surfaces_producer_failure() {
        let (tx, rx) = watch::channel(None);
        let deferred = Deferred::settled(
            Key::bare("Server").expect("key must build"),
            rx,
        );
        tx.send(Some(Err("boom".to_string())))
            .expect("receiver must live");
        assert!(matches!(
            deferred.observe(),
            Err(RuntimeError::DeferredFailed { message, .. }) if message == "boom"
        ));
    }

    #[tokio::test]
    async fn wait_resumes_when_producer_settles() {
        let (tx, rx) = watch::channel(None);
        let deferred = Deferred::settled(
            Key::bare("Server").expect("key must build"),
            rx,
        );
        let waiter = tokio::spawn(async move { deferred.wait().await });

        tx.send(Some(Ok(json!(7)))).expect("receiver must live");
        let value = waiter
            .await
            .expect("task must finish")
            .expect("value must settle");
        assert_eq!(value, json!(7));
    }
}
