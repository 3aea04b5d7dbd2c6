//! Callback id correlation
//!
//! When a module asks the host to run a tool it passes a callback id. Each id
//! maps to exactly one pending result, which is settled once.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// Resolved value or rejection message
pub type CallbackOutcome = Result<Value, String>;

enum Slot {
    Pending(oneshot::Sender<CallbackOutcome>),
    Settled,
}

/// Pending results keyed by callback id
#[derive(Default)]
pub struct CallbackRegistry {
    slots: Mutex<HashMap<u32, Slot>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<u32, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start waiting on `id`.
    ///
    /// # Errors
    ///
    /// `CallbackIdReused` if `id` is still pending. An id whose result was
    /// settled may be registered again.
    pub fn register(&self, id: u32) -> BridgeResult<oneshot::Receiver<CallbackOutcome>> {
        let mut slots = self.slots();
        if matches!(slots.get(&id), Some(Slot::Pending(_))) {
            return Err(BridgeError::CallbackIdReused(id));
        }
        let (sender, receiver) = oneshot::channel();
        slots.insert(id, Slot::Pending(sender));
        Ok(receiver)
    }

    pub fn resolve(&self, id: u32, value: Value) -> BridgeResult<()> {
        self.settle(id, Ok(value))
    }

    pub fn reject(&self, id: u32, message: impl Into<String>) -> BridgeResult<()> {
        self.settle(id, Err(message.into()))
    }

    fn settle(&self, id: u32, outcome: CallbackOutcome) -> BridgeResult<()> {
        let mut slots = self.slots();
        let slot = slots.get_mut(&id).ok_or(BridgeError::UnknownCallback(id))?;
        match std::mem::replace(slot, Slot::Settled) {
            Slot::Pending(sender) => {
                if sender.send(outcome).is_err() {
                    debug!(callback_id = id, "Callback receiver dropped before settlement");
                }
                Ok(())
            }
            Slot::Settled => Err(BridgeError::CallbackAlreadySettled(id)),
        }
    }

    /// Forget `id` once its result has been consumed.
    pub fn release(&self, id: u32) {
        self.slots().remove(&id);
    }

    pub fn is_pending(&self, id: u32) -> bool {
        matches!(self.slots().get(&id), Some(Slot::Pending(_)))
    }

    /// Number of ids currently tracked, pending or settled.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolves_once() {
        let registry = CallbackRegistry::new();
        let receiver = registry.register(1).unwrap();
        assert!(registry.is_pending(1));

        registry.resolve(1, json!({"id": "p1"})).unwrap();
        assert_eq!(receiver.await.unwrap(), Ok(json!({"id": "p1"})));
        assert!(!registry.is_pending(1));

        let err = registry.reject(1, "late").unwrap_err();
        assert!(matches!(err, BridgeError::CallbackAlreadySettled(1)));
    }

    #[tokio::test]
    async fn rejection_carries_message() {
        let registry = CallbackRegistry::new();
        let receiver = registry.register(9).unwrap();
        registry.reject(9, "Scene is locked").unwrap();
        assert_eq!(receiver.await.unwrap(), Err("Scene is locked".to_string()));
    }

    #[test]
    fn pending_id_cannot_be_reused() {
        let registry = CallbackRegistry::new();
        let _receiver = registry.register(3).unwrap();
        assert!(matches!(
            registry.register(3),
            Err(BridgeError::CallbackIdReused(3))
        ));
    }

    #[test]
    fn settled_id_can_be_registered_again() {
        let registry = CallbackRegistry::new();
        let _first = registry.register(5).unwrap();
        registry.resolve(5, Value::Null).unwrap();
        assert!(registry.register(5).is_ok());
    }

    #[test]
    fn unknown_and_released_ids() {
        let registry = CallbackRegistry::new();
        assert!(matches!(
            registry.resolve(42, Value::Null),
            Err(BridgeError::UnknownCallback(42))
        ));

        let _receiver = registry.register(42).unwrap();
        registry.release(42);
        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve(42, Value::Null),
            Err(BridgeError::UnknownCallback(42))
        ));
    }
}
