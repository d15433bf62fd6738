//! Listener registration and broadcast

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::event::StorageEvent;
use crate::observability::{Event, Logger};

/// Receives storage events. Called synchronously on the mutating thread.
pub trait StorageListener: Send + Sync {
    fn changed(&self, event: &StorageEvent);
}

impl<F> StorageListener for F
where
    F: Fn(&StorageEvent) + Send + Sync,
{
    fn changed(&self, event: &StorageEvent) {
        self(event)
    }
}

/// Handle returned by [`ListenerRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Snapshot = Arc<Vec<(ListenerId, Arc<dyn StorageListener>)>>;

/// Copy-on-write listener set.
///
/// Mutations replace the shared vector under the lock; broadcasts clone
/// the current `Arc` under the lock and dispatch after releasing it.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Snapshot>,
    next_id: AtomicU64,
}

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub delivered: usize,
    /// Listeners that panicked
    pub failed: usize,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn StorageListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        let mut next: Vec<_> = guard.iter().cloned().collect();
        next.push((id, listener));
        *guard = Arc::new(next);
        id
    }

    /// Returns false when `id` was not registered
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut guard = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        if !guard.iter().any(|(lid, _)| *lid == id) {
            return false;
        }
        let next: Vec<_> = guard.iter().filter(|(lid, _)| *lid != id).cloned().collect();
        *guard = Arc::new(next);
        true
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        let guard = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Delivers `event` to every listener registered when the broadcast
    /// started. A panicking listener is logged and does not stop delivery
    /// to the others.
    pub fn broadcast(&self, event: &StorageEvent) -> DispatchResult {
        let snapshot = self.snapshot();
        let mut result = DispatchResult::default();
        for (id, listener) in snapshot.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.changed(event))) {
                Ok(()) => result.delivered += 1,
                Err(_) => {
                    result.failed += 1;
                    let listener_id = id.0.to_string();
                    let kind = event.kind.to_string();
                    Logger::error(
                        Event::ListenerFailed.as_str(),
                        &[
                            ("listener", listener_id.as_str()),
                            ("kind", kind.as_str()),
                            ("schema", event.schema_name.as_str()),
                        ],
                    );
                }
            }
        }
        result
    }
}
