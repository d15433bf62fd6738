//! Storage change notification
//!
//! The store facade owns one [`ListenerRegistry`] and broadcasts a
//! [`StorageEvent`] after every mutation has taken visible effect.
//! Dispatch is synchronous and runs over a snapshot of the listener set,
//! so listeners may register or unregister from inside a callback.

mod event;
mod registry;

pub use event::{EventKind, StorageEvent};
pub use registry::{DispatchResult, ListenerId, ListenerRegistry, StorageListener};
