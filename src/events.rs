//! Observer lists and the event payloads raised by connections and the server.
//!
//! Callbacks run on whichever task raises the event. A panicking callback is
//! logged and skipped; the remaining callbacks still see the event.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;
use uuid::Uuid;

use crate::error::Error;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A list of callbacks interested in events of type `E`.
pub struct Observers<E> {
    callbacks: RwLock<Vec<Callback<E>>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Delivers `event` to every callback in subscription order.
    ///
    /// The list is snapshotted first, so callbacks may subscribe or clear
    /// without deadlocking.
    pub fn emit(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!("event observer panicked, continuing delivery");
            }
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}

/// Progress of a message being sent or received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProgress {
    /// Start line of the message in flight, without its CRLF.
    pub first_line: String,
    /// `true` for the single event raised once the head is complete.
    pub just_headers: bool,
    pub bytes_this_callback: usize,
    pub total_bytes: usize,
}

/// A failure reported by the accept loop or by a connection.
#[derive(Debug, Clone)]
pub struct ExceptionEvent {
    /// `None` when the failure did not belong to a connection.
    pub connection_id: Option<Uuid>,
    pub error: Arc<Error>,
}

impl ExceptionEvent {
    pub fn new(connection_id: Option<Uuid>, error: Error) -> Self {
        Self {
            connection_id,
            error: Arc::new(error),
        }
    }
}

impl fmt::Display for ExceptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.connection_id {
            Some(id) => write!(f, "connection {id}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Raised before an address is resolved for an outbound connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressResolution {
    pub address: String,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn panicking_observer_does_not_block_the_rest() {
        let observers: Observers<u32> = Observers::new();
        let seen = Arc::new(AtomicUsize::new(0));

        observers.subscribe(|_| panic!("boom"));
        let counter = seen.clone();
        observers.subscribe(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        observers.emit(&3);
        observers.emit(&4);

        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
