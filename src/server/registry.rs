use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::connection::ConnectionHandle;

/// The server's view of its live connections, keyed by id.
///
/// Entries are shared handles: dropping one from the registry does not close
/// the connection, it only forgets it.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<Vec<Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<ConnectionHandle>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `connection`; fails if its id is already present.
    pub fn add(&self, connection: Arc<ConnectionHandle>) -> Result<()> {
        let mut connections = self.lock();
        if connections.iter().any(|c| c.id() == connection.id()) {
            return Err(Error::DuplicateConnection(connection.id()));
        }
        connections.push(connection);
        Ok(())
    }

    /// Removes the connection with `id`. Removing an absent id is a no-op.
    pub fn remove(&self, id: Uuid) -> Option<Arc<ConnectionHandle>> {
        let mut connections = self.lock();
        let index = connections.iter().position(|c| c.id() == id)?;
        Some(connections.remove(index))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().iter().any(|c| c.id() == id)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.lock().iter().find(|c| c.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The current entries, for iterating without holding the lock.
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.lock().clone()
    }
}
