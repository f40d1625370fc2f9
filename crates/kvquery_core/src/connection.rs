//! The connection handle shared by every engine.

use crate::error::{CoreError, CoreResult};
use kvquery_storage::StorageBackend;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An explicit handle to one storage backend.
///
/// Every core operation goes through a `Connection`; there is no global
/// store. Clones share the same backend and the same open/closed state,
/// so closing one clone closes all of them.
///
/// A connection counts as open while it has not been closed here and
/// the backend itself reports open.
#[derive(Clone)]
pub struct Connection {
    backend: Arc<dyn StorageBackend>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Wraps a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Returns true if operations may run.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.backend.is_open()
    }

    /// Closes this connection. The backend is left alone.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Fails with [`CoreError::StoreUnavailable`] unless open.
    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::StoreUnavailable)
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
