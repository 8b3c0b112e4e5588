//! Per-request unit of work.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crudkit_core::result::AppResult;
use crudkit_core::traits::{SessionFactory, StorageSession};

/// One storage session shared by every repository serving a request.
///
/// Clones share the session. Calls are serialized through an async mutex.
/// When the last clone is dropped, the session goes with it and any
/// uncommitted writes are rolled back.
#[derive(Clone)]
pub struct UnitOfWork {
    session: Arc<Mutex<Box<dyn StorageSession>>>,
}

impl UnitOfWork {
    /// Wrap an open session.
    pub fn new(session: Box<dyn StorageSession>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Open a session from the factory.
    pub async fn begin(factory: &dyn SessionFactory) -> AppResult<Self> {
        Ok(Self::new(factory.open().await?))
    }

    /// Exclusive access to the session.
    pub async fn session(&self) -> MutexGuard<'_, Box<dyn StorageSession>> {
        self.session.lock().await
    }

    /// Commit every write made so far.
    pub async fn commit(&self) -> AppResult<()> {
        self.session.lock().await.commit().await
    }

    /// Discard every uncommitted write.
    pub async fn rollback(&self) {
        if let Err(err) = self.session.lock().await.rollback().await {
            warn!(error = %err, "Rollback failed");
        }
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("shared", &Arc::strong_count(&self.session))
            .finish()
    }
}
