//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;

use crate::{Error, csv_import::Store};

/// The default maximum size of an uploaded CSV file in bytes.
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 100 * 1024 * 1024;

/// The analysis of one uploaded file.
#[derive(Debug)]
pub struct AnalysisSession {
    /// The name of the uploaded file as given by the browser.
    pub file_name: String,

    /// The store holding the uploaded transactions.
    pub store: Store,

    /// When the file was loaded.
    pub loaded_at: OffsetDateTime,
}

/// The single slot holding the current analysis, if a file has been uploaded.
pub type SessionSlot = Arc<Mutex<Option<AnalysisSession>>>;

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The current analysis session.
    pub session: SessionSlot,

    /// The maximum size of a request body in bytes.
    pub upload_limit_bytes: usize,
}

impl AppState {
    /// Create a new [AppState] with no uploaded file.
    pub fn new(upload_limit_bytes: usize) -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            upload_limit_bytes,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_LIMIT_BYTES)
    }
}

/// Acquire the lock on the session slot.
///
/// # Errors
/// Returns an [Error::SessionLockError] if the lock is poisoned.
pub fn lock_session(
    session: &SessionSlot,
) -> Result<MutexGuard<'_, Option<AnalysisSession>>, Error> {
    session.lock().map_err(|error| {
        tracing::error!("could not acquire session lock: {error}");
        Error::SessionLockError
    })
}
