//! Cooperative cancellation for long-running operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{LutoolsError, LutoolsResult};

/// Shared cancellation flag.
///
/// Any clone may request cancellation; the running operation polls it between
/// batches with [`CancelToken::check`], which consumes the request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running operation to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a request is pending.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Drop any pending request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Return `Cancelled` and clear the request if one is pending.
    pub fn check(&self) -> LutoolsResult<()> {
        if self.0.swap(false, Ordering::SeqCst) {
            Err(LutoolsError::Cancelled)
        } else {
            Ok(())
        }
    }
}
