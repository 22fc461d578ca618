use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AtlasError, Result};

/// Cooperative cancellation flag shared between a host and a running job.
///
/// The engine checks it before each candidate canvas size and before each strategy attempt,
/// never in the middle of a placement.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AtlasError::Cancelled)
        } else {
            Ok(())
        }
    }
}
