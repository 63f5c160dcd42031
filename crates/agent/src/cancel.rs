//! Run-level cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use agora_core::error::{Error, Result};

/// Shared flag checked before each pipeline step.
///
/// Setting it never interrupts a model call already in flight; the run stops
/// at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` if the flag is set, naming the step that will not run.
    pub fn check(&self, step: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled {
                step: step.to_string(),
            });
        }
        Ok(())
    }
}
