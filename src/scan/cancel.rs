//! Cooperative cancellation.
//!
//! The abort key is polled at every checkpoint and inside every wait, so a
//! press takes effect within one poll slice.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error returned from a checkpoint after the user aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanAborted;

impl fmt::Display for ScanAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan aborted by user")
    }
}

impl std::error::Error for ScanAborted {}

type AbortProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// Shared abort flag plus an optional key probe.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    probe: Option<AbortProbe>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires when `probe` returns true.
    pub fn with_probe<F>(probe: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            probe: Some(Arc::new(probe)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears the flag. Call before starting a new session.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Polls the probe; a positive probe latches the flag.
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(probe) = &self.probe {
            if probe() {
                self.cancel();
                return true;
            }
        }
        false
    }

    pub fn checkpoint(&self) -> Result<(), ScanAborted> {
        if self.is_cancelled() {
            Err(ScanAborted)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.flag.load(Ordering::SeqCst))
            .field("has_probe", &self.probe.is_some())
            .finish()
    }
}
