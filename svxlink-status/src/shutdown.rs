//! Cooperative shutdown signalling
//!
//! A [`Shutdown`] handle is cloned into every component that waits. Triggering
//! any clone wakes all pending [`Shutdown::wait`] calls immediately.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cloneable cancellation handle
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    /// Create a handle that has not been triggered
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter
    pub fn trigger(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`, returning early on shutdown
    ///
    /// Returns true if shutdown was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut triggered = flag.lock().unwrap_or_else(PoisonError::into_inner);

        while !*triggered {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            triggered = cvar
                .wait_timeout(triggered, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }

        *triggered
    }
}
