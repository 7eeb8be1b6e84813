//! Cancellation of in-flight ipset invocations.
//!
//! A [`CancelToken`] is a shared flag. Clones observe the same flag, so a
//! token handed to an [`IpSet`](crate::IpSet) can be tripped from another
//! thread (a signal handler, a supervisor) to kill the running subprocess.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone of this token observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can be reused for the next operation.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}
