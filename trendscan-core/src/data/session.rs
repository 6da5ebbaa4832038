//! Chart-API session state: warm-up flag and active host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub const PRIMARY_HOST: &str = "query2.finance.yahoo.com";
pub const ALTERNATE_HOST: &str = "query1.finance.yahoo.com";

/// Process-wide session flags shared by every chart request.
#[derive(Debug)]
pub struct SessionState {
    primed: AtomicBool,
    warm_up_lock: Mutex<()>,
    use_primary_host: AtomicBool,
}

impl SessionState {
    pub fn new(prefer_primary_host: bool) -> Self {
        Self {
            primed: AtomicBool::new(false),
            warm_up_lock: Mutex::new(()),
            use_primary_host: AtomicBool::new(prefer_primary_host),
        }
    }

    pub fn is_primed(&self) -> bool {
        self.primed.load(Ordering::Acquire)
    }

    /// Run `warm_up` unless the session is already primed.
    ///
    /// Racing callers block on the lock and observe the flag afterwards, so at
    /// most one warm-up runs per priming. The session counts as primed even if
    /// `warm_up` fails; a failed warm-up only loses cookies.
    pub fn ensure_primed<F: FnOnce()>(&self, warm_up: F) {
        if self.is_primed() {
            return;
        }
        let _guard = self
            .warm_up_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_primed() {
            return;
        }
        warm_up();
        self.primed.store(true, Ordering::Release);
    }

    /// Forget the session so the next request warms up again.
    pub fn invalidate(&self) {
        self.primed.store(false, Ordering::Release);
    }

    pub fn host(&self) -> &'static str {
        if self.use_primary_host.load(Ordering::Acquire) {
            PRIMARY_HOST
        } else {
            ALTERNATE_HOST
        }
    }

    /// Switch to the other host. Returns the host now active.
    pub fn flip_host(&self) -> &'static str {
        self.use_primary_host.fetch_xor(true, Ordering::AcqRel);
        self.host()
    }
}
