//! Request throttling shared by every fetch worker.
//!
//! - [`Semaphore`] caps simultaneous in-flight requests.
//! - [`IntervalGate`] enforces a minimum spacing between successive requests
//!   with a compare-and-swap loop on the last-call timestamp, so waiting
//!   workers never hold a lock.
//! - [`Clock`] is injected so tests can run on manual time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time source and sleeper.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed epoch.
    fn now_millis(&self) -> u64;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `SystemTime` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manual clock: `sleep` advances time instantly and is recorded.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn starting_at(millis: u64) -> Self {
        Self {
            now: AtomicU64::new(millis),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Every sleep requested so far, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        self.advance(duration);
    }
}

/// Counting semaphore. Permits are released when the guard drops.
#[derive(Debug)]
pub struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut available = self
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        Permit { semaphore: self }
    }

    pub fn available(&self) -> usize {
        *self
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        *self
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        self.released.notify_one();
    }
}

/// RAII permit from a [`Semaphore`].
#[derive(Debug)]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// Minimum spacing between successive requests, process-wide.
#[derive(Debug)]
pub struct IntervalGate {
    last_call_ms: AtomicU64,
    min_gap_ms: u64,
}

impl IntervalGate {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            last_call_ms: AtomicU64::new(0),
            min_gap_ms: min_gap.as_millis() as u64,
        }
    }

    /// Wait for this caller's slot. Returns the timestamp claimed.
    pub fn wait(&self, clock: &dyn Clock) -> u64 {
        loop {
            let now = clock.now_millis();
            let last = self.last_call_ms.load(Ordering::Acquire);
            let next = last.saturating_add(self.min_gap_ms);
            if now >= next {
                if self
                    .last_call_ms
                    .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return now;
                }
                continue;
            }
            // Sleep at most one gap, then re-check: another caller may have claimed the slot.
            clock.sleep(Duration::from_millis((next - now).min(self.min_gap_ms)));
        }
    }
}

/// Permit pool + interval gate, entered before every primary-provider request.
pub struct RequestGate {
    permits: Semaphore,
    interval: IntervalGate,
    clock: Arc<dyn Clock>,
}

impl RequestGate {
    pub fn new(max_in_flight: usize, min_gap: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            permits: Semaphore::new(max_in_flight),
            interval: IntervalGate::new(min_gap),
            clock,
        }
    }

    /// Acquire a permit, then wait for the interval slot. Hold the permit for the request.
    pub fn enter(&self) -> Permit<'_> {
        let permit = self.permits.acquire();
        self.interval.wait(self.clock.as_ref());
        permit
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
