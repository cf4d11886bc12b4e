//! Request throttling: single-flight gate and per-requester rate limiter
//!
//! Two independent mechanisms guard the pipeline:
//!
//! - [`ConcurrencyGate`]: at most one pipeline run in flight system-wide.
//!   `try_acquire` is non-blocking; the loser is told to try again later,
//!   never queued. The permit releases on drop, so the gate opens again on
//!   every exit path including panics and future cancellation.
//! - [`RateLimiter`]: a per-requester sliding window (default 3 invocations
//!   per 60 s), checked before gate acquisition so a throttled requester
//!   never contends for the global slot.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Global single-flight execution slot.
///
/// State machine: Idle -> Running -> Idle, transitioned with a
/// compare-and-swap so two concurrent acquirers can never both win.
#[derive(Debug, Default)]
pub struct ConcurrencyGate {
    running: AtomicBool,
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to take the execution slot without blocking.
    ///
    /// Returns `None` immediately if a run is already in flight.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GatePermit { gate: self })
    }

    /// Like [`try_acquire`](Self::try_acquire), but the permit owns a
    /// reference to the gate, so it can move across task boundaries.
    ///
    /// Used when the run body executes on another thread: the permit moves
    /// with the work and releases when the work actually stops, not when
    /// the caller stops waiting for it.
    pub fn try_acquire_owned(self: &Arc<Self>) -> Option<OwnedGatePermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| OwnedGatePermit {
                gate: Arc::clone(self),
            })
    }

    /// Whether a run currently holds the slot.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the duration of one pipeline run; releases the gate on drop.
#[must_use = "dropping the permit releases the gate"]
pub struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

/// Owning variant of [`GatePermit`]; releases the gate on drop.
#[must_use = "dropping the permit releases the gate"]
pub struct OwnedGatePermit {
    gate: Arc<ConcurrencyGate>,
}

impl Drop for OwnedGatePermit {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

/// Per-requester sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max_invocations: usize,
    window: Duration,
    hits: Mutex<HashMap<u64, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_invocations: usize, window: Duration) -> Self {
        Self {
            max_invocations,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record an invocation attempt for `requester_id`.
    ///
    /// Admits and records the attempt if the requester has budget left in
    /// the current window; otherwise returns [`Error::RateLimited`] with the
    /// time until the oldest recorded hit ages out.
    pub fn check(&self, requester_id: u64) -> Result<()> {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());

        // Age expired hits out of every entry, then drop entries that went
        // empty, so idle requesters do not accumulate in the map.
        hits.retain(|_, stamps| {
            stamps.retain(|t| now.duration_since(*t) < self.window);
            !stamps.is_empty()
        });

        let entry = hits.entry(requester_id).or_default();
        if entry.len() >= self.max_invocations {
            let oldest = entry[0];
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(Error::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        entry.push(now);
        Ok(())
    }
}
