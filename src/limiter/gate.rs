use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::analytics::stats::LimiterStats;
use crate::error::{AppError, Result};

#[derive(Debug, Default)]
struct AdmissionState {
    admitted: u32,
    closed: bool,
}

/// Counts admissions within the current window and parks callers once the
/// window is saturated. Waiters are released all at once by [`reset`](Self::reset).
///
/// `admitted` is only read or written while holding `state`, and the lock is
/// never held across an `.await`.
#[derive(Debug)]
pub struct AdmissionGate {
    state: Mutex<AdmissionState>,
    window_reset: Notify,
    capacity: u32,
    stats: Arc<LimiterStats>,
}

impl AdmissionGate {
    pub fn new(capacity: u32, stats: Arc<LimiterStats>) -> Self {
        Self {
            state: Mutex::new(AdmissionState::default()),
            window_reset: Notify::new(),
            capacity,
            stats,
        }
    }

    /// Wait until a slot is free in the current window and take it.
    ///
    /// On `Ok` the slot has already been counted. Dropping the returned future
    /// while it is suspended leaves the count untouched.
    pub async fn acquire(&self) -> Result<()> {
        let mut waited = false;

        loop {
            // Created before the check: notify_waiters() reaches a Notified
            // as soon as it exists, so a reset between the check and the
            // await below cannot be missed.
            let notified = self.window_reset.notified();

            {
                let mut state = self.state.lock();
                if state.closed {
                    self.stats.inc_interrupted();
                    return Err(AppError::InterruptedWait);
                }
                if state.admitted < self.capacity {
                    state.admitted += 1;
                    self.stats.inc_admitted();
                    return Ok(());
                }
            }

            if !waited {
                waited = true;
                self.stats.inc_waited();
                trace!("Admission window saturated ({} slots), waiting for reset", self.capacity);
            }

            notified.await;
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`AppError::InterruptedWait`] once `cancel` completes.
    pub async fn acquire_or_cancel<F>(&self, cancel: F) -> Result<()>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            admitted = self.acquire() => admitted,
            _ = cancel => {
                self.stats.inc_interrupted();
                debug!("Admission wait cancelled");
                Err(AppError::InterruptedWait)
            }
        }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.admitted >= self.capacity {
            return false;
        }
        state.admitted += 1;
        self.stats.inc_admitted();
        true
    }

    /// Start a new window: zero the count and wake every parked caller.
    /// Returns the number of admissions the finished window held.
    pub fn reset(&self) -> u32 {
        let mut state = self.state.lock();
        let cleared = std::mem::take(&mut state.admitted);
        self.window_reset.notify_waiters();
        cleared
    }

    /// Refuse all further admissions and fail current waiters with
    /// [`AppError::InterruptedWait`]. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        self.window_reset.notify_waiters();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn admitted(&self) -> u32 {
        self.state.lock().admitted
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
