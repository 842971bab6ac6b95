pub mod clock;
pub mod gate;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, trace};

use crate::analytics::stats::LimiterStats;
use crate::config::TimeUnit;
use crate::error::{AppError, Result};
use crate::limiter::clock::{ClockState, WindowClock};
use crate::limiter::gate::AdmissionGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    window: Duration,
    max_requests: u32,
}

impl RateLimiterConfig {
    pub fn new(window: Duration, max_requests: u32) -> Result<Self> {
        if max_requests == 0 {
            return Err(AppError::InvalidConfiguration(
                "max requests per window must be positive".into(),
            ));
        }
        if window.is_zero() {
            return Err(AppError::InvalidConfiguration(
                "window duration must be positive".into(),
            ));
        }

        Ok(Self {
            window,
            max_requests,
        })
    }

    /// `max_requests` per single `unit` of time.
    pub fn per(unit: TimeUnit, max_requests: u32) -> Result<Self> {
        Self::new(unit.duration(), max_requests)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Fixed-window limiter: at most `max_requests` admissions between two resets
/// of its window clock.
///
/// Must be created inside a tokio runtime. The clock lives exactly as long as
/// the limiter; dropping or shutting down the limiter stops it and fails any
/// parked caller with [`AppError::InterruptedWait`].
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    gate: Arc<AdmissionGate>,
    clock: WindowClock,
    stats: Arc<LimiterStats>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        Self::with_stats(config, Arc::new(LimiterStats::new()))
    }

    pub fn with_stats(config: RateLimiterConfig, stats: Arc<LimiterStats>) -> Result<Self> {
        let gate = Arc::new(AdmissionGate::new(config.max_requests(), stats.clone()));

        let tick_gate = gate.clone();
        let clock = WindowClock::spawn(config.window(), stats.clone(), move || {
            let cleared = tick_gate.reset();
            trace!("Admission window reset ({} slots were used)", cleared);
        })?;

        info!(
            "Rate limiter started: {} requests per {:?}",
            config.max_requests(),
            config.window()
        );

        Ok(Self {
            config,
            gate,
            clock,
            stats,
        })
    }

    /// Suspend until the current window has a free slot, then take it.
    pub async fn acquire(&self) -> Result<()> {
        self.gate.acquire().await
    }

    /// [`acquire`](Self::acquire) that is abandoned once `cancel` completes.
    pub async fn acquire_or_cancel<F>(&self, cancel: F) -> Result<()>
    where
        F: Future,
    {
        self.gate.acquire_or_cancel(cancel).await
    }

    pub fn try_acquire(&self) -> bool {
        self.gate.try_acquire()
    }

    /// Admissions counted in the current window.
    pub fn admitted(&self) -> u32 {
        self.gate.admitted()
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<LimiterStats> {
        &self.stats
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_shut_down(&self) -> bool {
        self.gate.is_closed()
    }

    pub fn shutdown(&self) {
        self.clock.stop();
        if self.gate.close() {
            info!("Rate limiter shut down");
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use tokio::sync::oneshot;
    use tokio::time::{sleep, Instant};

    const WINDOW: Duration = Duration::from_millis(1000);

    fn limiter(max_requests: u32) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(RateLimiterConfig::new(WINDOW, max_requests).unwrap()).unwrap())
    }

    async fn wait_for_waiters(limiter: &RateLimiter, n: u64) {
        while limiter.stats().waited.load(Ordering::Relaxed) < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_config_rejects_zero_values() {
        assert!(matches!(
            RateLimiterConfig::new(WINDOW, 0),
            Err(AppError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RateLimiterConfig::new(Duration::ZERO, 5),
            Err(AppError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_config_per_time_unit() {
        let config = RateLimiterConfig::per(TimeUnit::Seconds, 5).unwrap();
        assert_eq!(config.window(), Duration::from_secs(1));
        assert_eq!(config.max_requests(), 5);

        let config = RateLimiterConfig::per(TimeUnit::Minutes, 100).unwrap();
        assert_eq!(config.window(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_caller_waits_for_next_window() {
        let limiter = limiter(5);
        let start = Instant::now();

        let first: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in first {
            handle.await.unwrap().unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(5));
        assert_eq!(limiter.admitted(), 5);

        let sixth = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| Instant::now()) })
        };

        sleep(Duration::from_millis(990)).await;
        assert!(!sixth.is_finished());

        let admitted_at = sixth.await.unwrap().unwrap();
        let waited = admitted_at - start;
        assert!(waited >= WINDOW, "admitted after {:?}", waited);
        assert!(waited < WINDOW + Duration::from_millis(50), "admitted after {:?}", waited);
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clears_count() {
        let limiter = limiter(3);
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        assert!(!limiter.try_acquire());

        sleep(WINDOW + Duration::from_millis(1)).await;
        assert_eq!(limiter.admitted(), 0);
        assert_eq!(limiter.stats().windows_reset.load(Ordering::Relaxed), 1);
        assert_eq!(limiter.clock_state(), ClockState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_slot_serializes_windows() {
        let limiter = limiter(1);
        let start = Instant::now();
        let mut admissions = Vec::new();

        for _ in 0..4 {
            limiter.acquire().await.unwrap();
            admissions.push(Instant::now() - start);
            assert!(!limiter.try_acquire());
        }

        // One admission per window over three consecutive windows.
        for (window, at) in admissions.iter().enumerate() {
            let expected = WINDOW * window as u32;
            assert!(*at >= expected, "admission {} at {:?}", window, at);
            assert!(*at < expected + Duration::from_millis(50), "admission {} at {:?}", window, at);
        }
        assert_eq!(limiter.stats().waited.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_waiter_eventually_admitted() {
        let limiter = limiter(2);
        let start = Instant::now();

        let callers: Vec<_> = (0..6)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await.map(|_| Instant::now()) })
            })
            .collect();

        let mut per_window = [0u32; 3];
        for caller in callers {
            let at = caller.await.unwrap().unwrap() - start;
            let window = (at.as_millis() / WINDOW.as_millis()) as usize;
            per_window[window] += 1;
        }
        assert_eq!(per_window, [2, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_does_not_block_others() {
        let limiter = limiter(1);
        limiter.acquire().await.unwrap();

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let cancelled = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire_or_cancel(cancel_rx).await })
        };
        let patient = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        };
        wait_for_waiters(&limiter, 2).await;

        cancel_tx.send(()).unwrap();
        assert!(matches!(cancelled.await.unwrap(), Err(AppError::InterruptedWait)));
        assert_eq!(limiter.admitted(), 1);

        patient.await.unwrap().unwrap();
        assert_eq!(limiter.admitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiters_are_independent() {
        let config = RateLimiterConfig::new(WINDOW, 2).unwrap();
        let a = RateLimiter::new(config).unwrap();
        let b = RateLimiter::new(config).unwrap();

        a.acquire().await.unwrap();
        a.acquire().await.unwrap();
        assert!(!a.try_acquire());

        assert_eq!(b.admitted(), 0);
        assert!(b.try_acquire());
        assert!(b.try_acquire());

        a.shutdown();
        assert!(a.is_shut_down());
        assert!(!b.is_shut_down());
        assert!(!b.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_waiters_and_stops_clock() {
        let limiter = limiter(1);
        limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        };
        wait_for_waiters(&limiter, 1).await;

        limiter.shutdown();
        assert!(matches!(waiter.await.unwrap(), Err(AppError::InterruptedWait)));
        assert!(matches!(limiter.acquire().await, Err(AppError::InterruptedWait)));

        sleep(WINDOW * 3).await;
        assert!(limiter.clock.is_finished());
        assert_eq!(limiter.stats().windows_reset.load(Ordering::Relaxed), 0);
    }
}
