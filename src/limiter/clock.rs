use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::analytics::stats::LimiterStats;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Resetting,
}

/// Background task that runs a reset action once per window.
///
/// The first tick fires one full period after spawning. Ticks missed while the
/// runtime was busy are skipped, never replayed. The task ends when
/// [`stop`](Self::stop) is called and is aborted when the clock is dropped.
#[derive(Debug)]
pub struct WindowClock {
    period: Duration,
    resetting: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl WindowClock {
    pub fn spawn<F>(period: Duration, stats: Arc<LimiterStats>, on_tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(AppError::InvalidConfiguration("window clock period must be positive".into()));
        }

        let runtime = Handle::try_current()
            .map_err(|e| AppError::Init(format!("Window clock requires a tokio runtime: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let resetting = Arc::new(AtomicBool::new(false));
        let handle = runtime.spawn(run_clock(
            period,
            stats,
            resetting.clone(),
            shutdown_rx,
            on_tick,
        ));

        Ok(Self {
            period,
            resetting,
            shutdown_tx,
            handle,
        })
    }

    pub fn state(&self) -> ClockState {
        if self.resetting.load(Ordering::Acquire) {
            ClockState::Resetting
        } else {
            ClockState::Idle
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(&self) {
        // No receiver means the task is already gone.
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for WindowClock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_clock<F>(
    period: Duration,
    stats: Arc<LimiterStats>,
    resetting: Arc<AtomicBool>,
    mut shutdown: broadcast::Receiver<()>,
    mut on_tick: F,
) where
    F: FnMut() + Send + 'static,
{
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.recv() => {
                debug!("Window clock stopped");
                break;
            }
        }

        resetting.store(true, Ordering::Release);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| on_tick()));
        resetting.store(false, Ordering::Release);

        match outcome {
            Ok(()) => stats.inc_windows_reset(),
            // Only this tick is lost; the schedule carries on.
            Err(_) => error!("Window reset panicked, waiting for the next tick"),
        }
    }
}
