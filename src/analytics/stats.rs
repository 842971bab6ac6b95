use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Counters shared by the admission gate, the window clock and the submit path.
#[derive(Debug, Default)]
pub struct LimiterStats {
    pub admitted: AtomicU64,
    /// Acquires that found the window saturated and had to suspend.
    pub waited: AtomicU64,
    pub interrupted: AtomicU64,
    pub windows_reset: AtomicU64,
    pub submissions_ok: AtomicU64,
    pub submissions_failed: AtomicU64,

    // Gauge: only the most recent send is kept.
    pub last_submit_latency_ms: AtomicU64,
}

impl LimiterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_waited(&self) {
        self.waited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_windows_reset(&self) {
        self.windows_reset.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_submissions_ok(&self) {
        self.submissions_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_submissions_failed(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_submit_latency(&self, ms: u64) {
        self.last_submit_latency_ms.store(ms, Ordering::Relaxed);
    }

    pub fn log_stats(&self) {
        let admitted = self.admitted.load(Ordering::Relaxed);
        let waited = self.waited.load(Ordering::Relaxed);
        let interrupted = self.interrupted.load(Ordering::Relaxed);
        let windows = self.windows_reset.load(Ordering::Relaxed);
        let ok = self.submissions_ok.load(Ordering::Relaxed);
        let failed = self.submissions_failed.load(Ordering::Relaxed);
        let latency = self.last_submit_latency_ms.load(Ordering::Relaxed);

        info!(
            "STATS: Admitted: {} ({} waited, {} interrupted) | Windows: {} | Submissions: {} Success, {} Failed | Last latency: {}ms",
            admitted, waited, interrupted, windows, ok, failed, latency
        );
    }
}
