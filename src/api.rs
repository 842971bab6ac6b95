use std::future::Future;
use std::time::Instant;

use tracing::{debug, warn};

use crate::analytics::stats::LimiterStats;
use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use crate::http::submitter::{DocumentSubmitter, HttpDocumentSubmitter};
use crate::limiter::RateLimiter;

/// Rate-limited client for the document registry.
///
/// Every `submit` takes one slot from the limiter before the document is
/// sent. The slot stays used even when the send fails: the limiter bounds
/// attempts, not successful deliveries.
#[derive(Debug)]
pub struct CrptApi<S = HttpDocumentSubmitter> {
    limiter: RateLimiter,
    submitter: S,
}

impl CrptApi<HttpDocumentSubmitter> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let submitter = HttpDocumentSubmitter::new(config.endpoint()?, &config.http_settings()?)?;
        let limiter = RateLimiter::new(config.rate_limiter_config()?)?;

        Ok(Self::new(limiter, submitter))
    }
}

impl<S: DocumentSubmitter> CrptApi<S> {
    pub fn new(limiter: RateLimiter, submitter: S) -> Self {
        Self { limiter, submitter }
    }

    /// Wait for admission, then send `document` exactly once.
    pub async fn submit(&self, document: &Document, signature: &str) -> Result<()> {
        self.limiter.acquire().await?;
        self.send(document, signature).await
    }

    /// [`submit`](Self::submit) whose admission wait is abandoned once
    /// `cancel` completes. Nothing is sent in that case.
    pub async fn submit_or_cancel<F>(&self, document: &Document, signature: &str, cancel: F) -> Result<()>
    where
        F: Future,
    {
        self.limiter.acquire_or_cancel(cancel).await?;
        self.send(document, signature).await
    }

    async fn send(&self, document: &Document, signature: &str) -> Result<()> {
        let stats = self.limiter.stats();
        let start = Instant::now();

        let outcome = self.submitter.send(document, signature).await;
        stats.update_submit_latency(start.elapsed().as_millis() as u64);

        match outcome {
            Ok(()) => {
                stats.inc_submissions_ok();
                debug!("Document {} submitted", document.doc_id);
                Ok(())
            }
            Err(e) => {
                stats.inc_submissions_failed();
                warn!("Document {} submission failed: {}", document.doc_id, e);
                Err(e.into())
            }
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn stats(&self) -> &LimiterStats {
        self.limiter.stats()
    }

    pub fn shutdown(&self) {
        self.limiter.shutdown();
    }
}
