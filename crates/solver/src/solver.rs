use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::CookieSet;
use crate::browser::{BrowserCandidate, BrowserSession, default_candidates};
use crate::error::SolverError;

/// Knobs for the interactive wait. The size floor and marker are tuned to
/// the platform's current challenge markup and are expected to drift, so
/// they stay configurable rather than baked in.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Token that identifies the challenge interstitial.
    pub marker: String,
    /// Rendered bodies above this size are past the challenge shell.
    pub resolved_min_bytes: usize,
    /// Cadence of rendered-page polls.
    pub poll_interval: Duration,
    /// Grace period after resolution before cookies are read, so late
    /// redirects can finish setting them.
    pub settle_delay: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            marker: "TTGCaptcha".to_string(),
            resolved_min_bytes: 50_000,
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// The seam the extraction pipeline drives when a challenge is detected.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Obtain a cookie-bearing state for `room_url` by letting a human clear
    /// the challenge in a visible browser window.
    async fn solve(&self, room_url: &str, timeout: Duration) -> Result<CookieSet, SolverError>;
}

/// Opens a visible browser on the challenged URL, polls the rendered page
/// until the challenge is gone, then extracts the session cookies.
pub struct InteractiveSolver {
    config: SolverConfig,
    candidates: Vec<BrowserCandidate>,
    cancel: CancellationToken,
}

impl InteractiveSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            candidates: default_candidates(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the default browser candidate order.
    pub fn with_candidates(mut self, candidates: Vec<BrowserCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Tie the wait loop to an external cancellation source. Cancelling
    /// tears the browser down before `solve` returns.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Both conditions are required: a partially loaded page can cross the
    /// size floor while the challenge script is still present.
    fn resolved(&self, body: &str) -> bool {
        body.len() > self.config.resolved_min_bytes && !body.contains(&self.config.marker)
    }

    async fn drive(
        &self,
        session: &BrowserSession,
        room_url: &str,
        timeout: Duration,
    ) -> Result<CookieSet, SolverError> {
        session.navigate(room_url).await?;
        info!(url = room_url, "waiting for the challenge to be resolved in the browser window");

        let deadline = Instant::now() + timeout;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(SolverError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => return Err(SolverError::Timeout(timeout)),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            let body = match session.rendered_body().await {
                Ok(body) => body,
                Err(e) => {
                    // Transient while the page swaps documents mid-challenge.
                    debug!(error = %e, "rendered body unavailable, retrying");
                    continue;
                }
            };

            debug!(bytes = body.len(), "polled rendered page");
            if self.resolved(&body) {
                info!(bytes = body.len(), "challenge resolved");
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(SolverError::Cancelled),
                    _ = tokio::time::sleep(self.config.settle_delay) => {}
                }
                let cookies = session.cookies().await?;
                info!(count = cookies.len(), "cookies recovered from browser session");
                return Ok(cookies);
            }
        }
    }
}

#[async_trait]
impl ChallengeSolver for InteractiveSolver {
    async fn solve(&self, room_url: &str, timeout: Duration) -> Result<CookieSet, SolverError> {
        let session = BrowserSession::launch_any(&self.candidates).await?;
        let outcome = self.drive(&session, room_url, timeout).await;
        // The window must not outlive the call, whatever `drive` returned.
        if let Err(e) = session.close().await {
            warn!(error = %e, "browser session did not close cleanly");
        }
        outcome
    }
}
