use std::time::Duration;

use serde::{Deserialize, Serialize};

use challenge_solver::SolverConfig;

use crate::challenge::ChallengeDetector;

/// Thresholds and intervals for the extraction pipeline.
///
/// The byte thresholds are empirically tuned against the platform's current
/// markup and drift when it changes, so they are configuration with
/// defaults rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Token that identifies the challenge interstitial.
    pub challenge_marker: String,
    /// Bodies below this size that carry the marker are challenge shells.
    pub challenge_max_bytes: usize,
    /// Bodies below this size cannot be classified confidently.
    pub min_classifiable_bytes: usize,
    /// Rendered-body floor for considering the challenge resolved.
    pub resolved_min_bytes: usize,
    /// Browser poll cadence, in seconds.
    pub poll_interval_secs: u64,
    /// Budget for the interactive solve, in seconds.
    pub solver_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            challenge_marker: "TTGCaptcha".to_string(),
            challenge_max_bytes: 10_000,
            min_classifiable_bytes: 1_024,
            resolved_min_bytes: 50_000,
            poll_interval_secs: 1,
            solver_timeout_secs: 300,
        }
    }
}

impl PipelineConfig {
    pub fn solver_timeout(&self) -> Duration {
        Duration::from_secs(self.solver_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn detector(&self) -> ChallengeDetector {
        ChallengeDetector::new(
            self.challenge_marker.clone(),
            self.challenge_max_bytes,
            self.min_classifiable_bytes,
        )
    }

    /// The solver-side view of the same thresholds.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            marker: self.challenge_marker.clone(),
            resolved_min_bytes: self.resolved_min_bytes,
            poll_interval: self.poll_interval(),
            ..SolverConfig::default()
        }
    }
}
