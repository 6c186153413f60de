//! Interactive challenge solving for pages guarded by an anti-bot
//! interstitial.
//!
//! When a scrape runs into the challenge page, this crate opens a visible
//! browser on the same URL, waits for a human to clear the challenge, and
//! hands the resulting cookies back so the scraping session can retry with a
//! cleared state. Solving is never automated; the crate only owns the
//! browser lifecycle and the wait.

pub mod browser;
pub mod error;
mod solver;

pub use browser::{BrowserCandidate, BrowserSession, default_candidates};
pub use error::SolverError;
pub use solver::{ChallengeSolver, InteractiveSolver, SolverConfig};

use rustc_hash::FxHashMap;

/// Cookie name to value mapping recovered from a resolved browser session.
pub type CookieSet = FxHashMap<String, String>;
