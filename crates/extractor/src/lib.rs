//! Challenge-aware extraction of playable stream URLs from live-room pages.
//!
//! A room page either carries real content or an anti-bot challenge shell.
//! The pipeline here fetches the page, classifies it, and on a challenge
//! verdict hands off to an interactive browser session (the
//! `challenge-solver` crate), merges the recovered cookies back into the
//! scraping session, and retries the fetch exactly once. Every call ends in
//! one typed [`ExtractionOutcome`].

pub mod challenge;
pub mod config;
mod default;
pub mod descriptor;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod target;

pub use challenge::{ChallengeDetector, ChallengeVerdict};
pub use challenge_solver::{ChallengeSolver, CookieSet};
pub use config::PipelineConfig;
pub use default::default_client;
pub use descriptor::{DescriptorParser, StreamDescriptor};
pub use error::ExtractError;
pub use pipeline::{ExtractionOutcome, RecoveryPipeline};
pub use session::{ExtractionSession, FetchResult, RoomFetcher};
pub use target::RoomTarget;
