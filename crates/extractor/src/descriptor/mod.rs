mod strategies;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExtractError;

pub use strategies::{DirectUrlStrategy, LegacyStateStrategy, StateWrapperStrategy};

/// Parsed stream metadata locating the playable media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub stream_url: String,
    pub title: String,
    pub author: String,
    pub is_live: bool,
    /// Quality name to URL for every variant the page exposed.
    pub qualities: FxHashMap<String, String>,
}

/// One way of locating the stream descriptor inside a clean page body.
///
/// The platform rewrites its markup periodically; strategies that survive a
/// rewrite keep extraction alive while the others are updated.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap pre-check so strategies are skipped on pages that cannot
    /// contain their markup.
    fn applies(&self, body: &str) -> bool;

    fn extract(&self, body: &str) -> Option<StreamDescriptor>;
}

/// Ordered multi-strategy parser. Pure and synchronous over the body;
/// invoked once per clean verdict.
pub struct DescriptorParser {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(DirectUrlStrategy),
                Box::new(StateWrapperStrategy),
                Box::new(LegacyStateStrategy),
            ],
        }
    }
}

impl DescriptorParser {
    pub fn parse(&self, body: &str) -> Result<StreamDescriptor, ExtractError> {
        for strategy in &self.strategies {
            if !strategy.applies(body) {
                debug!(strategy = strategy.name(), "strategy pre-check failed");
                continue;
            }
            match strategy.extract(body) {
                Some(descriptor) => {
                    debug!(strategy = strategy.name(), "descriptor extracted");
                    return Ok(descriptor);
                }
                None => debug!(strategy = strategy.name(), "strategy found no stream data"),
            }
        }
        Err(ExtractError::Parse(
            "no strategy could locate a stream descriptor".to_string(),
        ))
    }
}
