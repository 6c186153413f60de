use std::path::Path;

use serde::{Deserialize, Serialize};

use room_extractor::PipelineConfig;

use crate::cli::Args;
use crate::error::Result;

/// Optional JSON file overriding the built-in pipeline thresholds.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            }
        }
    }

    /// Command-line flags win over file values.
    pub fn into_pipeline(self, args: &Args) -> PipelineConfig {
        let mut pipeline = self.pipeline;
        if let Some(timeout) = args.timeout {
            pipeline.solver_timeout_secs = timeout;
        }
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_path_yields_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.pipeline.solver_timeout_secs, 300);
    }

    #[test]
    fn timeout_flag_overrides_file_value() {
        let args = Args::parse_from(["roomlink", "123", "--timeout", "45"]);
        let config = AppConfig::default();
        let pipeline = config.into_pipeline(&args);
        assert_eq!(pipeline.solver_timeout_secs, 45);
    }

    #[test]
    fn file_values_survive_without_flag() {
        let args = Args::parse_from(["roomlink", "123"]);
        let mut config = AppConfig::default();
        config.pipeline.solver_timeout_secs = 120;
        let pipeline = config.into_pipeline(&args);
        assert_eq!(pipeline.solver_timeout_secs, 120);
    }
}
