use adapquest_core::EngineConfig;
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCliConfig {
    #[serde(default)]
    pub engine: RawEngineConfig,

    #[serde(default)]
    pub log: RawLogConfig,
}

/// Engine config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    /// Threads used to score candidate questions
    pub workers: Option<usize>,

    /// Largest joint state space a single query may enumerate
    pub max_joint_states: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLogConfig {
    /// tracing filter directive, e.g. "info" or "adapquest_core=debug"
    pub filter: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Log filter used when none is configured
pub const DEFAULT_LOG_FILTER: &str = "info";
