use thiserror::Error;

use super::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Numerical failure in {operation}: {reason}")]
    Numerical {
        operation: &'static str,
        reason: String,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
