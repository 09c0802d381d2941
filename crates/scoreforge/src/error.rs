use scoreforge_config::ConfigError;
use scoreforge_core::ScoreParseError;
use scoreforge_scoring::{BuildError, ScoreError};
use thiserror::Error;

/// Any error ScoreForge can raise, for callers that want a single type.
#[derive(Debug, Error)]
pub enum ScoreForgeError {
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("score error: {0}")]
    Score(#[from] ScoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ScoreParseError),
}

impl ScoreForgeError {
    /// True for errors raised while compiling constraints or reading
    /// configuration, before any session exists.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ScoreForgeError::Build(_) | ScoreForgeError::Config(_) | ScoreForgeError::Parse(_)
        )
    }
}
