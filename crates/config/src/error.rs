use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Semantically invalid config (empty path, zero clusters, etc.).
    #[error("config validation error: {0}")]
    Validation(String),
    /// File could not be read.
    #[error("cannot read config {path}: {message}")]
    Read { path: String, message: String },
    /// `~` or `$VAR` expansion failed.
    #[error("cannot expand path '{path}': {message}")]
    PathExpansion { path: String, message: String },
}
