//! Error taxonomy shared across the crate.

use thiserror::Error;

use crate::transaction::TransactionError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The detected distribution has no backend (gentoo-like and unknown).
    #[error("unsupported Linux distribution: {0}")]
    UnsupportedDistribution(String),

    /// Raised by callers interpreting an empty search result, never by backends.
    #[error("no package matched '{0}'")]
    PackageNotFound(String),

    /// Raised when a dependency query itself failed and produced nothing.
    #[error("dependency query for '{package}' failed: {reason}")]
    Dependency { package: String, reason: String },

    /// A mutating external command exited non-zero (or could not be spawned).
    #[error("command `{command}` exited with code {code}{detail}", detail = fmt_stderr(.stderr))]
    ExternalCommand {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Config file extension is neither yaml/yml nor json.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Config file could not be read or does not match the expected shape.
    #[error("invalid config {path}: {message}")]
    Config { path: String, message: String },

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

fn fmt_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
