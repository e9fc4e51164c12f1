//! Unified adapter error with a stable exit-code contract.
//!
//! The binary communicates its outcome through exit codes so that batch
//! harnesses never have to parse the XML payload:
//!
//! - `0`  success
//! - `10` invalid arguments
//! - `11` configuration errors
//! - `12` I/O failure
//! - `20` internal model fault (invariant or protocol violation)

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for adapter-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the evaluation binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    Args(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model fault: {0}")]
    Model(String),
}

impl Error {
    /// Stable exit-code mapping; changes require a major version bump.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Args(_) => 10,
            Error::Config(_) => 11,
            Error::Io { .. } => 12,
            Error::Model(_) => 20,
        }
    }

    /// Attach a file path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(Error::Args("x".into()).exit_code(), 10);
        assert_eq!(Error::Config("x".into()).exit_code(), 11);
        let io = Error::io("trace.dat", std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), 12);
        assert_eq!(Error::Model("x".into()).exit_code(), 20);
    }

    #[test]
    fn io_error_mentions_path() {
        let err = Error::io("traces/week1.dat", std::io::Error::other("denied"));
        let text = err.to_string();
        assert!(text.contains("week1.dat"), "got: {text}");
        assert!(text.contains("denied"), "got: {text}");
    }
}
