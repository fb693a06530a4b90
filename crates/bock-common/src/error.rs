//! Common error types for the Bock ecosystem.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`BockError`].
pub type BockResult<T> = Result<T, BockError>;

/// Common errors across the Bock ecosystem.
///
/// Snapshot providers report resolution and release failures with this type,
/// so it stays coarse. Crates with a richer failure taxonomy wrap
/// it in their own error enums.
#[derive(Error, Diagnostic, Debug)]
pub enum BockError {
    /// Snapshot not found.
    #[error("Snapshot not found: {key}")]
    #[diagnostic(code(bock::snapshot::not_found))]
    SnapshotNotFound {
        /// The snapshot key that was not found.
        key: String,
    },

    /// Snapshot is still referenced and cannot be released.
    #[error("Snapshot {key} is still in use")]
    #[diagnostic(
        code(bock::snapshot::in_use),
        help("Unmount every active view of the snapshot before releasing it")
    )]
    SnapshotInUse {
        /// The snapshot key.
        key: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(bock::io))]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(bock::config))]
    Config {
        /// The error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BockError::SnapshotNotFound {
            key: "sha256:abc123".to_string(),
        };
        assert_eq!(err.to_string(), "Snapshot not found: sha256:abc123");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BockError = io_err.into();
        assert!(matches!(err, BockError::Io(_)));
    }

    #[test]
    fn config_has_code() {
        use miette::Diagnostic;

        let err = BockError::Config {
            message: "bad retries".to_string(),
        };
        assert_eq!(err.code().unwrap().to_string(), "bock::config");
    }

    #[test]
    fn in_use_message() {
        let err = BockError::SnapshotInUse {
            key: "build-7".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"Snapshot build-7 is still in use");
    }
}
