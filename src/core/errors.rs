//! Error types surfaced to the invoking build frontend.
//!
//! Every variant is fatal. Each one renders into an actionable
//! [`Diagnostic`] with the offending input and the suggested fix.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Result alias for the build hooks.
pub type StubResult<T> = std::result::Result<T, StubError>;

/// Error raised by a build hook.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum StubError {
    #[error("configuration error: {message}")]
    #[diagnostic(
        code(wheel_stub::config),
        help("Check the [tool.wheel_stub] section of pyproject.toml")
    )]
    Configuration { message: String },

    #[error("malformed wheel `{filename}`: {reason}")]
    #[diagnostic(code(wheel_stub::wheel::malformed))]
    MalformedWheel { filename: String, reason: String },

    #[error("unsupported package artifact `{filename}`: {reason}")]
    #[diagnostic(
        code(wheel_stub::wheel::unsupported),
        help("Pass a `.whl` file as the source_wheel setting")
    )]
    UnsupportedArtifact { filename: String, reason: String },

    #[error("{report}")]
    #[diagnostic(code(wheel_stub::install::blocked))]
    InstallBlocked { report: String },

    #[error("{cause}\n\n{report}")]
    #[diagnostic(code(wheel_stub::install::failed))]
    InstallFailed { report: String, cause: String },

    #[error("package index error: {message}")]
    #[diagnostic(code(wheel_stub::index))]
    Index { message: String },

    #[error("hash mismatch for `{filename}`: expected {algorithm}={expected}, got {actual}")]
    #[diagnostic(code(wheel_stub::index::hash_mismatch))]
    HashMismatch {
        filename: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("failed to access `{}`: {source}", .path.display())]
    #[diagnostic(code(wheel_stub::io))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StubError {
    pub fn config(message: impl Into<String>) -> Self {
        StubError::Configuration {
            message: message.into(),
        }
    }

    pub fn malformed(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        StubError::MalformedWheel {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    pub fn index(message: impl Into<String>) -> Self {
        StubError::Index {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StubError::Io {
            path: path.into(),
            source,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            StubError::Configuration { message } => {
                Diagnostic::error(format!("invalid build configuration: {}", message))
                    .with_suggestion(suggestions::CONFIGURE_INDEX)
            }

            StubError::MalformedWheel { filename, reason } => {
                Diagnostic::error(format!("malformed wheel `{}`", filename))
                    .with_context(reason.clone())
                    .with_suggestion(suggestions::WHEEL_NAME_GRAMMAR)
            }

            StubError::UnsupportedArtifact { filename, reason } => {
                Diagnostic::error(format!("cannot build a stub from `{}`", filename))
                    .with_context(reason.clone())
                    .with_suggestion(suggestions::SOURCE_WHEEL)
            }

            // The report already carries its own remediation text.
            StubError::InstallBlocked { report } => Diagnostic::error(report.clone()),

            StubError::InstallFailed { report, cause } => {
                Diagnostic::error(report.clone()).with_context(format!("cause: {}", cause))
            }

            StubError::Index { message } => {
                Diagnostic::error(format!("package index error: {}", message))
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            StubError::HashMismatch {
                filename,
                algorithm,
                expected,
                actual,
            } => Diagnostic::error(format!("downloaded wheel `{}` failed verification", filename))
                .with_context(format!("expected {}: {}", algorithm, expected))
                .with_context(format!("actual {}:   {}", algorithm, actual))
                .with_suggestion(suggestions::FETCH_FAILED),

            StubError::Io { path, source } => {
                Diagnostic::error(format!("I/O error: {}", source)).with_location(path.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_wheel_diagnostic() {
        let err = StubError::malformed("this-wheel-invalid.whl", "expected 5 or 6 fields");

        let output = err.to_diagnostic().format(false);

        assert!(output.contains("malformed wheel `this-wheel-invalid.whl`"));
        assert!(output.contains("expected 5 or 6 fields"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_hash_mismatch_display() {
        let err = StubError::HashMismatch {
            filename: "foo-1.0-py3-none-any.whl".to_string(),
            algorithm: "sha256".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "hash mismatch for `foo-1.0-py3-none-any.whl`: expected sha256=aa, got bb"
        );
    }

    #[test]
    fn test_install_blocked_displays_report_verbatim() {
        let err = StubError::InstallBlocked {
            report: "pip install --extra-index-url https://example.org/simple/ foo".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "pip install --extra-index-url https://example.org/simple/ foo"
        );
    }
}
