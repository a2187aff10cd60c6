//! User-friendly diagnostic messages.
//!
//! Every fatal error is rendered with its root cause, the offending input
//! and a suggested fix before it reaches the build frontend.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when `[tool.wheel_stub]` is missing or invalid.
    pub const CONFIGURE_INDEX: &str =
        "Add `index_url = \"https://<index>/simple/\"` under [tool.wheel_stub] in pyproject.toml";

    /// Suggestion when a wheel filename or its metadata cannot be read.
    pub const WHEEL_NAME_GRAMMAR: &str =
        "Wheel filenames must follow `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`";

    /// Suggestion when the source artifact is not a wheel.
    pub const SOURCE_WHEEL: &str =
        "Pass the wheel with `--config-setting source_wheel=<path/to/file.whl>`";

    /// Suggestion for fetch failures.
    pub const FETCH_FAILED: &str =
        "Check your network connection and that the configured index serves this package";
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("cannot build a stub from `foo-1.0.tar.gz`")
            .with_context("source distributions cannot be used as the source of a stub")
            .with_location("pyproject.toml")
            .with_suggestion(suggestions::SOURCE_WHEEL);

        let output = diag.format(false);
        assert!(output.starts_with("error: cannot build a stub"));
        assert!(output.contains("  --> pyproject.toml\n"));
        assert!(output.contains("  = source distributions cannot"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Pass the wheel with"));
    }

    #[test]
    fn test_error_without_suggestions() {
        let output = Diagnostic::error("unknown key").format(false);
        assert_eq!(output, "error: unknown key\n");
    }
}
