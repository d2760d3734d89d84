//! Error types for the pythia-rs library.
//!
//! Analysis is deliberately fault-tolerant: file-scoped failures are absorbed
//! into error-sentinel results by the analyzer framework, and cache failures
//! degrade to misses. The variants here cover the places where an error must
//! still reach the caller.

use std::io;

use thiserror::Error;

/// Main result type for pythia operations.
pub type Result<T> = std::result::Result<T, PythiaError>;

/// Error type for all pythia operations.
#[derive(Error, Debug)]
pub enum PythiaError {
    /// I/O errors (file reads, directory walks, report output)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Source file could not be read or decoded
    #[error("File error for {path}: {message}")]
    File {
        /// Path of the offending file
        path: String,
        /// Error description
        message: String,
    },

    /// Source decoded but the Python parser rejected it
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path of the offending file
        path: String,
        /// Parser diagnostic
        message: String,
        /// Line number, when the parser located the failure
        line: Option<usize>,
    },

    /// An analyzer implementation failed unexpectedly
    #[error("Analysis error in {analyzer}: {message}")]
    Analysis {
        /// Analyzer that failed
        analyzer: String,
        /// Error description
        message: String,
    },

    /// Cache read/write problems; callers treat these as misses
    #[error("Cache error: {message}")]
    Cache {
        /// Error description
        message: String,
        /// Cache entry involved, if known
        entry: Option<String>,
    },

    /// Report rendering or output failed
    #[error("Report error: {message}")]
    Report {
        /// Error description
        message: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

impl PythiaError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new file error
    pub fn file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse(path: impl Into<String>, message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line,
        }
    }

    /// Create a new analysis error
    pub fn analysis(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            entry: None,
        }
    }

    /// Create a new cache error with entry context
    pub fn cache_entry(message: impl Into<String>, entry: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            entry: Some(entry.into()),
        }
    }

    /// Create a new report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<io::Error> for PythiaError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for PythiaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PythiaError::config("bad analyzer list");
        assert!(matches!(err, PythiaError::Config { .. }));

        let err = PythiaError::parse("a.py", "unexpected indent", Some(3));
        assert!(matches!(err, PythiaError::Parse { line: Some(3), .. }));
    }

    #[test]
    fn test_error_display_includes_context() {
        let err = PythiaError::analysis("dry", "corpus poisoned");
        assert_eq!(err.to_string(), "Analysis error in dry: corpus poisoned");

        let err = PythiaError::file("b.py", "undecodable");
        assert!(err.to_string().contains("b.py"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: PythiaError = io_err.into();
        assert!(matches!(err, PythiaError::Io { .. }));
    }
}
