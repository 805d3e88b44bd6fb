//! Error types for `revealgate`
//!
//! Configuration and I/O problems surface as errors from the CLI. Runtime
//! collaborator failures (storage, geolocation) have their own types but the
//! session never propagates them: it logs and falls back to a safe default.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `revealgate` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Flag storage error
    pub const STORAGE_ERROR: i32 = 4;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `revealgate` operations.
#[derive(Debug, Error)]
pub enum RevealGateError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Seen-flag storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RevealGateError {
    /// Returns the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Storage(_) => ExitCode::STORAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing or deserialization failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("config file {path} is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Maximum accepted size in bytes
        limit: u64,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path to the offending field (e.g. `social_proof.names`)
    pub path: String,
    /// Human-readable description of the problem
    pub message: String,
    /// Whether the issue blocks loading
    pub severity: Severity,
}

impl ValidationIssue {
    /// Creates an error-severity issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-severity issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Severity of a [`ValidationIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks loading
    Error,
    /// Logged and ignored
    Warning,
}

// ============================================================================
// Storage Errors
// ============================================================================

/// Errors from the durable seen-flag store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be read or written
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// Path of the backing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but does not hold a key-value map
    #[error("corrupt storage at {path}: {message}")]
    Corrupt {
        /// Path of the backing file
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// The store refuses all access (e.g. disabled storage)
    #[error("storage unavailable")]
    Unavailable,
}

// ============================================================================
// Geolocation Errors
// ============================================================================

/// Errors from the geolocation collaborator.
#[derive(Debug, Error)]
pub enum GeolocationError {
    /// The HTTP request failed
    #[error("geolocation request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The lookup did not answer in time
    #[error("geolocation lookup timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The response carried no usable city
    #[error("geolocation response had no city")]
    MissingCity,
}
