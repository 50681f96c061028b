//! Unified error handling for fancontrol-gui
//!
//! This crate provides the single error type shared by the core library and
//! the bootstrap binary. None of these errors is fatal to the process: the
//! core reports them through its observable error string and carries on.

use std::io;
use std::path::PathBuf;

/// Result type alias using FancontrolError
pub type Result<T> = std::result::Result<T, FancontrolError>;

/// Unified error type for all fancontrol-gui operations
#[derive(thiserror::Error, Debug)]
pub enum FancontrolError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ============================================================================
    // Discovery Errors
    // ============================================================================
    #[error("Hardware monitoring root {0} does not exist")]
    RootMissing(PathBuf),

    #[error("No hardware monitoring devices found in {0}")]
    NoDevices(PathBuf),

    #[error("Failed to scan {path}: {reason}")]
    Discovery {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to read sensor {path}: {reason}")]
    SensorRead {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Configuration File Errors
    // ============================================================================
    #[error("Line {line}: {reason}")]
    Parse {
        line: usize,
        reason: String,
    },

    #[error("Unresolved sensor reference: {reference}")]
    UnresolvedReference {
        reference: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid interval: {0} (must be a positive number of seconds)")]
    InvalidInterval(i64),

    // ============================================================================
    // Service Management Errors
    // ============================================================================
    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid service request: {0}")]
    InvalidServiceRequest(String),

    #[error("Failed to execute privileged command: {0}")]
    PrivilegeEscalation(String),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("Polling loop has stopped")]
    LoopStopped,

    #[error("{0}")]
    Generic(String),
}

impl FancontrolError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a discovery error for a path
    pub fn discovery(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Discovery {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error for a 1-based line number
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }

    /// Create a service error from a string
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }
}

impl From<String> for FancontrolError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

impl From<&str> for FancontrolError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = FancontrolError::InvalidInterval(-5);
        assert_eq!(
            err.to_string(),
            "Invalid interval: -5 (must be a positive number of seconds)"
        );

        let err = FancontrolError::parse(3, "missing '='");
        assert_eq!(err.to_string(), "Line 3: missing '='");

        let err = FancontrolError::RootMissing(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "Hardware monitoring root /nope does not exist");
    }

    #[test]
    fn test_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: FancontrolError = io_err.into();
        assert!(matches!(err, FancontrolError::Io(_)));
    }

    #[test]
    fn test_from_string_is_generic() {
        let err: FancontrolError = "pkexec not found".into();
        assert_eq!(err.to_string(), "pkexec not found");
    }
}
