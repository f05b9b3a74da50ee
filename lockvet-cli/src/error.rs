//! CLI-specific error types and exit code mapping

use lockvet_core::error::{AdvisoryError, LockvetError};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Scan found vulnerabilities at or above the requested severity.
    #[error("found {0} vulnerabilities")]
    VulnerabilitiesFound(usize),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from the lockvet crates.
    #[error("{0}")]
    Core(#[from] LockvetError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 3    | Advisory feed unreachable             |
    /// | 4    | Scan found vulnerabilities (non-zero) |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LockvetError::Config(_)) => 2,
            Self::Core(LockvetError::Advisory(
                AdvisoryError::Network { .. } | AdvisoryError::Timeout { .. },
            )) => 3,
            Self::VulnerabilitiesFound(_) => 4,
            Self::Io(_) | Self::Core(LockvetError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}
