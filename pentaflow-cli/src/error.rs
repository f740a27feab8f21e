//! CLI-specific error types and exit code mapping

use pentaflow_core::error::PentaflowError;
use pentaflow_dispatch::ScanError;
use pentaflow_normalizer::NormalizerError;
use pentaflow_session_store::SessionStoreError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The session store could not be reached.
    #[error("session store not reachable: {0}")]
    StoreUnavailable(String),

    /// The scan session ended in the `failed` state.
    #[error("scan session failed: {0}")]
    SessionFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from pentaflow-core.
    #[error("{0}")]
    Core(#[from] PentaflowError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Session store unreachable        |
    /// | 4    | Scan session failed to run       |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(PentaflowError::Config(_)) => 2,
            Self::StoreUnavailable(_) => 3,
            Self::SessionFailed(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<ScanError> for CliError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Store(e) => e.into(),
            ScanError::Misconfigured { .. } | ScanError::UnknownProfile(_) => {
                Self::Config(e.to_string())
            }
            other => Self::Command(other.to_string()),
        }
    }
}

impl From<SessionStoreError> for CliError {
    fn from(e: SessionStoreError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<NormalizerError> for CliError {
    fn from(e: NormalizerError) -> Self {
        Self::Config(e.to_string())
    }
}
