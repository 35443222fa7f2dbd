//! CLI error type and exit codes.

use lgs_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Core domain error.
    #[error("{0}")]
    Core(String),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Settings document problems.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A child process could not be spawned or controlled.
    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Exit code following sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2,
            Self::Io(_) => 74,
            Self::Config(_) => 78,
            Self::Process(_) => 71,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidField { .. } | CoreError::CommandTemplate(_) => {
                Self::Arguments(err.to_string())
            }
            CoreError::ConfigVersion(_) | CoreError::Serialization(_) => {
                Self::Config(err.to_string())
            }
            CoreError::Io { .. } => Self::Io(err.to_string()),
            CoreError::Hook { .. } | CoreError::InvalidState(_) => Self::Process(err.to_string()),
            CoreError::AlreadyExists(_) | CoreError::NotFound(_) | CoreError::Integrity(_) => {
                Self::Core(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
