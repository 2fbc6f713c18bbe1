use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

use crate::config::ConfigError;
use crate::environment::EnvironmentError;
use crate::logging::LoggingError;

/// Exit code for any failure to enter the isolated environment.
pub const EXIT_ENVIRONMENT: u8 = 3;
/// Shell convention for "found but not executable".
pub const EXIT_NOT_EXECUTABLE: u8 = 126;
/// Shell convention for "command not found".
pub const EXIT_NOT_FOUND: u8 = 127;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("environment activation failed: {0}")]
    Environment(#[from] EnvironmentError),
    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),
    #[error("program not found: {}", path.display())]
    ProgramNotFound { path: PathBuf },
    #[error("command not found: {}: {source}", program.display())]
    CommandNotFound {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("command not executable: {}: {source}", program.display())]
    NotExecutable {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to wait for child: {0}")]
    Wait(std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// Maps a spawn/exec failure onto the not-found / not-executable classes.
    pub fn from_spawn(program: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            ErrorKind::NotFound => LaunchError::CommandNotFound { program, source },
            ErrorKind::PermissionDenied => LaunchError::NotExecutable { program, source },
            _ => LaunchError::Spawn { program, source },
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Config(_) => 2,
            LaunchError::Environment(_) => EXIT_ENVIRONMENT,
            LaunchError::Logging(_) => 4,
            LaunchError::ProgramNotFound { .. } | LaunchError::CommandNotFound { .. } => {
                EXIT_NOT_FOUND
            }
            LaunchError::NotExecutable { .. } => EXIT_NOT_EXECUTABLE,
            LaunchError::Spawn { .. } | LaunchError::Wait(_) | LaunchError::Io(_) => 1,
        }
    }
}

impl From<&LaunchError> for ExitCode {
    fn from(err: &LaunchError) -> Self {
        ExitCode::from(err.exit_code())
    }
}
