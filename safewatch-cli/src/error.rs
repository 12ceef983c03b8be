//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use safewatch::config::ConfigFileError;
use safewatch::location::{AcquisitionError, MonitorError, PersistenceError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to read the track file
    TrackRead { path: PathBuf, error: std::io::Error },
    /// A track line could not be turned into a reading
    TrackLine { line: usize, message: String },
    /// The monitor failed to start
    Monitor(MonitorError),
    /// Failed to create the persistence sink
    Persistence(PersistenceError),
    /// Replay could not make progress
    Replay(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Monitor(MonitorError::LocationUnavailable(
            AcquisitionError::Timeout { .. },
        )) = self
        {
            eprintln!();
            eprintln!("The track produced no reading in time. Check that the file");
            eprintln!("is not empty and that [acquisition] timeout_secs is positive.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::TrackRead { path, error } => {
                write!(f, "Failed to read track '{}': {}", path.display(), error)
            }
            CliError::TrackLine { line, message } => {
                write!(f, "Invalid track line {}: {}", line, message)
            }
            CliError::Monitor(e) => write!(f, "Location monitor failed: {}", e),
            CliError::Persistence(e) => write!(f, "Failed to create persistence sink: {}", e),
            CliError::Replay(msg) => write!(f, "Replay failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::TrackRead { error, .. } => Some(error),
            CliError::Monitor(e) => Some(e),
            CliError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<MonitorError> for CliError {
    fn from(e: MonitorError) -> Self {
        CliError::Monitor(e)
    }
}
