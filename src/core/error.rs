//! Error types for the backup/restore core.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Rejected resource identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} must not be empty")]
    EmptyName { kind: &'static str },

    #[error("Invalid {kind} format: '{value}'")]
    InvalidFormat { kind: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum BackupToolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Directory error for {}: {message}", path.display())]
    Directory { path: PathBuf, message: String },

    #[error("Docker command '{command}' failed: {message}")]
    DockerCommand { command: String, message: String },

    #[error("Docker command '{command}' timed out after {}", humantime::format_duration(.timeout.clone()))]
    Timeout { command: String, timeout: Duration },

    #[error("Invalid archive format: {} (expected .tar or .tar.gz)", .0.display())]
    InvalidArchiveFormat(PathBuf),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Restore failed: {0}")]
    Restore(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BackupToolError>;
