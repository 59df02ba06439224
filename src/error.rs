use std::path::PathBuf;

use thiserror::Error;

use crate::controller::Operation;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Enter a package name or path first")]
    EmptyInput,

    #[error("Package names cannot start with '-': {0}")]
    OptionLikeTarget(String),

    #[error("Invalid package file: {}", .0.display())]
    MissingLocalPackage(PathBuf),

    #[error("Another operation is still running: {0}")]
    Busy(Operation),

    #[error("Nothing is waiting for confirmation")]
    NothingToConfirm,

    #[error("pacman is currently running; refusing to delete {}", .0.display())]
    PackageManagerRunning(PathBuf),

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InstallerError>;
