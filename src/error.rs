use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why moving a package directory was refused.
#[derive(Debug)]
pub enum MoveFailureReason {
    DestinationExists,
    SourceMissing,
    Filesystem(std::io::Error),
}

impl fmt::Display for MoveFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveFailureReason::DestinationExists => f.write_str("destination already exists"),
            MoveFailureReason::SourceMissing => f.write_str("source directory does not exist"),
            MoveFailureReason::Filesystem(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("'{0}' is not a recognized package")]
    SelectionNotFound(String),

    #[error("Dependency '{0}' could not be resolved")]
    DependencyUnresolved(String),

    #[error(
        "Move failed for '{package}' ({} -> {}): {reason}",
        .source_path.display(),
        .destination.display()
    )]
    MoveFailure {
        package: String,
        source_path: PathBuf,
        destination: PathBuf,
        reason: MoveFailureReason,
    },

    #[error(
        "Registry removal failed for '{package}': {reason}{}",
        restoration_note(.restored)
    )]
    RegistryRemovalFailure {
        package: String,
        reason: String,
        restored: bool,
    },

    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Relocation already in progress: {0}")]
    Busy(String),

    #[error("Nothing to relocate: the batch is empty")]
    EmptyBatch,

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn restoration_note(restored: &bool) -> &'static str {
    if *restored {
        " (directory moved back)"
    } else {
        " (directory left in asset tree)"
    }
}

pub type Result<T> = std::result::Result<T, RelocateError>;
