//! Database error handling
//!
//! Provides typed errors for document database operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Database file is corrupted
    #[error("Database at '{path}' is corrupted: {details}. A backup has been created at '{backup_path}'.")]
    CorruptDocument {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    /// Automerge error
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Document body could not be converted
    #[error("Invalid document body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Structural field missing from the database document
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Document body is not a JSON object
    #[error("Document '{collection}/{id}' must be an object")]
    NotAnObject { collection: String, id: String },

    /// Update targeted a document that does not exist
    #[error("Document not found: '{collection}/{id}'")]
    DocumentNotFound { collection: String, id: String },

    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Another thread panicked while holding the database
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DatabaseError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => DatabaseError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => DatabaseError::NotFound { path },
            _ if is_disk_full_error(&error) => DatabaseError::DiskFull {
                path,
                source: error,
            },
            _ => DatabaseError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            DatabaseError::DiskFull { .. } => Some("Free up disk space and try again."),
            DatabaseError::PermissionDenied { .. } => {
                Some("Check file and directory permissions for the camptrack data directory.")
            }
            DatabaseError::CorruptDocument { .. } => {
                Some("A backup of the corrupted file has been kept. Run `camptrack reset` to start fresh.")
            }
            DatabaseError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
