//! Database persistence
//!
//! Handles saving and loading the database document to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) to prevent corruption.
//!
//! Storage location: `~/.local/share/camptrack/` (configurable via `Config`)
//!
//! Files:
//! - `database.automerge` - The Automerge binary document
//! - `current_camp` - Selected camp pointer (see `session`)

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::document::CampDocument;
use super::error::{DatabaseError, DatabaseResult};
use crate::config::Config;

/// Persistence layer for the database document
pub struct DatabasePersistence {
    config: Config,
}

impl DatabasePersistence {
    /// Create a new persistence handler with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Check if a database exists on disk
    pub fn exists(&self) -> bool {
        self.config.database_path().exists()
    }

    /// Save a document to disk using atomic write
    pub fn save(&self, doc: &mut CampDocument) -> DatabaseResult<()> {
        let bytes = doc.save();
        let path = self.config.database_path();
        atomic_write(&path, &bytes)?;
        debug!("Saved database ({} bytes) to {:?}", bytes.len(), path);
        Ok(())
    }

    /// Load a document from disk
    ///
    /// Returns `None` if the database file doesn't exist. A file that exists
    /// but can't be parsed is copied aside before the error is returned.
    pub fn load(&self) -> DatabaseResult<Option<CampDocument>> {
        let path = self.config.database_path();

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|source| DatabaseError::ReadError {
            path: path.clone(),
            source,
        })?;

        match CampDocument::load(&bytes) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                let backup_path = backup_path_for(&path);
                warn!("Database at {:?} is unreadable, backing up to {:?}", path, backup_path);
                fs::copy(&path, &backup_path)
                    .map_err(|source| DatabaseError::from_io(source, backup_path.clone()))?;
                Err(DatabaseError::CorruptDocument {
                    path,
                    backup_path,
                    details: e.to_string(),
                })
            }
        }
    }

    /// Load an existing document or create a new one
    pub fn load_or_create(&self) -> DatabaseResult<CampDocument> {
        if let Some(doc) = self.load()? {
            return Ok(doc);
        }

        let mut doc = CampDocument::new();
        self.save(&mut doc)?;
        Ok(doc)
    }

    /// Delete all stored data
    ///
    /// Removes the database document, the selected-camp pointer and any
    /// athlete photos.
    pub fn delete_all(&self) -> DatabaseResult<()> {
        let paths = [
            self.config.database_path(),
            self.config.current_camp_path(),
        ];

        for path in paths {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| DatabaseError::from_io(e, path.clone()))?;
            }
        }

        let photos = self.config.photos_dir();
        if photos.exists() {
            fs::remove_dir_all(&photos).map_err(|e| DatabaseError::from_io(e, photos.clone()))?;
        }

        Ok(())
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> DatabaseResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DatabaseError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| DatabaseError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| DatabaseError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| DatabaseError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| DatabaseError::from_io(e, path.to_path_buf()))?;

    Ok(())
}
