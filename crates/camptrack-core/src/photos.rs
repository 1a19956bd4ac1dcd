//! Athlete photos
//!
//! Photos stay on this device, one file per athlete, next to the database:
//!
//! ```text
//! ~/.local/share/camptrack/
//! ├── database.automerge
//! ├── current_camp
//! └── photos/
//!     └── <athlete-id>.<jpg|png|gif|webp>
//! ```
//!
//! An upload is raced against a fixed timeout and rejected if it takes
//! longer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

/// How long an upload may take before it is rejected
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest accepted photo
pub const MAX_PHOTO_BYTES: u64 = 5 * 1024 * 1024;

const EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp"];

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("Photo upload timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Unsupported photo type {0:?}. Use jpg, png, gif or webp.")]
    UnsupportedType(String),

    #[error("Photo is larger than {} MB", MAX_PHOTO_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Photo file is empty")]
    Empty,

    #[error("Photo I/O failed at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Photo files for athletes, keyed by athlete id
#[derive(Clone, Debug)]
pub struct PhotoStore {
    dir: PathBuf,
    timeout: Duration,
}

impl PhotoStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            timeout: UPLOAD_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the athlete's photo, if one has been uploaded
    pub fn find(&self, athlete_id: Uuid) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.path_for(athlete_id, ext))
            .find(|path| path.exists())
    }

    /// Copy an image file in as the athlete's photo
    pub async fn upload(&self, athlete_id: Uuid, source: &Path) -> Result<PathBuf, PhotoError> {
        let ext = image_extension(source)?;
        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| io_error(source, e))?;
        self.upload_from(athlete_id, ext, file).await
    }

    /// Store the bytes read from `reader` as the athlete's photo
    ///
    /// Fails with `TimedOut` when reading and writing take longer than the
    /// store's timeout; the previous photo is then left in place.
    pub async fn upload_from<R>(
        &self,
        athlete_id: Uuid,
        ext: &str,
        reader: R,
    ) -> Result<PathBuf, PhotoError>
    where
        R: AsyncRead + Unpin,
    {
        timeout(self.timeout, self.write(athlete_id, ext, reader))
            .await
            .map_err(|_| PhotoError::TimedOut(self.timeout))?
    }

    /// Delete the athlete's photo; returns true if there was one
    pub fn remove(&self, athlete_id: Uuid) -> Result<bool, PhotoError> {
        self.remove_except(athlete_id, None)
    }

    async fn write<R>(&self, athlete_id: Uuid, ext: &str, reader: R) -> Result<PathBuf, PhotoError>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader
            .take(MAX_PHOTO_BYTES + 1)
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| io_error(&self.dir, e))?;
        if bytes.len() as u64 > MAX_PHOTO_BYTES {
            return Err(PhotoError::TooLarge);
        }
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;
        let path = self.path_for(athlete_id, ext);
        let temp_path = path.with_extension(format!("{}.tmp", ext));
        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        self.remove_except(athlete_id, Some(ext))?;
        info!("Saved photo for athlete {} ({} bytes)", athlete_id, bytes.len());
        Ok(path)
    }

    fn remove_except(&self, athlete_id: Uuid, keep: Option<&str>) -> Result<bool, PhotoError> {
        let mut removed = false;
        for ext in EXTENSIONS.iter().filter(|ext| Some(**ext) != keep) {
            let path = self.path_for(athlete_id, ext);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
                debug!("Removed photo {:?}", path);
                removed = true;
            }
        }
        Ok(removed)
    }

    fn path_for(&self, athlete_id: Uuid, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", athlete_id, ext))
    }
}

/// Normalized extension of an image file name
fn image_extension(path: &Path) -> Result<&'static str, PhotoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("jpg"),
        "png" => Ok("png"),
        "gif" => Ok("gif"),
        "webp" => Ok("webp"),
        _ => Err(PhotoError::UnsupportedType(ext)),
    }
}

fn io_error(path: &Path, source: io::Error) -> PhotoError {
    PhotoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> PhotoStore {
        PhotoStore::new(temp_dir.path().join("photos"))
    }

    #[tokio::test]
    async fn test_upload_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let photos = store(&temp_dir);
        let athlete = Uuid::new_v4();
        let source = temp_dir.path().join("Jordan.JPEG");
        fs::write(&source, b"fake jpeg").unwrap();

        assert!(photos.find(athlete).is_none());
        let saved = photos.upload(athlete, &source).await.unwrap();

        assert_eq!(photos.find(athlete), Some(saved.clone()));
        assert!(saved.ends_with(format!("{}.jpg", athlete)));
        assert_eq!(fs::read(&saved).unwrap(), b"fake jpeg");
    }

    #[tokio::test]
    async fn test_new_photo_replaces_old_type() {
        let temp_dir = TempDir::new().unwrap();
        let photos = store(&temp_dir);
        let athlete = Uuid::new_v4();

        photos.upload_from(athlete, "jpg", &b"first"[..]).await.unwrap();
        let png = photos.upload_from(athlete, "png", &b"second"[..]).await.unwrap();

        assert_eq!(photos.find(athlete), Some(png));
        assert!(!photos.path_for(athlete, "jpg").exists());
    }

    #[tokio::test]
    async fn test_stalled_upload_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let photos = store(&temp_dir).with_timeout(Duration::from_millis(50));
        let athlete = Uuid::new_v4();
        photos.upload_from(athlete, "png", &b"kept"[..]).await.unwrap();

        // The writer half stays open and never sends, so the read never ends
        let (_writer, reader) = tokio::io::duplex(64);
        let err = photos.upload_from(athlete, "jpg", reader).await.unwrap_err();

        assert!(matches!(err, PhotoError::TimedOut(_)));
        assert_eq!(fs::read(photos.find(athlete).unwrap()).unwrap(), b"kept");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let temp_dir = TempDir::new().unwrap();
        let photos = store(&temp_dir);
        let athlete = Uuid::new_v4();

        let text = temp_dir.path().join("notes.txt");
        fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            photos.upload(athlete, &text).await,
            Err(PhotoError::UnsupportedType(_))
        ));

        assert!(matches!(
            photos.upload_from(athlete, "png", &b""[..]).await,
            Err(PhotoError::Empty)
        ));

        let big = vec![0u8; MAX_PHOTO_BYTES as usize + 1];
        assert!(matches!(
            photos.upload_from(athlete, "png", &big[..]).await,
            Err(PhotoError::TooLarge)
        ));
        assert!(photos.find(athlete).is_none());
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let photos = store(&temp_dir);
        let athlete = Uuid::new_v4();
        fs::create_dir_all(temp_dir.path().join("photos")).unwrap();
        fs::write(photos.path_for(athlete, "gif"), b"gif").unwrap();

        assert!(photos.remove(athlete).unwrap());
        assert!(!photos.remove(athlete).unwrap());
        assert!(photos.find(athlete).is_none());
    }
}
