//! File-based durable store implementation.

use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{DurableStore, StoreError, copy_blob};

/// File-backed implementation of [`DurableStore`].
///
/// The blob is written verbatim, without any framing.
///
/// # Atomic Writes
///
/// Uses write-to-temp-then-rename so a power loss mid-write never leaves a
/// half-written blob at `path`:
/// 1. Write and fsync `{path}.tmp`
/// 2. Rename `{path}.tmp` to `{path}`
/// 3. Fsync the parent directory (unix)
///
/// A failed write removes the temp file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a new file-based store at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the blob file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the temporary file used during writes.
    fn temp_path(path: &Path) -> PathBuf {
        // Append rather than replace the extension (settings.bin -> settings.bin.tmp)
        PathBuf::from(format!("{}.tmp", path.display()))
    }

    /// Performs the blocking write.
    ///
    /// Separated out so it can be wrapped in `spawn_blocking`.
    fn store_blocking(path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(StoreError::Write)?;

        let temp_path = Self::temp_path(path);
        if let Err(e) = Self::write_and_rename(&temp_path, path, data) {
            match std::fs::remove_file(&temp_path) {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                Err(cleanup) => {
                    tracing::warn!("Failed to remove {}: {cleanup}", temp_path.display());
                }
            }
            return Err(StoreError::Write(e));
        }

        Self::sync_dir(parent).map_err(StoreError::Write)
    }

    fn write_and_rename(temp_path: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(temp_path, path)
    }

    /// Makes the rename itself durable.
    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> io::Result<()> {
        File::open(dir)?.sync_all()
    }

    /// Directories cannot be opened for syncing here; the rename is
    /// durable once the file system flushes its metadata.
    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn load(&self, buf: &mut [u8]) -> Result<(), StoreError> {
        match std::fs::read(&self.path) {
            Ok(blob) => copy_blob(&blob, buf),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}", self.path.display());
                copy_blob(&[], buf)
            }
            Err(e) => Err(StoreError::Read(e)),
        }
    }

    async fn store(&self, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path.clone();
        let data = data.to_vec();

        // Use spawn_blocking to avoid blocking the async runtime
        tokio::task::spawn_blocking(move || Self::store_blocking(&path, &data))
            .await
            .map_err(|e| StoreError::Write(std::io::Error::other(e)))?
    }
}
