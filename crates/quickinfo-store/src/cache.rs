use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::StoreError;

/// On-disk cache of attachment images, keyed by attachment filename.
///
/// Files are written once and never refreshed while the cache lives;
/// `purge` empties the directory at shutdown.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = std::path::absolute(&dir).unwrap_or(dir);
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `filename` names a plain file directly inside the cache dir.
    /// Attachment names come from the server, so separators and dot
    /// components are refused.
    pub fn is_safe_name(filename: &str) -> bool {
        !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\', '\0'])
    }

    pub fn path_for(&self, filename: &str) -> Result<PathBuf, StoreError> {
        if !Self::is_safe_name(filename) {
            return Err(StoreError::InvalidName(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }

    /// `file://` URI of the cached copy, suitable for a markdown image link.
    pub fn file_uri(&self, filename: &str) -> Result<String, StoreError> {
        let path = self.path_for(filename)?;
        Ok(match url::Url::from_file_path(&path) {
            Ok(url) => url.to_string(),
            Err(()) => format!("file://{}", path.display()),
        })
    }

    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Internal(format!("mkdir {}: {e}", self.dir.display())))
    }

    pub async fn contains(&self, filename: &str) -> Result<bool, StoreError> {
        let path = self.path_for(filename)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::Internal(format!("exists {}: {e}", path.display())))
    }

    /// Store `data` under `filename`. The file appears complete or not at all,
    /// so an interrupted write never leaves a truncated image that `contains`
    /// would later report as cached.
    pub async fn put(&self, filename: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.path_for(filename)?;
        let dir = self.dir.clone();
        let target = path.clone();
        let len = data.len();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &data))
            .await
            .map_err(|e| StoreError::Internal(format!("write task: {e}")))??;
        debug!("cached {} ({len} bytes)", path.display());
        Ok(())
    }

    /// Cached filenames, sorted. A missing directory lists as empty.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(StoreError::Internal(format!(
                    "list {}: {e}",
                    self.dir.display()
                )))
            }
        };
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Internal(format!("read_dir entry: {e}")))?
        {
            let ft = entry
                .file_type()
                .await
                .map_err(|e| StoreError::Internal(format!("file_type: {e}")))?;
            if ft.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete every cached file. Returns how many were removed.
    pub async fn purge(&self) -> Result<usize, StoreError> {
        let names = self.list().await?;
        let mut removed = 0;
        for name in &names {
            let path = self.dir.join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::Internal(format!(
                        "delete {}: {e}",
                        path.display()
                    )))
                }
            }
        }
        debug!("purged {removed} cached images from {}", self.dir.display());
        Ok(removed)
    }
}

fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| StoreError::Internal(format!("tempfile in {}: {e}", dir.display())))?;
    tmp.write_all(data)
        .and_then(|_| tmp.flush())
        .map_err(|e| StoreError::Internal(format!("write {}: {e}", path.display())))?;
    tmp.persist(path)
        .map_err(|e| StoreError::Internal(format!("persist {}: {e}", path.display())))?;
    Ok(())
}

/// Cache directory: `QUICKINFO_CACHE_DIR`, else `$XDG_CACHE_HOME/quickinfo/images`,
/// else `$HOME/.cache/quickinfo/images`.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("QUICKINFO_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let base = if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".cache")
    } else {
        PathBuf::from(".")
    };
    base.join("quickinfo").join("images")
}
