use crate::cache::error::CacheError;
use log::info;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

/// Handle on the cache directory. All cache file access goes through it.
///
/// Writes replace the target atomically (temp file in the same directory, then
/// rename), so readers see either the previous file or the new one in full.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `file` inside `folder` under the root.
    pub fn path(&self, folder: &str, file: &str) -> PathBuf {
        self.root.join(folder).join(file)
    }

    /// Creates `folder` under the root if it is missing.
    pub async fn ensure_dir(&self, folder: &str) -> Result<PathBuf, CacheError> {
        let path = self.root.join(folder);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => Ok(path),
            Ok(_) => Err(CacheError::NotADirectory(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Creating cache directory: {}", path.display());
                fs::create_dir_all(&path)
                    .await
                    .map_err(|e| CacheError::CacheDirCreation(path.clone(), e))?;
                Ok(path)
            }
            Err(e) => Err(CacheError::CacheDirCreation(path, e)),
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, CacheError> {
        fs::read(path)
            .await
            .map_err(|e| CacheError::CacheRead(path.to_path_buf(), e))
    }

    /// Replaces `path` with `bytes`.
    pub async fn write(&self, path: &Path, bytes: Vec<u8>) -> Result<(), CacheError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let dir = path_buf.parent().unwrap_or_else(|| Path::new("."));
            let mut temp_file = NamedTempFile::new_in(dir)
                .map_err(|e| CacheError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .write_all(&bytes)
                .and_then(|_| temp_file.flush())
                .map_err(|e| CacheError::CacheWrite(path_buf.clone(), e))?;
            temp_file
                .persist(&path_buf)
                .map_err(|e| CacheError::CacheWrite(path_buf.clone(), e.error))?;
            Ok::<(), CacheError>(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_replaces_whole_file() -> Result<(), CacheError> {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path());
        storage.ensure_dir("temperature").await?;
        let path = storage.path("temperature", "station_1.json");

        assert!(!storage.exists(&path).await);
        storage.write(&path, b"[1, 2, 3, 4, 5]".to_vec()).await?;
        storage.write(&path, b"[]".to_vec()).await?;

        assert!(storage.exists(&path).await);
        assert_eq!(storage.read(&path).await?, b"[]".to_vec());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_dir_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("humidity"), b"").unwrap();
        let storage = CacheStorage::new(dir.path());

        let err = storage.ensure_dir("humidity").await.unwrap_err();
        assert!(matches!(err, CacheError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn reading_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path());
        let err = storage
            .read(&storage.path("humidity", "station_9.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::CacheRead(..)));
    }
}
