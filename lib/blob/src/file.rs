use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BlobError;
use crate::traits::{BlobMeta, BlobStore};

/// FileStore is a BlobStore implementation backed by the local filesystem.
///
/// Keys are mapped to paths under `base_dir`:
///   key "documents/abc/v1/minutes.pdf" → `{base_dir}/documents/abc/v1/minutes.pdf`
///
/// Parent directories are created automatically on `put`.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new FileStore rooted at `base_dir`.
    /// The directory is created if it doesn't exist.
    pub fn open(base_dir: &Path) -> Result<Self, BlobError> {
        fs::create_dir_all(base_dir).map_err(|e| BlobError::Io(e.to_string()))?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Resolve a key to a filesystem path. Rejects keys that escape
    /// base_dir.
    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(BlobError::Io(format!("invalid blob key: {:?}", key)));
        }
        if key.split(['/', '\\']).any(|part| part == "..") {
            return Err(BlobError::Io(format!(
                "path traversal detected in key: {:?}",
                key
            )));
        }
        Ok(self.base_dir.join(key))
    }
}

impl BlobStore for FileStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BlobError::Io(e.to_string()))?;
        }
        fs::write(&path, data).map_err(|e| BlobError::Io(e.to_string()))
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(key)?;
        if !path.is_file() {
            return Err(BlobError::NotFound(key.to_string()));
        }
        fs::read(&path).map_err(|e| BlobError::Io(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        if path.is_file() {
            fs::remove_file(&path).map_err(|e| BlobError::Io(e.to_string()))?;
        }
        Ok(())
    }

    fn stat(&self, key: &str) -> Result<BlobMeta, BlobError> {
        let path = self.resolve(key)?;
        let meta = fs::metadata(&path).map_err(|_| BlobError::NotFound(key.to_string()))?;
        Ok(BlobMeta {
            key: key.to_string(),
            size: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let fs = FileStore::open(dir.path()).unwrap();
        (dir, fs)
    }

    #[test]
    fn put_get_stat_delete() {
        let (_dir, blob) = store();
        blob.put("documents/d1/v1/minutes.pdf", b"pdf-bytes").unwrap();

        let data = blob.get("documents/d1/v1/minutes.pdf").unwrap();
        assert_eq!(data, b"pdf-bytes");

        let meta = blob.stat("documents/d1/v1/minutes.pdf").unwrap();
        assert_eq!(meta.size, 9);

        blob.delete("documents/d1/v1/minutes.pdf").unwrap();
        assert!(matches!(
            blob.get("documents/d1/v1/minutes.pdf"),
            Err(BlobError::NotFound(_))
        ));
    }

    #[test]
    fn rejects_traversal() {
        let (_dir, blob) = store();
        assert!(blob.put("../outside", b"x").is_err());
        assert!(blob.put("/absolute", b"x").is_err());
        assert!(blob.put("a/../../b", b"x").is_err());
        assert!(blob.put("", b"x").is_err());
    }
}
