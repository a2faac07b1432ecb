//! Object store: the pipeline only needs "fetch object by bucket+key to a
//! local path".

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ObjectStoreError;

pub trait ObjectStore: Send + Sync {
    /// Copy the object at `bucket`/`key` to `dest`.
    fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), ObjectStoreError>;
}

/// Filesystem-backed object store mapping buckets to directories under a
/// configured root.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for FsObjectStore {
    fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), ObjectStoreError> {
        let source = self.root.join(bucket).join(key);
        if !source.is_file() {
            return Err(ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        std::fs::copy(&source, dest)?;
        debug!(bucket, key, dest = %dest.display(), "fetched object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetches_existing_object() {
        let root = tempfile::tempdir().unwrap();
        let bucket_dir = root.path().join("uploads");
        std::fs::create_dir_all(&bucket_dir).unwrap();
        std::fs::write(bucket_dir.join("scan.pdf"), b"%PDF-1.4").unwrap();

        let dest_dir = tempfile::tempdir().unwrap();
        let dest = dest_dir.path().join("document.pdf");

        let store = FsObjectStore::new(root.path());
        store.fetch("uploads", "scan.pdf", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn missing_object_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();

        let store = FsObjectStore::new(root.path());
        let err = store
            .fetch("uploads", "absent.pdf", &dest_dir.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound { .. }));
    }
}
