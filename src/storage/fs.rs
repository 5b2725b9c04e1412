use super::{ObjectStore, StoredObject};
use crate::error::StorageError;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Object store on the local filesystem, `root/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    bucket: String,
}

impl FsObjectStore {
    /// Store for `bucket` under `root`, directories are created on first put
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.to_owned(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(&self.bucket).join(key)
    }

    fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn content_type(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => "text/csv",
        Some(ext) if ext.eq_ignore_ascii_case("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, local_file: &Path) -> Result<(), StorageError> {
        let target = self.object_path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(Self::io_error(parent))?;
        }
        let bytes = fs::copy(local_file, &target)
            .await
            .map_err(Self::io_error(local_file))?;
        debug!(bucket = %self.bucket, key, bytes, "stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let path = self.object_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(StoredObject {
                bytes,
                content_type: Some(content_type(key).to_owned()),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: self.bucket.clone(),
                key: key.to_owned(),
            }),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        let mut buckets = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(buckets),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Self::io_error(&self.root))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(Self::io_error(&self.root))?
                .is_dir();
            if is_dir {
                buckets.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        buckets.sort();
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn local_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("upload.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        path
    }

    #[tokio::test]
    async fn put_then_get_returns_the_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("s3"), "bucket");
        let file = local_file(dir.path(), "1;A;B;2;3\n");

        store.put("data/books.csv", &file).await.unwrap();
        let object = store.get("data/books.csv").await.unwrap();

        assert_eq!(object.bytes, b"1;A;B;2;3\n");
        assert_eq!(object.content_type.as_deref(), Some("text/csv"));
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "bucket");
        let err = store.get("nope.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { ref key, .. } if key == "nope.csv"));
    }

    #[tokio::test]
    async fn missing_local_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "bucket");
        let err = store
            .put("k.csv", &dir.path().join("absent.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "bucket");
        let file = local_file(dir.path(), "x");

        store.put("k.csv", &file).await.unwrap();
        store.delete("k.csv").await.unwrap();
        store.delete("k.csv").await.unwrap();
        assert!(store.get("k.csv").await.is_err());
    }

    #[tokio::test]
    async fn buckets_are_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("s3");
        let file = local_file(dir.path(), "x");

        FsObjectStore::new(&root, "zeta").put("k", &file).await.unwrap();
        FsObjectStore::new(&root, "alpha").put("k", &file).await.unwrap();

        let buckets = FsObjectStore::new(&root, "alpha").list_buckets().await.unwrap();
        assert_eq!(buckets, ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn no_root_means_no_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("missing"), "b");
        assert!(store.list_buckets().await.unwrap().is_empty());
    }
}
