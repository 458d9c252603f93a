// Bucket/key object storage used by the object-batch endpoint.

use crate::error::EnhanceError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub trait ObjectStore: Send + Sync {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EnhanceError>;

    fn put(&self, bucket: &str, key: &str, data: &[u8], content_type: &str)
    -> Result<(), EnhanceError>;
}

/// Maps `bucket/key` onto `<root>/<bucket>/<key>`, the layout of a local S3 emulator volume.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, EnhanceError> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(EnhanceError::Storage(format!("invalid bucket name '{}'", bucket)));
        }

        let key_path = Path::new(key);
        let is_plain = !key.is_empty()
            && key_path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(EnhanceError::Storage(format!("invalid object key '{}'", key)));
        }

        Ok(self.root.join(bucket).join(key_path))
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EnhanceError> {
        let path = self.object_path(bucket, key)?;
        debug!("Reading s3://{}/{} from {}", bucket, key, path.display());
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EnhanceError::Storage(format!("object s3://{}/{} not found", bucket, key))
            } else {
                EnhanceError::io(&path, e)
            }
        })
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), EnhanceError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EnhanceError::io(parent, e))?;
        }
        debug!(
            "Writing s3://{}/{} ({}, {} bytes) to {}",
            bucket,
            key,
            content_type,
            data.len(),
            path.display()
        );
        std::fs::write(&path, data).map_err(|e| EnhanceError::io(&path, e))
    }
}
