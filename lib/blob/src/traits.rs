use crate::error::BlobError;

/// Metadata for a stored blob.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    pub key: String,
    pub size: u64,
}

/// BlobStore provides storage for binary large objects (uploaded
/// organization documents, receipts, attachments).
///
/// Keys are path-like strings: `documents/<doc-id>/v1/minutes.pdf`.
/// The default implementation (`FileStore`) maps keys to local filesystem
/// paths. Can be swapped for S3-compatible backends by implementing this
/// trait.
pub trait BlobStore: Send + Sync {
    /// Store a blob under the given key, overwriting any existing value.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Fetch a blob by key.
    fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Delete a blob by key. Deleting a missing blob is not an error.
    fn delete(&self, key: &str) -> Result<(), BlobError>;

    /// Stat a blob without reading its content.
    fn stat(&self, key: &str) -> Result<BlobMeta, BlobError>;
}
