use crate::error::KVError;

/// KVStore provides a key-value storage interface for small ephemeral
/// records that don't warrant a SQL table.
///
/// Keys follow a namespaced convention: `verify/<token>`,
/// `reset/<token>`. Values are opaque bytes (typically serialized JSON).
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
