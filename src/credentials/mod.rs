//! Credential store — durable key/value persistence for the session token
//! and the cached user record.
//!
//! The store is synchronous and local. Only the session manager reads or
//! writes it; everything else observes the session through the manager.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use crate::error::StorageError;

/// Keys used by the session manager.
pub mod keys {
    /// Opaque access token.
    pub const TOKEN: &str = "token";
    /// JSON-encoded cached `User`.
    pub const USER_DATA: &str = "user_data";
}

/// Synchronous key/value persistence that survives process restarts.
pub trait CredentialStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
