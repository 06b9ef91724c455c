//! Storage port: Trait for the persistent key-value medium.
//!
//! The history store keeps three named string entries (history array, total
//! evaluations, average risk). All data is stored locally.

/// Trait for local key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// `None` if nothing is stored under `key`.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;
}
