// Local durable storage abstraction
// String key-value store backing session tokens, the app-state blob and
// profile side keys. Reads always degrade to "absent" rather than failing
// the caller.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

/// Key holding the locally stamped session token.
pub const SESSION_ID_KEY: &str = "essencia_session_id";
/// One-shot flag consumed by the next login screen render.
pub const LOGOUT_REASON_KEY: &str = "essencia_logout_reason";
/// JSON blob with the persisted app state.
pub const APP_STATE_KEY: &str = "essencia_health_v15";
/// Selected accent theme color, raw hex string.
pub const THEME_COLOR_KEY: &str = "essencia_theme_color";
/// User-chosen display name, raw string.
pub const USER_NAME_KEY: &str = "essencia_user_name";

/// Trait for local key-value storage backends
pub trait LocalStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, overwriting any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Storage errors
#[derive(Debug, Clone)]
pub enum StoreError {
    Io(String),
    InvalidKey(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "I/O error: {}", msg),
            StoreError::InvalidKey(key) => write!(f, "Invalid storage key: {}", key),
        }
    }
}

impl std::error::Error for StoreError {}

/// Factory function to create a local store based on configuration
pub fn create_local_store(config: &crate::config::StoreConfig) -> Arc<dyn LocalStore> {
    match config {
        crate::config::StoreConfig::Memory => Arc::new(MemoryStore::new()),
        crate::config::StoreConfig::File { dir } => Arc::new(FileStore::new(dir)),
    }
}
