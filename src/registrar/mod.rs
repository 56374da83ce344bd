// Session Registrar client
// The registrar is the remote authority holding, per identity, the token of
// the currently valid session. It is the single source of truth for which
// login is "current"; last write wins by design, since the point is to let
// the latest login evict earlier ones.

pub mod memory;

pub use memory::MemoryRegistrar;

use crate::config::RegistrarConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Per-identity session record held by the registrar.
/// `fields` carries whatever else lives in the identity's document; a
/// session write must preserve them (merge, not replace).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_id: String,
    pub updated_at: DateTime<Utc>,
    pub fields: HashMap<String, String>,
}

/// Change stream for one identity's record. Observes the current value
/// immediately and every subsequent write, each observation at least as new
/// as the previous one. Dropping the receiver disposes the subscription.
pub type RecordStream = watch::Receiver<Option<SessionRecord>>;

/// Registrar errors
#[derive(Debug, Clone)]
pub enum RegistrarError {
    Unreachable(String),
    WriteFailed(String),
}

impl std::fmt::Display for RegistrarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrarError::Unreachable(msg) => write!(f, "Registrar unreachable: {}", msg),
            RegistrarError::WriteFailed(msg) => write!(f, "Session write failed: {}", msg),
        }
    }
}

impl std::error::Error for RegistrarError {}

/// Trait for session registrar backends
#[async_trait]
pub trait SessionRegistrar: Send + Sync {
    /// Upsert the identity's session token, preserving unrelated fields.
    /// Resolves only once the write is acknowledged.
    async fn write_session(&self, identity: &str, session_id: &str)
        -> Result<(), RegistrarError>;

    /// Subscribe to the identity's record changes
    async fn subscribe(&self, identity: &str) -> Result<RecordStream, RegistrarError>;
}

/// Write the session token with bounded retries and backoff. Exhausting the
/// retries surfaces the last error to the caller; it is never swallowed.
pub async fn write_session_with_retry(
    registrar: &dyn SessionRegistrar,
    identity: &str,
    session_id: &str,
    config: &RegistrarConfig,
) -> Result<(), RegistrarError> {
    let attempts = config.write_retry_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match registrar.write_session(identity, session_id).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(
                    "Session write for {} failed (attempt {}/{}): {}",
                    identity, attempt, attempts, e
                );
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(config.write_retry_backoff_ms)).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        RegistrarError::WriteFailed("no write attempt was made".to_string())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failure() {
        let registrar = MemoryRegistrar::new();
        registrar.set_reachable(false).await;

        let config = RegistrarConfig {
            write_retry_attempts: 3,
            write_retry_backoff_ms: 50,
        };

        // Restore reachability while the retry loop is backing off
        let restore = {
            let registrar = registrar.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                registrar.set_reachable(true).await;
            })
        };

        let result = write_session_with_retry(&registrar, "uid-1", "s-1", &config).await;
        restore.await.unwrap();

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_error() {
        let registrar = MemoryRegistrar::new();
        registrar.set_reachable(false).await;

        let config = RegistrarConfig {
            write_retry_attempts: 2,
            write_retry_backoff_ms: 1,
        };

        let err = write_session_with_retry(&registrar, "uid-1", "s-1", &config)
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrarError::Unreachable(_)));
    }
}
