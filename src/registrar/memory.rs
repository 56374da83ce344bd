// In-memory registrar implementation
// Serves tests and single-process deployments. One watch channel per
// identity carries the record to all live subscribers; last-value semantics
// keep each observation at least as new as the previous one.

use super::{RecordStream, RegistrarError, SessionRecord, SessionRegistrar};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

/// In-memory session registrar
#[derive(Clone)]
pub struct MemoryRegistrar {
    channels: Arc<RwLock<HashMap<String, watch::Sender<Option<SessionRecord>>>>>,
    reachable: Arc<RwLock<bool>>,
}

impl MemoryRegistrar {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            reachable: Arc::new(RwLock::new(true)),
        }
    }

    /// Simulate the registrar becoming unreachable
    pub async fn set_reachable(&self, reachable: bool) {
        *self.reachable.write().await = reachable;
    }

    /// Current record for an identity, if any
    pub async fn record(&self, identity: &str) -> Option<SessionRecord> {
        let channels = self.channels.read().await;
        channels.get(identity).and_then(|tx| tx.borrow().clone())
    }

    /// Merge an unrelated field into the identity's record, as another
    /// writer of the same document would
    pub async fn set_field(&self, identity: &str, key: &str, value: &str) {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(identity.to_string())
            .or_insert_with(|| watch::channel(None).0);

        let mut record = tx.borrow().clone().unwrap_or_else(|| SessionRecord {
            session_id: String::new(),
            updated_at: Utc::now(),
            fields: HashMap::new(),
        });
        record.fields.insert(key.to_string(), value.to_string());
        record.updated_at = Utc::now();
        tx.send_replace(Some(record));
    }

    async fn check_reachable(&self) -> Result<(), RegistrarError> {
        if *self.reachable.read().await {
            Ok(())
        } else {
            Err(RegistrarError::Unreachable(
                "connection refused".to_string(),
            ))
        }
    }
}

impl Default for MemoryRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRegistrar for MemoryRegistrar {
    async fn write_session(
        &self,
        identity: &str,
        session_id: &str,
    ) -> Result<(), RegistrarError> {
        self.check_reachable().await?;

        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(identity.to_string())
            .or_insert_with(|| watch::channel(None).0);

        // Merge: unrelated fields of the record survive the session write
        let fields = tx
            .borrow()
            .as_ref()
            .map(|r| r.fields.clone())
            .unwrap_or_default();

        tx.send_replace(Some(SessionRecord {
            session_id: session_id.to_string(),
            updated_at: Utc::now(),
            fields,
        }));

        info!("Session {} registered for identity {}", session_id, identity);
        Ok(())
    }

    async fn subscribe(&self, identity: &str) -> Result<RecordStream, RegistrarError> {
        self.check_reachable().await?;

        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(identity.to_string())
            .or_insert_with(|| watch::channel(None).0);

        debug!("New subscription for identity {}", identity);
        Ok(tx.subscribe())
    }
}
