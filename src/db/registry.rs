//! In-memory registry of connection configurations.
//!
//! The registry only stores records; live pools are owned by
//! [`ConnectionManager`](crate::db::ConnectionManager). A config is inserted
//! only after its pool connected successfully.

use crate::models::ConnectionConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    configs: Arc<RwLock<HashMap<String, ConnectionConfig>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a config under its id, replacing any previous record.
    pub async fn insert(&self, config: ConnectionConfig) {
        let mut configs = self.configs.write().await;
        debug!(connection_id = %config.id, "Registering connection");
        configs.insert(config.id.clone(), config);
    }

    /// All configs, oldest first.
    pub async fn list(&self) -> Vec<ConnectionConfig> {
        let configs = self.configs.read().await;
        let mut list: Vec<ConnectionConfig> = configs.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    /// Remove a config. Returns the removed record, if any.
    pub async fn remove(&self, connection_id: &str) -> Option<ConnectionConfig> {
        let mut configs = self.configs.write().await;
        configs.remove(connection_id)
    }
}
