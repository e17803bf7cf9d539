use std::sync::Arc;

use arangodb_core::{ClientConfig, Result, Transport};
use tracing::info;

use crate::database::Database;
use crate::transport::HttpTransport;

/// ArangoDB REST API client bound to the configured database
pub struct Client {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl Client {
    /// Create a client speaking HTTP to `config.url`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        info!(
            url = %transport.base_url(),
            user = ?config.username,
            "arangodb client created"
        );
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The configured database
    pub fn db(&self) -> Database {
        Database::new(
            self.transport.clone(),
            self.config.database.clone(),
            self.config.cursor.clone(),
        )
    }

    /// Server version; doubles as a connectivity check
    pub async fn version(&self) -> Result<String> {
        self.db().version().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arangodb_core::ScriptedTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_handles_share_transport() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(200, json!({"version": "3.12.0"}))
            .push(200, json!({"count": 0}));

        let config = ClientConfig {
            database: "shop".to_string(),
            ..ClientConfig::default()
        };
        let client = Client::with_transport(transport.clone(), config);
        assert_eq!(client.db().name(), "shop");
        assert_eq!(client.version().await.unwrap(), "3.12.0");
        assert_eq!(client.db().collection("orders").count().await.unwrap(), 0);
        assert_eq!(transport.request_count(), 2);
    }
}
