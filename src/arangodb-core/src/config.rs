use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server endpoint, e.g. `http://localhost:8529`
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,

    // Static basic-auth credentials, sent as-is
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub insecure_skip_verify: bool,

    #[serde(default)]
    pub cursor: CursorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CursorConfig {
    /// Rows per server round trip; server default when unset
    #[serde(default)]
    pub batch_size: Option<u32>,

    /// Idle lifetime of server-side cursors in seconds
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Consecutive empty batches tolerated while the server still reports
    /// more results
    #[serde(default = "default_max_empty_fetches")]
    pub max_empty_fetches: u32,
}

fn default_url() -> String {
    "http://localhost:8529".to_string()
}

fn default_database() -> String {
    "_system".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_empty_fetches() -> u32 {
    5
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            ttl_secs: None,
            max_empty_fetches: default_max_empty_fetches(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// URL prefix all database-scoped endpoints hang off
    pub fn database_url(&self) -> String {
        format!("{}/_db/{}", self.url.trim_end_matches('/'), self.database)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
            username: None,
            password: None,
            request_timeout_secs: default_request_timeout_secs(),
            insecure_skip_verify: false,
            cursor: CursorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"database": "shop", "cursor": {"batch_size": 500}}"#)
                .unwrap();
        assert_eq!(config.url, "http://localhost:8529");
        assert_eq!(config.database, "shop");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.cursor.batch_size, Some(500));
        assert_eq!(config.cursor.max_empty_fetches, 5);
    }

    #[test]
    fn test_database_url() {
        let config = ClientConfig {
            url: "http://db.internal:8529/".to_string(),
            database: "shop".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.database_url(), "http://db.internal:8529/_db/shop");
    }
}
