//! Process-wide configuration for the MediaStack server.
//!
//! All configuration is driven by environment variables.

/// Global configuration for a MediaStack process.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStackConfig {
    /// Bind address for the gateway.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// Log output format: `text` or `json`.
    pub log_format: String,
    /// Root directory for persisted media.
    pub data_dir: String,
}

impl Default for MediaStackConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:4580".to_owned(),
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
            data_dir: "/var/lib/mediastack".to_owned(),
        }
    }
}

impl MediaStackConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:4580` |
    /// | `LOG_LEVEL` | `info` |
    /// | `LOG_FORMAT` | `text` |
    /// | `DATA_DIR` | `/var/lib/mediastack` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("LOG_FORMAT") {
            config.log_format = v;
        }
        if let Ok(v) = std::env::var("DATA_DIR") {
            config.data_dir = v;
        }

        config
    }

    /// Whether logs should be emitted as JSON lines.
    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
