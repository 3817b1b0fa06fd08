use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the placebook service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Hosted media service configuration
    #[serde(default)]
    pub media: MediaConfig,
    /// Record store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// HTTP listen address
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Maximum accepted request body size in bytes (upload ceiling)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Credentials and options for the hosted media service.
///
/// Credentials default to empty so the service can boot without them;
/// upload and delete calls then fail at call time.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Cloud account identifier
    #[serde(default)]
    pub cloud_name: String,
    /// API key
    #[serde(default)]
    pub api_key: String,
    /// API secret used for request signing
    #[serde(default)]
    pub api_secret: String,
    /// Logical folder uploads are placed under
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Upload request timeout in seconds
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
    /// Override the service base URL (for tests / local stubs)
    pub base_url: Option<String>,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON document, relative to the working directory
    #[serde(default = "default_store_path")]
    pub path: String,
}

// Default value functions
fn default_service_name() -> String {
    "placebook".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_folder() -> String {
    "places".to_string()
}

fn default_upload_timeout_secs() -> u64 {
    30
}

fn default_store_path() -> String {
    "db.json".to_string()
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Add config file if present
            .add_source(config::File::with_name("config/placebook").required(false))
            .add_source(config::File::with_name("/etc/placebook/placebook").required(false))
            // Override with environment variables
            // PLACEBOOK__MEDIA__API_KEY -> media.api_key
            .add_source(
                config::Environment::with_prefix("PLACEBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Get the upload timeout as Duration
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.media.upload_timeout_secs)
    }

    /// Get the address the HTTP server binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            host: default_host(),
            port: default_port(),
            metrics_port: default_metrics_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: default_folder(),
            upload_timeout_secs: default_upload_timeout_secs(),
            base_url: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}
