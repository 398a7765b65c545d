//! Configuration types for ocr-batch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Prompt sent to the conversion service when a job does not override it
pub const DEFAULT_PROMPT: &str = "<image>\n<|grounding|>Convert the document to markdown.";

/// Artifact storage roots
///
/// Each job owns one directory under each root; archives are written next to
/// the per-job result directories, named by job id.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Upload directory, one sub-directory per job (default: "./webui_uploads")
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Results directory, one sub-directory plus one archive per job (default: "./webui_results")
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            results_dir: default_results_dir(),
        }
    }
}

/// Job execution settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessingConfig {
    /// Maximum number of jobs processed at once (default: 2)
    ///
    /// Jobs beyond this limit stay `queued` until a slot frees up. Files within
    /// a job are always processed one at a time.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Prompt used when a submission does not provide one
    #[serde(default = "default_prompt")]
    pub default_prompt: String,

    /// Timeout for one call to the conversion service (default: 300 seconds)
    #[serde(default = "default_conversion_timeout", with = "duration_serde")]
    pub conversion_timeout: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            default_prompt: default_prompt(),
            conversion_timeout: default_conversion_timeout(),
        }
    }
}

/// Artifact retention settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Run the janitor (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Age after which artifacts and their job are reclaimed (default: 24 hours)
    #[serde(default = "default_max_age", with = "duration_serde")]
    pub max_age: Duration,

    /// Time between sweeps (default: 1 hour)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age: default_max_age(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Remote conversion service connection settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConverterConfig {
    /// Base URL of the conversion service (default: "http://localhost:8000")
    #[serde(default = "default_converter_url")]
    pub base_url: String,

    /// Optional bearer token sent as `Authorization: Bearer <key>`
    #[serde(default)]
    pub api_key: Option<String>,

    /// TCP connect timeout (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            base_url: default_converter_url(),
            api_key: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Main configuration for BatchService
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Artifact storage roots
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job execution settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Artifact retention
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Conversion service connection
    #[serde(default)]
    pub converter: ConverterConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Upload root
    pub fn upload_dir(&self) -> &PathBuf {
        &self.storage.upload_dir
    }

    /// Results root
    pub fn results_dir(&self) -> &PathBuf {
        &self.storage.results_dir
    }

    /// Check settings that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        if self.processing.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".into(),
                key: Some("processing.max_concurrent_jobs".into()),
            });
        }
        if self.processing.conversion_timeout.is_zero() {
            return Err(Error::Config {
                message: "conversion_timeout must be greater than zero".into(),
                key: Some("processing.conversion_timeout".into()),
            });
        }
        if self.retention.enabled && self.retention.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep_interval must be greater than zero".into(),
                key: Some("retention.sweep_interval".into()),
            });
        }
        if self.storage.upload_dir == self.storage.results_dir {
            return Err(Error::Config {
                message: "upload_dir and results_dir must be different directories".into(),
                key: Some("storage.results_dir".into()),
            });
        }
        Ok(())
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8001)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Maximum request body size for uploads (default: 512 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// Default value functions
fn default_upload_dir() -> PathBuf {
    PathBuf::from("webui_uploads")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("webui_results")
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_conversion_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_age() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_converter_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8001))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
