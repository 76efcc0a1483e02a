//! Configuration management

pub mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::validation::{Validate, ValidationError};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub scan: ScanConfig,
    /// Per-scanner overrides keyed by scanner name
    pub scanners: BTreeMap<String, ScannerOverride>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whether to expose interactive API docs (Swagger UI).
    pub enable_docs: bool,
    /// Global request timeout in seconds applied at the HTTP layer.
    pub request_timeout_seconds: u64,
    /// Allowed CORS origins. Use ["*"] to allow any. Empty vector -> no external origins.
    pub allowed_origins: Vec<String>,
    /// How long to wait for in-flight jobs after a shutdown signal.
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            enable_docs: true,
            request_timeout_seconds: 30,
            allowed_origins: vec!["*".to_string()],
            shutdown_timeout_seconds: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json`, `compact` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Scan execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Adapters of one job allowed to run at the same time
    pub max_concurrent_adapters: usize,
    /// Jobs processed concurrently by the worker pool
    pub max_job_workers: usize,
    /// Jobs buffered before submissions are rejected
    pub job_queue_capacity: usize,
    /// Timeout applied to scanners without their own override
    pub default_timeout_seconds: u64,
    /// Per-stream capture ceiling for scanner output
    pub max_output_bytes: usize,
    /// Delay between SIGTERM and SIGKILL when tearing down a process group
    pub kill_grace_millis: u64,
    /// Regexes a target (or its host) must match. Empty allows all targets.
    pub allowed_target_patterns: Vec<String>,
    /// Root for per-job working directories
    pub work_dir: PathBuf,
    /// Keep raw outputs and `final_results.json` after a job finishes
    pub keep_artifacts: bool,
    /// Timeout for `git clone` when a scanner needs a repository
    pub clone_timeout_seconds: u64,
    /// How long a finished job stays queryable
    pub job_retention_seconds: u64,
    /// Finished jobs kept before the oldest are evicted
    pub max_retained_jobs: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_adapters: 4,
            max_job_workers: 2,
            job_queue_capacity: 64,
            default_timeout_seconds: 3600,
            max_output_bytes: 16 * 1024 * 1024,
            kill_grace_millis: 2000,
            allowed_target_patterns: Vec::new(),
            work_dir: PathBuf::from("outputs"),
            keep_artifacts: false,
            clone_timeout_seconds: 300,
            job_retention_seconds: 86400,
            max_retained_jobs: 1000,
        }
    }
}

impl ScanConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_seconds)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_millis)
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_seconds)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_seconds)
    }
}

/// Per-scanner override
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerOverride {
    pub enabled: bool,
    /// Replaces the executable name or path
    pub executable: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for ScannerOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: None,
            timeout_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Sources, lowest priority first: `config/default`, `config/{ENV}`,
    /// `config/local`, then `SCANHUB__SECTION__KEY` variables.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("SCANHUB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .with_list_parse_key("scan.allowed_target_patterns")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Override for a scanner, if one was configured.
    pub fn scanner_override(&self, name: &str) -> Option<&ScannerOverride> {
        self.scanners.get(name)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
