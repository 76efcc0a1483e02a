//! Configuration validation module

use crate::config::{Config, LoggingConfig, ScanConfig, ScannerOverride, ServerConfig};
use crate::domain::target::TargetPolicy;

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },

    #[error("Scan configuration error: {message}")]
    Scan { message: String },

    #[error("Scanner configuration error: {message}")]
    Scanner { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::Scan {
            message: message.into(),
        }
    }

    pub fn scanner(message: impl Into<String>) -> Self {
        Self::Scanner {
            message: message.into(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.scan.validate()?;
        for (name, scanner) in &self.scanners {
            scanner
                .validate()
                .map_err(|e| ValidationError::scanner(format!("{}: {}", name, e)))?;
        }
        Ok(())
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only 0 needs rejecting
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty".to_string()));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.format.as_str() {
            "json" | "compact" | "pretty" => {}
            other => {
                return Err(ValidationError::logging(format!(
                    "Unknown log format '{}', expected json, compact or pretty",
                    other
                )));
            }
        }

        if self.level.trim().is_empty() {
            return Err(ValidationError::logging("Log level cannot be empty"));
        }

        Ok(())
    }
}

impl Validate for ScanConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_adapters == 0 {
            return Err(ValidationError::scan(
                "max_concurrent_adapters must be greater than 0",
            ));
        }

        if self.max_job_workers == 0 {
            return Err(ValidationError::scan("max_job_workers must be greater than 0"));
        }

        if self.job_queue_capacity == 0 {
            return Err(ValidationError::scan(
                "job_queue_capacity must be greater than 0",
            ));
        }

        if self.default_timeout_seconds == 0 {
            return Err(ValidationError::scan(
                "default_timeout_seconds must be greater than 0",
            ));
        }

        // Below one KiB no scanner produces a parseable document.
        if self.max_output_bytes < 1024 {
            return Err(ValidationError::scan(format!(
                "max_output_bytes must be at least 1024, got {}",
                self.max_output_bytes
            )));
        }

        if self.job_retention_seconds == 0 {
            return Err(ValidationError::scan(
                "job_retention_seconds must be greater than 0",
            ));
        }

        if self.max_retained_jobs == 0 {
            return Err(ValidationError::scan("max_retained_jobs must be greater than 0"));
        }

        if self.work_dir.as_os_str().is_empty() {
            return Err(ValidationError::scan("work_dir cannot be empty"));
        }

        TargetPolicy::new(self.allowed_target_patterns.as_slice()).map_err(|e| {
            ValidationError::scan(format!("Invalid allowed_target_patterns entry: {}", e))
        })?;

        Ok(())
    }
}

impl Validate for ScannerOverride {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_seconds == Some(0) {
            return Err(ValidationError::scanner(
                "timeout_seconds must be greater than 0",
            ));
        }

        if self
            .executable
            .as_deref()
            .is_some_and(|exe| exe.trim().is_empty())
        {
            return Err(ValidationError::scanner("executable cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_rejects_zero_port() {
        let server = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            server.validate(),
            Err(ValidationError::Server { .. })
        ));
    }

    #[test]
    fn test_scan_rejects_zero_retention() {
        let scan = ScanConfig {
            job_retention_seconds: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(scan.validate(), Err(ValidationError::Scan { .. })));

        let scan = ScanConfig {
            max_retained_jobs: 0,
            ..ScanConfig::default()
        };
        assert!(scan.validate().is_err());
    }

    #[test]
    fn test_logging_rejects_unknown_format() {
        let logging = LoggingConfig {
            format: "xml".into(),
            ..LoggingConfig::default()
        };
        assert!(logging.validate().is_err());
    }

    #[test]
    fn test_scan_rejects_bad_pattern() {
        let scan = ScanConfig {
            allowed_target_patterns: vec!["([a-z".into()],
            ..ScanConfig::default()
        };
        let err = scan.validate().unwrap_err();
        assert!(err.to_string().contains("allowed_target_patterns"));
    }

    #[test]
    fn test_scan_rejects_zero_concurrency() {
        let scan = ScanConfig {
            max_concurrent_adapters: 0,
            ..ScanConfig::default()
        };
        assert!(scan.validate().is_err());
    }

    #[test]
    fn test_scanner_override_names_the_scanner() {
        let mut config = Config::default();
        config.scanners.insert(
            "trivy".into(),
            ScannerOverride {
                timeout_seconds: Some(0),
                ..ScannerOverride::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trivy"));
    }
}
