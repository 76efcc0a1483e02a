//! Bundled adapters, configured from [`Config`]

use std::sync::Arc;

use tracing::{debug, info};

use scanhub_core::Config;
use scanhub_core::domain::ScannerDescriptor;

use crate::adapter::ToolAdapter;
use crate::tools::{
    GitleaksAdapter, HttpxAdapter, LynisAdapter, NiktoAdapter, NucleiAdapter, SemgrepAdapter,
    SqlmapAdapter, TrivyAdapter, TrufflehogAdapter, WpscanAdapter, YaraAdapter,
};

type Factory = fn(ScannerDescriptor) -> Arc<dyn ToolAdapter>;

fn bundled() -> [(ScannerDescriptor, Factory); 11] {
    [
        (NucleiAdapter::default_descriptor(), |d| {
            Arc::new(NucleiAdapter::with_descriptor(d))
        }),
        (HttpxAdapter::default_descriptor(), |d| {
            Arc::new(HttpxAdapter::with_descriptor(d))
        }),
        (NiktoAdapter::default_descriptor(), |d| {
            Arc::new(NiktoAdapter::with_descriptor(d))
        }),
        (WpscanAdapter::default_descriptor(), |d| {
            Arc::new(WpscanAdapter::with_descriptor(d))
        }),
        (SqlmapAdapter::default_descriptor(), |d| {
            Arc::new(SqlmapAdapter::with_descriptor(d))
        }),
        (TrivyAdapter::default_descriptor(), |d| {
            Arc::new(TrivyAdapter::with_descriptor(d))
        }),
        (LynisAdapter::default_descriptor(), |d| {
            Arc::new(LynisAdapter::with_descriptor(d))
        }),
        (GitleaksAdapter::default_descriptor(), |d| {
            Arc::new(GitleaksAdapter::with_descriptor(d))
        }),
        (TrufflehogAdapter::default_descriptor(), |d| {
            Arc::new(TrufflehogAdapter::with_descriptor(d))
        }),
        (SemgrepAdapter::default_descriptor(), |d| {
            Arc::new(SemgrepAdapter::with_descriptor(d))
        }),
        (YaraAdapter::default_descriptor(), |d| {
            Arc::new(YaraAdapter::with_descriptor(d))
        }),
    ]
}

/// Every bundled adapter that is not disabled in `[scanners.<name>]`, with
/// executable and timeout overrides applied.
pub fn default_catalog(config: &Config) -> Vec<Arc<dyn ToolAdapter>> {
    let mut adapters = Vec::new();
    for (mut descriptor, build) in bundled() {
        let overrides = config.scanner_override(&descriptor.name);
        if overrides.is_some_and(|o| !o.enabled) {
            info!(scanner = %descriptor.name, "Scanner disabled by configuration");
            continue;
        }

        let timeout = overrides
            .and_then(|o| o.timeout_seconds)
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| config.scan.default_timeout());
        descriptor = descriptor.with_timeout(timeout);
        if let Some(executable) = overrides.and_then(|o| o.executable.clone()) {
            descriptor.executable = executable;
        }

        debug!(
            scanner = %descriptor.name,
            executable = %descriptor.executable,
            timeout_secs = timeout.as_secs(),
            "Registered scanner"
        );
        adapters.push(build(descriptor));
    }
    adapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanhub_core::config::ScannerOverride;
    use std::time::Duration;

    fn names(adapters: &[Arc<dyn ToolAdapter>]) -> Vec<String> {
        adapters.iter().map(|a| a.name().to_string()).collect()
    }

    #[test]
    fn test_all_bundled_scanners_by_default() {
        let adapters = default_catalog(&Config::default());
        assert_eq!(
            names(&adapters),
            vec![
                "nuclei",
                "httpx",
                "nikto",
                "wpscan",
                "sqlmap",
                "trivy",
                "lynis",
                "gitleaks",
                "trufflehog",
                "semgrep",
                "yara"
            ]
        );
        let default_timeout = Config::default().scan.default_timeout();
        assert!(
            adapters
                .iter()
                .all(|a| a.descriptor().default_timeout == default_timeout)
        );
    }

    #[test]
    fn test_overrides_are_applied() {
        let mut config = Config::default();
        config.scanners.insert(
            "lynis".into(),
            ScannerOverride {
                enabled: false,
                ..ScannerOverride::default()
            },
        );
        config.scanners.insert(
            "nuclei".into(),
            ScannerOverride {
                executable: Some("/usr/local/bin/nuclei".into()),
                timeout_seconds: Some(120),
                ..ScannerOverride::default()
            },
        );

        let adapters = default_catalog(&config);
        assert!(!names(&adapters).contains(&"lynis".to_string()));

        let nuclei = adapters.iter().find(|a| a.name() == "nuclei").unwrap();
        assert_eq!(nuclei.descriptor().executable, "/usr/local/bin/nuclei");
        assert_eq!(nuclei.descriptor().default_timeout, Duration::from_secs(120));
    }
}
