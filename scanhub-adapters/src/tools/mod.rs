//! Bundled scanner integrations

pub mod gitleaks;
pub mod httpx;
pub mod lynis;
pub mod nikto;
pub mod nuclei;
pub mod semgrep;
pub mod sqlmap;
pub mod trivy;
pub mod trufflehog;
pub mod wpscan;
pub mod yara;

pub use gitleaks::GitleaksAdapter;
pub use httpx::HttpxAdapter;
pub use lynis::LynisAdapter;
pub use nikto::NiktoAdapter;
pub use nuclei::NucleiAdapter;
pub use semgrep::SemgrepAdapter;
pub use sqlmap::SqlmapAdapter;
pub use trivy::TrivyAdapter;
pub use trufflehog::TrufflehogAdapter;
pub use wpscan::WpscanAdapter;
pub use yara::YaraAdapter;

use scanhub_core::domain::TargetKind;

/// Targets reachable over the network.
pub(crate) const NETWORK_TARGETS: &[TargetKind] =
    &[TargetKind::Url, TargetKind::Ip, TargetKind::Hostname];

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::time::Duration;

    use scanhub_core::domain::{ScanTarget, ToolParameter};
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use crate::adapter::AdapterContext;

    pub fn context(target: &str, parameters: Vec<ToolParameter>) -> AdapterContext {
        AdapterContext {
            job_id: Uuid::nil(),
            target: ScanTarget::parse(target).expect("valid target"),
            parameters,
            work_dir: PathBuf::from("/work/job/tool"),
            timeout: Duration::from_secs(60),
            clone_timeout: Duration::from_secs(60),
            cancel: CancellationToken::new(),
            keep_artifacts: false,
        }
    }
}
