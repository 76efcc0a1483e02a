//! Repository sources for code-scanning tools

use tracing::{info, warn};

use scanhub_core::domain::result::tail;
use scanhub_core::domain::{ScanError, ScanTarget, TargetKind, ToolParameter};
use scanhub_runner::{CommandSpec, ProcessRunner};

use crate::adapter::{AdapterContext, PreparedSource};

/// Parameter names that carry a repository URL.
pub const SOURCE_PARAMETERS: &[&str] = &["repoURL", "gitURL"];

const CLONE_SCHEMES: &[&str] = &["https://", "http://", "ssh://", "git@"];

/// First non-empty repository URL among the parameters.
pub fn repository_url(parameters: &[ToolParameter]) -> Option<String> {
    parameters
        .iter()
        .filter(|p| SOURCE_PARAMETERS.contains(&p.flag.as_str()))
        .find_map(|p| p.value.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// A repository tool needs either a local path target or a cloneable URL.
pub fn validate_repository_source(
    scanner: &str,
    target: &ScanTarget,
    parameters: &[ToolParameter],
) -> Result<(), ScanError> {
    if target.kind() == TargetKind::RepositoryPath {
        return Ok(());
    }
    let Some(url) = repository_url(parameters) else {
        return Err(ScanError::validation(format!(
            "{} requires a 'repoURL' or 'gitURL' parameter, or a repository path target",
            scanner
        )));
    };
    if !CLONE_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ScanError::validation(format!(
            "Unsupported repository URL '{}'",
            url
        )));
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ScanError::validation("Repository URL contains whitespace"));
    }
    Ok(())
}

/// Use the target path directly, or shallow-clone the repository into
/// `<work_dir>/source`.
pub async fn checkout(
    runner: &ProcessRunner,
    ctx: &AdapterContext,
) -> Result<PreparedSource, ScanError> {
    if let Some(path) = ctx.target.as_path() {
        return match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(PreparedSource::at(path)),
            _ => Err(ScanError::execution(format!(
                "Repository path {} is not a directory",
                path
            ))),
        };
    }

    let url = repository_url(&ctx.parameters)
        .ok_or_else(|| ScanError::validation("No repository URL was provided"))?;
    let destination = ctx.work_file("source");
    if tokio::fs::metadata(&destination).await.is_ok() {
        tokio::fs::remove_dir_all(&destination)
            .await
            .map_err(|e| ScanError::internal(format!("Failed to clear {}: {}", destination.display(), e)))?;
    }

    info!(job_id = %ctx.job_id, repository = %url, "Cloning repository");

    let command = CommandSpec::new("git")
        .args(["clone", "--depth", "1", "--"])
        .arg(url.as_str())
        .arg(destination.to_string_lossy())
        .env("GIT_TERMINAL_PROMPT", "0");

    let output = runner
        .execute(&command, ctx.clone_timeout, &ctx.cancel)
        .await
        .map_err(ScanError::from)?;

    if output.exit_code != Some(0) {
        let stderr = tail(output.stderr.trim(), 500);
        warn!(job_id = %ctx.job_id, exit_code = ?output.exit_code, "Repository clone failed");
        return Err(ScanError::execution(format!(
            "Failed to clone repository: {}",
            stderr
        )));
    }

    Ok(PreparedSource::at(destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_url_prefers_first_non_empty() {
        let params = vec![
            ToolParameter::valued("repoURL", ""),
            ToolParameter::valued("gitURL", "https://github.com/acme/app.git"),
        ];
        assert_eq!(
            repository_url(&params).as_deref(),
            Some("https://github.com/acme/app.git")
        );
    }

    #[test]
    fn test_path_target_needs_no_url() {
        let target = ScanTarget::parse("/srv/repos/app").unwrap();
        assert!(validate_repository_source("gitleaks", &target, &[]).is_ok());
    }

    #[test]
    fn test_network_target_requires_url() {
        let target = ScanTarget::parse("example.com").unwrap();
        assert!(matches!(
            validate_repository_source("semgrep", &target, &[]),
            Err(ScanError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_option_like_url() {
        let target = ScanTarget::parse("example.com").unwrap();
        let params = vec![ToolParameter::valued("repoURL", "--upload-pack=touch /tmp/x")];
        assert!(validate_repository_source("yara", &target, &params).is_err());
    }
}
