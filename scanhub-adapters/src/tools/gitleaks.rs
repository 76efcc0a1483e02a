//! Gitleaks secret scanner

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScanTarget, ScannerDescriptor,
    Severity, ToolParameter,
};
use scanhub_runner::ProcessRunner;

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::{json_document, redact};
use crate::source;

const REPORT_FILE: &str = "gitleaks_results.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GitleaksLeak {
    #[serde(default)]
    description: String,
    #[serde(default)]
    start_line: u32,
    #[serde(default)]
    file: String,
    #[serde(default)]
    secret: String,
    #[serde(rename = "Match", default)]
    matched: String,
    #[serde(rename = "RuleID", default)]
    rule_id: String,
    #[serde(default)]
    commit: Option<String>,
}

pub struct GitleaksAdapter {
    descriptor: ScannerDescriptor,
}

impl GitleaksAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        // 1 means "leaks found"
        ScannerDescriptor::new("gitleaks", "gitleaks")
            .with_arguments(["detect"])
            .with_output_format(OutputFormat::Structured)
            .with_success_exit_codes(&[0, 1])
            .with_categories(&[FindingCategory::Secret])
            .with_description("Secret detection in git repositories")
    }
}

impl Default for GitleaksAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for GitleaksAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&[
            "repoURL",
            "gitURL",
            "--source",
            "-s",
            "-r",
            "--report-path",
            "-f",
            "--report-format",
        ])
    }

    fn validate(&self, target: &ScanTarget, parameters: &[ToolParameter]) -> Result<(), ScanError> {
        source::validate_repository_source(self.name(), target, parameters)?;
        self.parameters().validate(parameters)
    }

    async fn prepare(
        &self,
        runner: &ProcessRunner,
        ctx: &AdapterContext,
    ) -> Result<PreparedSource, ScanError> {
        source::checkout(runner, ctx).await
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let report = ctx.work_file(REPORT_FILE);
        let command = base_command(&self.descriptor)
            .arg("--source")
            .arg(source.path_arg()?)
            .arg("--no-banner")
            .arg("-r")
            .arg(report.to_string_lossy())
            .args(["-f", "json"])
            .args(self.parameters().render(&ctx.parameters));
        Ok(Invocation::new(command).with_report(report))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let report = output.require_report("gitleaks")?;
        let leaks: Vec<GitleaksLeak> =
            json_document("gitleaks", report, output.report_truncated)?.unwrap_or_default();

        Ok(leaks
            .into_iter()
            .map(|leak| {
                // The raw secret never leaves the adapter.
                let evidence = if leak.secret.is_empty() {
                    String::new()
                } else {
                    leak.matched.replace(&leak.secret, &redact(&leak.secret))
                };
                let mut finding =
                    NormalizedFinding::builder("gitleaks", FindingCategory::Secret, leak.description)
                        .severity(Severity::High)
                        .rule_id(leak.rule_id)
                        .path(output.relative_path(&leak.file))
                        .line(leak.start_line)
                        .evidence(evidence);
                if let Some(commit) = leak.commit.filter(|c| !c.is_empty()) {
                    finding = finding.url(format!("commit:{}", commit));
                }
                finding.build()
            })
            .collect())
    }
}
