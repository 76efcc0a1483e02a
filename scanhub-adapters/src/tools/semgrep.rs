//! Semgrep static analysis

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScanTarget, ScannerDescriptor,
    Severity, ToolParameter,
};
use scanhub_runner::ProcessRunner;

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::json_document;
use crate::source;

const DEFAULT_CONFIG: &str = "auto";

/// Root of `semgrep --json`
#[derive(Debug, Default, Deserialize)]
struct SemgrepOutput {
    #[serde(default)]
    results: Vec<SemgrepResult>,
    #[serde(default)]
    errors: Vec<SemgrepError>,
}

#[derive(Debug, Deserialize)]
struct SemgrepResult {
    check_id: String,
    path: String,
    #[serde(default)]
    start: Option<Position>,
    #[serde(default)]
    extra: SemgrepExtra,
}

#[derive(Debug, Deserialize)]
struct Position {
    line: u32,
}

#[derive(Debug, Default, Deserialize)]
struct SemgrepExtra {
    #[serde(default)]
    message: String,
    #[serde(default)]
    lines: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SemgrepError {
    #[serde(default)]
    message: String,
}

pub struct SemgrepAdapter {
    descriptor: ScannerDescriptor,
}

impl SemgrepAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("semgrep", "semgrep")
            .with_arguments(["scan"])
            .with_output_format(OutputFormat::Structured)
            .with_success_exit_codes(&[0, 1])
            .with_categories(&[FindingCategory::Vulnerability])
            .with_description("Static analysis for source repositories")
    }
}

impl Default for SemgrepAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn map_severity(label: &str) -> Severity {
    match label.to_uppercase().as_str() {
        "ERROR" => Severity::High,
        "WARNING" => Severity::Medium,
        "INFO" => Severity::Low,
        other => Severity::from_label(other),
    }
}

#[async_trait]
impl ToolAdapter for SemgrepAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["repoURL", "gitURL", "--config", "-c", "--json"])
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
        let mut configs: Vec<String> = ctx
            .parameter("--config")
            .or_else(|| ctx.parameter("-c"))
            .map(|p| p.values())
            .unwrap_or_default()
            .into_iter()
            .filter(|v| !v.trim().is_empty())
            .collect();
        if configs.is_empty() {
            configs.push(DEFAULT_CONFIG.to_string());
        }

        let mut command = base_command(&self.descriptor).arg("--json");
        for config in configs {
            command = command.arg("--config").arg(config);
        }
        let command = command
            .args(self.parameters().render(&ctx.parameters))
            .arg(source.path_arg()?);
        Ok(Invocation::new(command))
    }

    /// Semgrep exits non-zero for blocking findings and for some partial
    /// failures; a JSON document with `results` is still usable.
    fn accepts_exit(&self, output: &ToolOutput) -> bool {
        let accepted = output
            .exit_code
            .is_some_and(|code| self.descriptor.accepts_exit_code(code));
        accepted || output.stdout.contains("\"results\"")
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let Some(parsed) = json_document::<SemgrepOutput>("semgrep", &output.stdout, output.stdout_truncated)?
        else {
            return Ok(Vec::new());
        };
        if !parsed.errors.is_empty() {
            tracing::debug!(
                errors = parsed.errors.len(),
                first = %parsed.errors[0].message,
                "Semgrep reported analysis errors"
            );
        }

        Ok(parsed
            .results
            .into_iter()
            .map(|result| {
                let title = if result.extra.message.is_empty() {
                    result.check_id.clone()
                } else {
                    result.extra.message.clone()
                };
                let mut finding =
                    NormalizedFinding::builder("semgrep", FindingCategory::Vulnerability, title)
                        .severity(map_severity(&result.extra.severity))
                        .path(output.relative_path(&result.path))
                        .evidence(result.extra.lines.trim())
                        .rule_id(result.check_id);
                if let Some(start) = result.start {
                    finding = finding.line(start.line);
                }
                if let Some(source) = result.extra.metadata.get("source").and_then(|v| v.as_str()) {
                    finding = finding.url(source);
                }
                finding.build()
            })
            .collect())
    }
}
