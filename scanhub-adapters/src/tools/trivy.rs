//! Trivy container image scanner

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScanTarget, ScannerDescriptor,
    Severity, ToolParameter,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::json_document;

/// Parameter carrying the image reference. The request target is not used.
pub const IMAGE_PARAMETER: &str = "imageName";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrivyReport {
    #[serde(default)]
    results: Vec<TrivyResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrivyResult {
    #[serde(default)]
    target: String,
    #[serde(default)]
    vulnerabilities: Vec<TrivyVulnerability>,
    #[serde(default)]
    misconfigurations: Vec<TrivyMisconfiguration>,
    #[serde(default)]
    secrets: Vec<TrivySecret>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID")]
    vulnerability_id: String,
    #[serde(default)]
    pkg_name: String,
    #[serde(default)]
    installed_version: String,
    #[serde(default)]
    fixed_version: Option<String>,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrivyMisconfiguration {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    severity: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrivySecret {
    #[serde(rename = "RuleID", default)]
    rule_id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    start_line: u32,
}

pub struct TrivyAdapter {
    descriptor: ScannerDescriptor,
}

impl TrivyAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("trivy", "trivy")
            .with_arguments(["image"])
            .with_output_format(OutputFormat::Structured)
            .with_categories(&[
                FindingCategory::Vulnerability,
                FindingCategory::Misconfiguration,
                FindingCategory::Secret,
            ])
            .with_required_parameters(&[IMAGE_PARAMETER])
            .with_description("Container image vulnerability scanner")
    }

    fn image_name(parameters: &[ToolParameter]) -> Option<String> {
        parameters
            .iter()
            .find(|p| p.flag == IMAGE_PARAMETER)
            .and_then(|p| p.value.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

impl Default for TrivyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for TrivyAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&[IMAGE_PARAMETER, "--format", "-f", "--output", "-o"])
    }

    fn validate(&self, _target: &ScanTarget, parameters: &[ToolParameter]) -> Result<(), ScanError> {
        let Some(image) = Self::image_name(parameters) else {
            return Err(ScanError::validation(format!(
                "trivy requires the '{}' parameter",
                IMAGE_PARAMETER
            )));
        };
        if image.starts_with('-') || image.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ScanError::validation(format!(
                "Invalid image reference '{}'",
                image
            )));
        }
        self.parameters().validate(parameters)
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let image = Self::image_name(&ctx.parameters).ok_or_else(|| {
            ScanError::validation(format!("trivy requires the '{}' parameter", IMAGE_PARAMETER))
        })?;
        let command = base_command(&self.descriptor)
            .args(["--format", "json", "--quiet"])
            .args(self.parameters().render(&ctx.parameters))
            .arg(image);
        Ok(Invocation::new(command))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let Some(report) = json_document::<TrivyReport>("trivy", &output.stdout, output.stdout_truncated)?
        else {
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for result in report.results {
            for vuln in result.vulnerabilities {
                let title = match &vuln.title {
                    Some(title) => format!("{} in {}: {}", vuln.vulnerability_id, vuln.pkg_name, title),
                    None => format!("{} in {}", vuln.vulnerability_id, vuln.pkg_name),
                };
                let mut evidence = format!("installed {}", vuln.installed_version);
                if let Some(fixed) = vuln.fixed_version.as_deref().filter(|v| !v.is_empty()) {
                    evidence.push_str(&format!(", fixed in {}", fixed));
                }
                findings.push(
                    NormalizedFinding::builder("trivy", FindingCategory::Vulnerability, title)
                        .severity(Severity::from_label(&vuln.severity))
                        .rule_id(vuln.vulnerability_id)
                        .path(result.target.clone())
                        .evidence(evidence)
                        .build(),
                );
            }
            for misconfig in result.misconfigurations {
                findings.push(
                    NormalizedFinding::builder(
                        "trivy",
                        FindingCategory::Misconfiguration,
                        misconfig.title,
                    )
                    .severity(Severity::from_label(&misconfig.severity))
                    .rule_id(misconfig.id)
                    .path(result.target.clone())
                    .evidence(misconfig.message.unwrap_or_default())
                    .build(),
                );
            }
            for secret in result.secrets {
                findings.push(
                    NormalizedFinding::builder("trivy", FindingCategory::Secret, secret.title)
                        .severity(Severity::from_label(&secret.severity))
                        .rule_id(secret.rule_id)
                        .path(result.target.clone())
                        .line(secret.start_line)
                        .evidence(secret.category.unwrap_or_default())
                        .build(),
                );
            }
        }
        Ok(findings)
    }
}
