//! sqlmap SQL injection tester

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor, Severity,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::complete_lines;
use crate::tools::NETWORK_TARGETS;

static PARAMETER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Parameter:\s*(.+)$").expect("valid regex"));
static FIELD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Type|Title|Payload):\s*(.*)$").expect("valid regex"));

#[derive(Debug, Default)]
struct Technique {
    kind: String,
    title: String,
    payload: String,
}

pub struct SqlmapAdapter {
    descriptor: ScannerDescriptor,
}

impl SqlmapAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("sqlmap", "sqlmap")
            .with_output_format(OutputFormat::Unstructured)
            .with_categories(&[FindingCategory::Vulnerability])
            .with_target_kinds(NETWORK_TARGETS)
            .with_description("Automatic SQL injection detection")
    }
}

impl Default for SqlmapAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn finding(parameter: &str, technique: Technique) -> NormalizedFinding {
    let mut evidence = Vec::new();
    if !technique.title.is_empty() {
        evidence.push(format!("Title: {}", technique.title));
    }
    if !technique.payload.is_empty() {
        evidence.push(format!("Payload: {}", technique.payload));
    }
    NormalizedFinding::builder(
        "sqlmap",
        FindingCategory::Vulnerability,
        format!("SQL injection in parameter {}: {}", parameter, technique.kind),
    )
    .severity(Severity::Critical)
    .evidence(evidence.join("\n"))
    .build()
}

/// Walk the injection summary block:
///
/// ```text
/// Parameter: id (GET)
///     Type: boolean-based blind
///     Title: AND boolean-based blind - WHERE or HAVING clause
///     Payload: id=1 AND 1234=1234
/// ```
fn parse_summary(text: &str, truncated: bool) -> Vec<NormalizedFinding> {
    let mut findings = Vec::new();
    let mut parameter: Option<String> = None;
    let mut current: Option<Technique> = None;

    for line in complete_lines(text, truncated) {
        let line = line.trim();
        if let Some(caps) = PARAMETER_LINE.captures(line) {
            if let (Some(name), Some(technique)) = (&parameter, current.take()) {
                findings.push(finding(name, technique));
            }
            parameter = Some(caps[1].trim().to_string());
            continue;
        }
        let Some(name) = &parameter else {
            continue;
        };
        if line == "---" {
            if let Some(technique) = current.take() {
                findings.push(finding(name, technique));
            }
            parameter = None;
            continue;
        }
        let Some(caps) = FIELD_LINE.captures(line) else {
            continue;
        };
        let value = caps[2].trim().to_string();
        match &caps[1] {
            "Type" => {
                if let Some(technique) = current.take() {
                    findings.push(finding(name, technique));
                }
                current = Some(Technique {
                    kind: value,
                    ..Technique::default()
                });
            }
            "Title" => {
                if let Some(technique) = current.as_mut() {
                    technique.title = value;
                }
            }
            _ => {
                if let Some(technique) = current.as_mut() {
                    technique.payload = value;
                }
            }
        }
    }

    if let (Some(name), Some(technique)) = (&parameter, current) {
        findings.push(finding(name, technique));
    }
    findings
}

#[async_trait]
impl ToolAdapter for SqlmapAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["-u", "--url", "--output-dir", "--batch"])
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let command = base_command(&self.descriptor)
            .arg("-u")
            .arg(ctx.target.as_url())
            .arg("--batch")
            .arg("--output-dir")
            .arg(ctx.work_dir.to_string_lossy())
            .args(self.parameters().render(&ctx.parameters));
        Ok(Invocation::new(command))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        Ok(parse_summary(&output.stdout, output.stdout_truncated))
    }
}
