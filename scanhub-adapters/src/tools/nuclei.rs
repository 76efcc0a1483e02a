//! Nuclei template scanner

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor, Severity,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::json_lines;
use crate::tools::NETWORK_TARGETS;

pub const DEFAULT_TEMPLATES: &str = "/root/nuclei-templates";

#[derive(Debug, Deserialize)]
struct NucleiEvent {
    #[serde(rename = "template-id", default)]
    template_id: String,
    #[serde(default)]
    info: NucleiInfo,
    #[serde(default)]
    host: Option<String>,
    #[serde(rename = "matched-at", default)]
    matched_at: Option<String>,
    #[serde(rename = "matcher-name", default)]
    matcher_name: Option<String>,
    #[serde(rename = "extracted-results", default)]
    extracted_results: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NucleiInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    severity: String,
    /// A list in current releases, a comma-separated string in older ones
    #[serde(default)]
    tags: serde_json::Value,
}

impl NucleiInfo {
    fn has_tag(&self, wanted: &str) -> bool {
        match &self.tags {
            serde_json::Value::Array(tags) => tags.iter().any(|t| t.as_str() == Some(wanted)),
            serde_json::Value::String(tags) => tags.split(',').any(|t| t.trim() == wanted),
            _ => false,
        }
    }
}

pub struct NucleiAdapter {
    descriptor: ScannerDescriptor,
}

impl NucleiAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("nuclei", "nuclei")
            .with_output_format(OutputFormat::LineDelimited)
            .with_categories(&[
                FindingCategory::Vulnerability,
                FindingCategory::Misconfiguration,
                FindingCategory::Exposure,
            ])
            .with_target_kinds(NETWORK_TARGETS)
            .with_description("Template-based vulnerability scanner")
    }
}

impl Default for NucleiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for NucleiAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["-u", "-target", "-t", "-o", "-output", "-jsonl", "-j"])
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let mut command = base_command(&self.descriptor)
            .arg("-u")
            .arg(ctx.target.as_url())
            .args(["-jsonl", "-no-color", "-silent"]);

        let templates: Vec<String> = ctx
            .parameters
            .iter()
            .filter(|p| p.flag == "-t")
            .flat_map(|p| p.values())
            .collect();
        if templates.is_empty() {
            command = command.args(["-t", DEFAULT_TEMPLATES]);
        } else {
            for template in templates {
                command = command.arg("-t").arg(template);
            }
        }

        Ok(Invocation::new(command.args(self.parameters().render(&ctx.parameters))))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let events: Vec<NucleiEvent> = json_lines("nuclei", &output.stdout, output.stdout_truncated)?;

        Ok(events
            .into_iter()
            .map(|event| {
                let category = if event.info.has_tag("exposure") {
                    FindingCategory::Exposure
                } else if event.info.has_tag("misconfig") {
                    FindingCategory::Misconfiguration
                } else {
                    FindingCategory::Vulnerability
                };
                let title = if event.info.name.is_empty() {
                    event.template_id.clone()
                } else {
                    event.info.name.clone()
                };

                let mut evidence = Vec::new();
                if let Some(matcher) = &event.matcher_name {
                    evidence.push(format!("matcher: {}", matcher));
                }
                if !event.extracted_results.is_empty() {
                    evidence.push(format!("extracted: {}", event.extracted_results.join(", ")));
                }

                let mut finding = NormalizedFinding::builder("nuclei", category, title)
                    .severity(Severity::from_label(&event.info.severity))
                    .rule_id(event.template_id)
                    .evidence(evidence.join("\n"));
                if let Some(url) = event.matched_at.or(event.host) {
                    finding = finding.url(url);
                }
                finding.build()
            })
            .collect())
    }
}
