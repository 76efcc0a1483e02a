//! WPScan WordPress scanner

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor, Severity,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::json_document;
use crate::tools::NETWORK_TARGETS;

#[derive(Debug, Default, Deserialize)]
struct WpscanReport {
    #[serde(default)]
    interesting_findings: Vec<InterestingFinding>,
    #[serde(default)]
    version: Option<Component>,
    #[serde(default)]
    main_theme: Option<Component>,
    #[serde(default)]
    plugins: BTreeMap<String, Component>,
    #[serde(default)]
    themes: BTreeMap<String, Component>,
}

#[derive(Debug, Deserialize)]
struct InterestingFinding {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    to_s: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    interesting_entries: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Component {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    vulnerabilities: Vec<WpVulnerability>,
}

#[derive(Debug, Deserialize)]
struct WpVulnerability {
    title: String,
    #[serde(default)]
    fixed_in: Option<String>,
}

pub struct WpscanAdapter {
    descriptor: ScannerDescriptor,
}

impl WpscanAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        // 5 means "vulnerabilities found", not a failure
        ScannerDescriptor::new("wpscan", "wpscan")
            .with_output_format(OutputFormat::Structured)
            .with_success_exit_codes(&[0, 5])
            .with_categories(&[FindingCategory::Vulnerability, FindingCategory::Exposure])
            .with_target_kinds(NETWORK_TARGETS)
            .with_description("WordPress vulnerability scanner")
    }
}

impl Default for WpscanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn component_findings(label: &str, component: Component) -> impl Iterator<Item = NormalizedFinding> {
    let name = component
        .slug
        .clone()
        .unwrap_or_else(|| label.to_string());
    let installed = component.number.clone();
    component.vulnerabilities.into_iter().map(move |vuln| {
        let mut evidence = match &installed {
            Some(version) => format!("{} {}", name, version),
            None => name.clone(),
        };
        if let Some(fixed) = &vuln.fixed_in {
            evidence.push_str(&format!(", fixed in {}", fixed));
        }
        NormalizedFinding::builder("wpscan", FindingCategory::Vulnerability, vuln.title)
            .severity(Severity::High)
            .evidence(evidence)
            .build()
    })
}

#[async_trait]
impl ToolAdapter for WpscanAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new()
            .reserve(&["--url", "--format", "-f", "--output", "-o"])
            .rename(&[("--random-agent", "--random-user-agent")])
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let command = base_command(&self.descriptor)
            .arg("--url")
            .arg(ctx.target.as_url())
            .args(["--format", "json", "--no-update", "--no-banner"])
            .args(self.parameters().render(&ctx.parameters));
        Ok(Invocation::new(command))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let Some(report) = json_document::<WpscanReport>("wpscan", &output.stdout, output.stdout_truncated)?
        else {
            return Ok(Vec::new());
        };

        let mut findings: Vec<NormalizedFinding> = report
            .interesting_findings
            .into_iter()
            .map(|item| {
                let mut finding =
                    NormalizedFinding::builder("wpscan", FindingCategory::Exposure, item.to_s)
                        .severity(Severity::Info)
                        .rule_id(item.kind.unwrap_or_default())
                        .evidence(item.interesting_entries.join("\n"));
                if let Some(url) = item.url {
                    finding = finding.url(url);
                }
                finding.build()
            })
            .collect();

        if let Some(version) = report.version {
            findings.extend(component_findings("wordpress", version));
        }
        if let Some(theme) = report.main_theme {
            findings.extend(component_findings("main theme", theme));
        }
        for (name, plugin) in report.plugins {
            findings.extend(component_findings(&name, plugin));
        }
        for (name, theme) in report.themes {
            findings.extend(component_findings(&name, theme));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context;
    use scanhub_core::domain::ToolParameter;

    #[test]
    fn test_random_agent_is_renamed() {
        let params = vec![
            ToolParameter::switch("--random-agent"),
            ToolParameter::valued("--output", "/tmp/x"),
        ];
        let invocation = WpscanAdapter::new()
            .build_invocation(&context("blog.example.com", params), &PreparedSource::default())
            .unwrap();
        assert_eq!(
            invocation.command.args,
            vec![
                "--url",
                "http://blog.example.com",
                "--format",
                "json",
                "--no-update",
                "--no-banner",
                "--random-user-agent"
            ]
        );
    }

    #[test]
    fn test_exit_code_five_is_accepted() {
        let adapter = WpscanAdapter::new();
        let output = ToolOutput {
            exit_code: Some(5),
            ..ToolOutput::default()
        };
        assert!(adapter.accepts_exit(&output));
        assert!(!adapter.accepts_exit(&ToolOutput {
            exit_code: Some(4),
            ..ToolOutput::default()
        }));
    }

    #[test]
    fn test_parse_report() {
        let stdout = r#"{
            "interesting_findings": [
                {"url": "http://blog.example.com/", "to_s": "Headers", "type": "headers",
                 "interesting_entries": ["Server: nginx/1.18.0"]},
                {"url": "http://blog.example.com/xmlrpc.php", "to_s": "XML-RPC seems to be enabled", "type": "xmlrpc",
                 "interesting_entries": []}
            ],
            "version": {"number": "5.8", "vulnerabilities": [
                {"title": "WordPress < 5.8.2 - Expired DST Root CA X3 Certificate", "fixed_in": "5.8.2"}
            ]},
            "main_theme": {"slug": "twentytwentyone", "vulnerabilities": []},
            "plugins": {"contact-form-7": {"slug": "contact-form-7", "number": "5.3.1", "vulnerabilities": [
                {"title": "Contact Form 7 < 5.3.2 - Unrestricted File Upload", "fixed_in": "5.3.2"}
            ]}}
        }"#;
        let findings = WpscanAdapter::new()
            .parse_output(&ToolOutput {
                stdout: stdout.into(),
                exit_code: Some(5),
                ..ToolOutput::default()
            })
            .unwrap();

        assert_eq!(findings.len(), 4);
        assert_eq!(findings[0].category, FindingCategory::Exposure);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].evidence.as_deref(), Some("Server: nginx/1.18.0"));
        assert!(findings[1].evidence.is_none());
        assert_eq!(findings[2].severity, Severity::High);
        assert_eq!(
            findings[2].evidence.as_deref(),
            Some("wordpress 5.8, fixed in 5.8.2")
        );
        assert_eq!(findings[3].evidence.as_deref(), Some("contact-form-7 5.3.1, fixed in 5.3.2"));
    }
}
