//! httpx HTTP prober

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor, Severity,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::json_lines;
use crate::tools::NETWORK_TARGETS;

#[derive(Debug, Deserialize)]
struct HttpxProbe {
    #[serde(default)]
    url: String,
    #[serde(default, alias = "status-code")]
    status_code: Option<u16>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    webserver: Option<String>,
    #[serde(default)]
    tech: Vec<String>,
}

pub struct HttpxAdapter {
    descriptor: ScannerDescriptor,
}

impl HttpxAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("httpx", "httpx")
            .with_output_format(OutputFormat::LineDelimited)
            .with_categories(&[FindingCategory::Exposure])
            .with_target_kinds(NETWORK_TARGETS)
            .with_description("HTTP service prober")
    }
}

impl Default for HttpxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for HttpxAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["-u", "-target", "-l", "-list", "-o", "-output", "-json"])
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        // httpx reads targets from stdin
        let command = base_command(&self.descriptor)
            .args(["-json", "-silent"])
            .args(self.parameters().render(&ctx.parameters))
            .stdin(format!("{}\n", ctx.target.as_url()));
        Ok(Invocation::new(command))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let probes: Vec<HttpxProbe> = json_lines("httpx", &output.stdout, output.stdout_truncated)?;

        Ok(probes
            .into_iter()
            .filter(|probe| !probe.url.is_empty())
            .map(|probe| {
                let title = match probe.status_code {
                    Some(status) => format!("HTTP service at {} [{}]", probe.url, status),
                    None => format!("HTTP service at {}", probe.url),
                };

                let mut evidence = Vec::new();
                if let Some(page_title) = probe.title.as_deref().filter(|t| !t.is_empty()) {
                    evidence.push(format!("title: {}", page_title));
                }
                if let Some(server) = probe.webserver.as_deref().filter(|s| !s.is_empty()) {
                    evidence.push(format!("server: {}", server));
                }
                if !probe.tech.is_empty() {
                    evidence.push(format!("tech: {}", probe.tech.join(", ")));
                }

                NormalizedFinding::builder("httpx", FindingCategory::Exposure, title)
                    .severity(Severity::Info)
                    .url(probe.url)
                    .evidence(evidence.join("\n"))
                    .build()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context;
    use scanhub_core::domain::ToolParameter;

    #[test]
    fn test_target_goes_to_stdin() {
        let params = vec![
            ToolParameter::switch("-title"),
            ToolParameter::valued("-u", "http://evil.test"),
        ];
        let invocation = HttpxAdapter::new()
            .build_invocation(&context("example.com", params), &PreparedSource::default())
            .unwrap();

        assert_eq!(invocation.command.args, vec!["-json", "-silent", "-title"]);
        assert_eq!(invocation.command.stdin.as_deref(), Some("http://example.com\n"));
    }

    #[test]
    fn test_parse_probes() {
        let stdout = concat!(
            r#"{"url":"http://example.com","status_code":200,"title":"Example Domain","webserver":"ECS","tech":["Azure"]}"#,
            "\n",
            r#"{"url":"https://example.com","status-code":301}"#,
            "\n"
        );
        let findings = HttpxAdapter::new()
            .parse_output(&ToolOutput {
                stdout: stdout.into(),
                exit_code: Some(0),
                ..ToolOutput::default()
            })
            .unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].title, "HTTP service at http://example.com [200]");
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].category, FindingCategory::Exposure);
        let evidence = findings[0].evidence.as_deref().unwrap();
        assert!(evidence.contains("Example Domain"));
        assert!(evidence.contains("Azure"));
        assert_eq!(findings[1].location.url.as_deref(), Some("https://example.com"));
        assert!(findings[1].evidence.is_none());
    }
}
