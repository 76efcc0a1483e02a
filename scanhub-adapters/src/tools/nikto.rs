//! Nikto web server scanner

use async_trait::async_trait;
use serde::Deserialize;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor, Severity,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::json_document;
use crate::tools::NETWORK_TARGETS;

const REPORT_FILE: &str = "nikto_results.json";

/// Nikto writes one object per scanned host, or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NiktoReport {
    Hosts(Vec<NiktoHost>),
    Host(NiktoHost),
}

#[derive(Debug, Deserialize)]
struct NiktoHost {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    vulnerabilities: Vec<NiktoItem>,
}

#[derive(Debug, Deserialize)]
struct NiktoItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    msg: String,
}

pub struct NiktoAdapter {
    descriptor: ScannerDescriptor,
}

impl NiktoAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("nikto", "nikto")
            .with_output_format(OutputFormat::Structured)
            .with_success_exit_codes(&[0, 1])
            .with_categories(&[FindingCategory::Misconfiguration])
            .with_target_kinds(NETWORK_TARGETS)
            .with_description("Web server misconfiguration scanner")
    }
}

impl Default for NiktoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for NiktoAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["-h", "-host", "-o", "-output", "-Format"])
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let report = ctx.work_file(REPORT_FILE);
        let command = base_command(&self.descriptor)
            .arg("-h")
            .arg(ctx.target.as_url())
            .args(["-Format", "json", "-o"])
            .arg(report.to_string_lossy())
            .args(self.parameters().render(&ctx.parameters));
        Ok(Invocation::new(command).with_report(report))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let report = output.require_report("nikto")?;
        let Some(report) = json_document::<NiktoReport>("nikto", report, output.report_truncated)?
        else {
            return Ok(Vec::new());
        };
        let hosts = match report {
            NiktoReport::Hosts(hosts) => hosts,
            NiktoReport::Host(host) => vec![host],
        };

        Ok(hosts
            .into_iter()
            .flat_map(|host| {
                let base = host.host.unwrap_or_default();
                host.vulnerabilities.into_iter().map(move |item| {
                    let mut finding = NormalizedFinding::builder(
                        "nikto",
                        FindingCategory::Misconfiguration,
                        item.msg,
                    )
                    .severity(Severity::Low)
                    .rule_id(item.id.unwrap_or_default());
                    if let Some(path) = item.url {
                        let evidence = match &item.method {
                            Some(method) => format!("{} {}", method, path),
                            None => path.clone(),
                        };
                        finding = finding.evidence(evidence).url(format!("{}{}", base, path));
                    }
                    finding.build()
                })
            })
            .collect())
    }
}
