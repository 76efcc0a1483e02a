//! Lynis host hardening audit

use async_trait::async_trait;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor, Severity,
};

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput, base_command};
use crate::params::ParameterRenderer;
use crate::parsing::complete_lines;

const REPORT_FILE: &str = "lynis-report.dat";
const LOG_FILE: &str = "lynis.log";

pub struct LynisAdapter {
    descriptor: ScannerDescriptor,
}

impl LynisAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    /// Audits the machine the service runs on; the request target is ignored.
    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("lynis", "lynis")
            .with_arguments(["audit", "system"])
            .with_output_format(OutputFormat::Unstructured)
            .with_categories(&[FindingCategory::Misconfiguration])
            .with_description("Host security audit of the scanning machine")
    }
}

impl Default for LynisAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// `warning[]=AUTH-9286|Configure minimum password age|-|-|`
fn parse_entry(value: &str, severity: Severity) -> Option<NormalizedFinding> {
    let mut fields = value.split('|').map(str::trim);
    let test_id = fields.next().unwrap_or_default();
    let text = fields.next().filter(|t| !t.is_empty() && *t != "-")?;
    let details: Vec<&str> = fields.filter(|f| !f.is_empty() && *f != "-").collect();

    Some(
        NormalizedFinding::builder("lynis", FindingCategory::Misconfiguration, text)
            .severity(severity)
            .rule_id(test_id)
            .evidence(details.join(" "))
            .build(),
    )
}

#[async_trait]
impl ToolAdapter for LynisAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["--logfile", "--report-file", "--cronjob"])
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let report = ctx.work_file(REPORT_FILE);
        let command = base_command(&self.descriptor)
            .arg("--cronjob")
            .arg("--logfile")
            .arg(ctx.work_file(LOG_FILE).to_string_lossy())
            .arg("--report-file")
            .arg(report.to_string_lossy())
            .args(self.parameters().render(&ctx.parameters));
        Ok(Invocation::new(command).with_report(report))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        // A clean exit with no report file is a host with nothing to say.
        let report = match output.exit_code {
            Some(0) => output.report_text(),
            _ => output.require_report("lynis")?,
        };
        Ok(complete_lines(report, output.report_truncated)
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                match key.trim() {
                    "warning[]" => parse_entry(value, Severity::Medium),
                    "suggestion[]" => parse_entry(value, Severity::Low),
                    _ => None,
                }
            })
            .collect())
    }
}
