//! YARA signature matching over a repository or directory

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use scanhub_core::domain::{
    FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScanTarget, ScannerDescriptor,
    Severity, ToolParameter,
};
use scanhub_runner::ProcessRunner;

use crate::adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput};
use crate::params::ParameterRenderer;
use crate::parsing::complete_lines;
use crate::source;

pub const DEFAULT_RULES: &str = "/opt/yara-rules/index.yar";

/// `RuleName [tags] path` or `RuleName path`
static MATCH_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)(?:\s+\[[^\]]*\])?\s+(.+)$").expect("valid regex"));

pub struct YaraAdapter {
    descriptor: ScannerDescriptor,
}

impl YaraAdapter {
    pub fn new() -> Self {
        Self::with_descriptor(Self::default_descriptor())
    }

    pub fn with_descriptor(descriptor: ScannerDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn default_descriptor() -> ScannerDescriptor {
        ScannerDescriptor::new("yara", "yara")
            .with_arguments(["-r", DEFAULT_RULES])
            .with_output_format(OutputFormat::Unstructured)
            .with_categories(&[FindingCategory::MalwareSignature])
            .with_description("Signature matching with YARA rules")
    }
}

impl Default for YaraAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for YaraAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new().reserve(&["repoURL", "gitURL", "-r", "--recursive"])
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

    /// Flags go before the positional rules and directory.
    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        let mut template = self.descriptor.argument_template.iter();
        let mut command = scanhub_runner::CommandSpec::new(&self.descriptor.executable);
        if let Some(first) = template.next() {
            command = command.arg(first);
        }
        let command = command
            .args(self.parameters().render(&ctx.parameters))
            .args(template)
            .arg(source.path_arg()?);
        Ok(Invocation::new(command))
    }

    /// Match lines name a rule and a file; `0x` lines are string matches
    /// (`-s`) belonging to the preceding rule match.
    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        let mut findings: Vec<NormalizedFinding> = Vec::new();
        let mut strings: Vec<String> = Vec::new();

        let flush = |findings: &mut Vec<NormalizedFinding>, strings: &mut Vec<String>| {
            if strings.is_empty() {
                return;
            }
            if let Some(last) = findings.last_mut() {
                last.evidence = Some(strings.join("\n"));
            }
            strings.clear();
        };

        for line in complete_lines(&output.stdout, output.stdout_truncated) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("0x") {
                if !findings.is_empty() {
                    strings.push(line.to_string());
                }
                continue;
            }
            let Some(caps) = MATCH_LINE.captures(line) else {
                continue;
            };
            flush(&mut findings, &mut strings);
            let rule = &caps[1];
            let path = output.relative_path(caps[2].trim());
            findings.push(
                NormalizedFinding::builder(
                    "yara",
                    FindingCategory::MalwareSignature,
                    format!("YARA rule {} matched", rule),
                )
                .severity(Severity::High)
                .rule_id(rule)
                .path(path)
                .build(),
            );
        }
        flush(&mut findings, &mut strings);
        Ok(findings)
    }
}
