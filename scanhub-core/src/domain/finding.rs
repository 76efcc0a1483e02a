//! Normalized finding model
//!
//! Every adapter maps its tool's native output into [`NormalizedFinding`].
//! The mapping is pure: nothing in this module performs I/O.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::severity::Severity;

/// Broad class of a finding, independent of the tool that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCategory {
    Secret,
    Vulnerability,
    Misconfiguration,
    MalwareSignature,
    Exposure,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::Secret => "secret",
            FindingCategory::Vulnerability => "vulnerability",
            FindingCategory::Misconfiguration => "misconfiguration",
            FindingCategory::MalwareSignature => "malware-signature",
            FindingCategory::Exposure => "exposure",
        }
    }
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a finding was observed. All fields are optional because tools
/// report different subsets (a URL for web scanners, a path and line for
/// repository scanners).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FindingLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// A single security observation in the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFinding {
    pub id: Uuid,
    pub severity: Severity,
    pub category: FindingCategory,
    pub title: String,
    /// Short excerpt supporting the finding. Secret values are redacted by the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Name of the scanner that produced the finding
    pub source_tool: String,
    #[serde(default)]
    pub location: FindingLocation,
    /// Tool-native rule/template/check identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl NormalizedFinding {
    pub fn builder(
        source_tool: impl Into<String>,
        category: FindingCategory,
        title: impl Into<String>,
    ) -> NormalizedFindingBuilder {
        NormalizedFindingBuilder::new(source_tool, category, title)
    }
}

/// Builder for [`NormalizedFinding`]
pub struct NormalizedFindingBuilder {
    finding: NormalizedFinding,
}

impl NormalizedFindingBuilder {
    pub fn new(
        source_tool: impl Into<String>,
        category: FindingCategory,
        title: impl Into<String>,
    ) -> Self {
        Self {
            finding: NormalizedFinding {
                id: Uuid::new_v4(),
                severity: Severity::Info,
                category,
                title: title.into(),
                evidence: None,
                source_tool: source_tool.into(),
                location: FindingLocation::default(),
                rule_id: None,
            },
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.finding.severity = severity;
        self
    }

    /// Attach evidence; blank strings are ignored.
    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        let evidence = evidence.into();
        if !evidence.trim().is_empty() {
            self.finding.evidence = Some(evidence);
        }
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.finding.location.path = Some(path.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.finding.location.url = Some(url.into());
        self
    }

    /// Line numbers are 1-based; zero means "unknown" and is dropped.
    pub fn line(mut self, line: u32) -> Self {
        if line > 0 {
            self.finding.location.line = Some(line);
        }
        self
    }

    pub fn rule_id(mut self, rule_id: impl Into<String>) -> Self {
        let rule_id = rule_id.into();
        if !rule_id.is_empty() {
            self.finding.rule_id = Some(rule_id);
        }
        self
    }

    pub fn build(self) -> NormalizedFinding {
        self.finding
    }
}

/// Sort findings most severe first. The sort is stable, so findings of equal
/// severity keep the order in which adapters reported them.
pub fn sort_by_severity(findings: &mut [NormalizedFinding]) {
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
}
