//! Scanner descriptors, user parameters and selections

use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::domain::finding::FindingCategory;
use crate::domain::target::TargetKind;

/// Shape of the output a scanner produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// A single JSON document
    Structured,
    /// One JSON record per line
    LineDelimited,
    /// Free-form text
    Unstructured,
}

/// Static description of one external scanner.
///
/// Registered once at process start and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerDescriptor {
    pub name: String,
    pub executable: String,
    /// Fixed leading arguments, passed verbatim before anything the adapter
    /// appends, e.g. `["detect"]`
    pub argument_template: Vec<String>,
    pub output_format: OutputFormat,
    pub default_timeout: Duration,
    /// Exit codes that mean "ran to completion". Several scanners exit
    /// non-zero when they found something.
    pub success_exit_codes: Vec<i32>,
    pub categories: Vec<FindingCategory>,
    /// Target kinds the scanner accepts; empty means the target is ignored.
    pub target_kinds: Vec<TargetKind>,
    /// Parameters a request must supply for this scanner
    pub required_parameters: Vec<String>,
    pub description: String,
}

impl ScannerDescriptor {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            argument_template: Vec::new(),
            output_format: OutputFormat::Unstructured,
            default_timeout: Duration::from_secs(3600),
            success_exit_codes: vec![0],
            categories: Vec::new(),
            target_kinds: Vec::new(),
            required_parameters: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_arguments<I, S>(mut self, template: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argument_template = template.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_success_exit_codes(mut self, codes: &[i32]) -> Self {
        self.success_exit_codes = codes.to_vec();
        self
    }

    pub fn with_categories(mut self, categories: &[FindingCategory]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    pub fn with_target_kinds(mut self, kinds: &[TargetKind]) -> Self {
        self.target_kinds = kinds.to_vec();
        self
    }

    pub fn with_required_parameters(mut self, names: &[&str]) -> Self {
        self.required_parameters = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn accepts_exit_code(&self, code: i32) -> bool {
        self.success_exit_codes.contains(&code)
    }

    pub fn accepts_target(&self, kind: TargetKind) -> bool {
        self.target_kinds.is_empty() || self.target_kinds.contains(&kind)
    }
}

/// A single user-supplied command-line parameter for a scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolParameter {
    pub flag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// String, number, boolean or list. Lists render comma-joined.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub requires_value: bool,
}

impl ToolParameter {
    pub fn switch(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            description: None,
            value: serde_json::Value::Bool(true),
            requires_value: false,
        }
    }

    pub fn valued(flag: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            flag: flag.into(),
            description: None,
            value: value.into(),
            requires_value: true,
        }
    }

    /// Render the value as a single argv element. `None` for null values.
    pub fn value_as_arg(&self) -> Option<String> {
        use serde_json::Value;
        match &self.value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            other => Some(other.to_string()),
        }
    }

    /// Values as a list: arrays element-wise, scalars as one item.
    pub fn values(&self) -> Vec<String> {
        use serde_json::Value;
        match &self.value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Null => None,
                    Value::String(_) => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            _ => self.value_as_arg().into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Truthiness used for switch flags.
    pub fn is_enabled(&self) -> bool {
        use serde_json::Value;
        match &self.value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => !s.is_empty() && s != "false",
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

/// One scanner chosen for a job, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerSelection {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl ScannerSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// First parameter with the given flag.
    pub fn parameter(&self, flag: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.flag == flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_rendering() {
        assert_eq!(
            ToolParameter::valued("-rl", 150).value_as_arg().as_deref(),
            Some("150")
        );
        assert_eq!(
            ToolParameter::valued("-tags", json!(["cve", "rce"]))
                .value_as_arg()
                .as_deref(),
            Some("cve,rce")
        );
        assert_eq!(ToolParameter::valued("-x", json!(null)).value_as_arg(), None);
    }

    #[test]
    fn test_values_expands_lists() {
        let p = ToolParameter::valued("-t", json!(["cves/", "", "exposures/"]));
        assert_eq!(p.values(), vec!["cves/".to_string(), "exposures/".to_string()]);
        assert_eq!(ToolParameter::valued("-t", "http/").values(), vec!["http/"]);
    }

    #[test]
    fn test_switch_truthiness() {
        assert!(ToolParameter::switch("--dbs").is_enabled());
        assert!(!ToolParameter::valued("--dbs", false).is_enabled());
        assert!(!ToolParameter::valued("--dbs", "false").is_enabled());
        assert!(!ToolParameter::valued("--dbs", json!(null)).is_enabled());
    }

    #[test]
    fn test_parameter_deserializes_request_shape() {
        let p: ToolParameter = serde_json::from_value(json!({
            "flag": "-severity",
            "value": "high,critical",
            "requiresValue": true
        }))
        .unwrap();
        assert!(p.requires_value);
        assert_eq!(p.value_as_arg().as_deref(), Some("high,critical"));
    }

    #[test]
    fn test_descriptor_exit_codes() {
        let d = ScannerDescriptor::new("gitleaks", "gitleaks").with_success_exit_codes(&[0, 1]);
        assert!(d.accepts_exit_code(1));
        assert!(!d.accepts_exit_code(126));
    }

    #[test]
    fn test_descriptor_target_kinds() {
        let any = ScannerDescriptor::new("lynis", "lynis");
        assert!(any.accepts_target(TargetKind::RepositoryPath));

        let web = ScannerDescriptor::new("wpscan", "wpscan")
            .with_target_kinds(&[TargetKind::Url, TargetKind::Hostname]);
        assert!(!web.accepts_target(TargetKind::RepositoryPath));
    }
}
