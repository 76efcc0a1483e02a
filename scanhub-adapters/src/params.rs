//! Rendering user parameters into argv

use scanhub_core::domain::{ScanError, ToolParameter};

/// Turns request parameters into command-line arguments for one tool.
///
/// Value-carrying flags render as `flag value` (lists comma-joined). Switches
/// render only when truthy. Reserved flags are managed by the adapter itself
/// and never taken from the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterRenderer {
    reserved: &'static [&'static str],
    renamed: &'static [(&'static str, &'static str)],
    switches_only: bool,
}

impl ParameterRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(mut self, flags: &'static [&'static str]) -> Self {
        self.reserved = flags;
        self
    }

    pub fn rename(mut self, pairs: &'static [(&'static str, &'static str)]) -> Self {
        self.renamed = pairs;
        self
    }

    /// Only switch flags are passed through; valued flags are dropped.
    pub fn switches_only(mut self) -> Self {
        self.switches_only = true;
        self
    }

    pub fn is_reserved(&self, flag: &str) -> bool {
        self.reserved.contains(&flag)
    }

    /// Reject parameters that could end up as positional arguments.
    pub fn validate(&self, parameters: &[ToolParameter]) -> Result<(), ScanError> {
        for parameter in parameters {
            let flag = parameter.flag.trim();
            if flag.is_empty() || self.is_reserved(flag) {
                continue;
            }
            if !flag.starts_with('-') {
                return Err(ScanError::validation(format!(
                    "Parameter '{}' is not a command-line flag",
                    flag
                )));
            }
            if flag.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(ScanError::validation(format!(
                    "Parameter flag '{}' contains whitespace",
                    flag
                )));
            }
        }
        Ok(())
    }

    pub fn render(&self, parameters: &[ToolParameter]) -> Vec<String> {
        let mut args = Vec::new();
        for parameter in parameters {
            let flag = parameter.flag.trim();
            if flag.is_empty() || self.is_reserved(flag) {
                continue;
            }
            let flag = self
                .renamed
                .iter()
                .find(|(from, _)| *from == flag)
                .map_or(flag, |(_, to)| *to);

            if parameter.requires_value {
                if self.switches_only {
                    continue;
                }
                if let Some(value) = parameter.value_as_arg() {
                    args.push(flag.to_string());
                    args.push(value);
                }
            } else if parameter.is_enabled() {
                args.push(flag.to_string());
            }
        }
        args
    }
}
