//! Shared helpers for decoding tool output

use serde::de::DeserializeOwned;

use scanhub_core::domain::ScanError;

/// Decode a single JSON document. Blank output decodes to `None`.
///
/// A document cut at the capture ceiling cannot be repaired, so truncated
/// input that fails to decode is reported as such.
pub fn json_document<T: DeserializeOwned>(
    scanner: &str,
    text: &str,
    truncated: bool,
) -> Result<Option<T>, ScanError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some).map_err(|e| {
        if truncated {
            ScanError::parse(format!(
                "{} output was truncated at the capture limit and is not valid JSON: {}",
                scanner, e
            ))
        } else {
            ScanError::parse(format!("Failed to parse {} JSON output: {}", scanner, e))
        }
    })
}

/// Decode one JSON object per line.
///
/// Lines that do not start with `{` (banners, progress) are skipped. When the
/// stream was truncated the trailing partial line is dropped.
pub fn json_lines<T: DeserializeOwned>(
    scanner: &str,
    text: &str,
    truncated: bool,
) -> Result<Vec<T>, ScanError> {
    complete_lines(text, truncated)
        .enumerate()
        .map(|(index, line)| (index, line.trim()))
        .filter(|(_, line)| line.starts_with('{'))
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                ScanError::parse(format!(
                    "Failed to parse {} output line {}: {}",
                    scanner,
                    index + 1,
                    e
                ))
            })
        })
        .collect()
}

/// Lines of `text`, minus a trailing partial line when `truncated`.
pub fn complete_lines(text: &str, truncated: bool) -> std::str::Lines<'_> {
    let complete = if truncated && !text.ends_with('\n') {
        text.rfind('\n').map_or("", |end| &text[..end])
    } else {
        text
    };
    complete.lines()
}

/// Mask a secret, keeping a short prefix for triage.
pub fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
