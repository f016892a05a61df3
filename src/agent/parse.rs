//! JSON extraction from model responses.

use std::sync::OnceLock;

use regex::Regex;

/// Extract a single JSON object from a model response.
///
/// Three fallbacks, first match wins: a fenced code block, the entire
/// trimmed response, then the first brace-balanced substring. Only objects
/// count; a bare array or scalar is not a valid step.
pub(crate) fn extract_json(text: &str) -> Option<serde_json::Value> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
    });

    if let Some(block) = fence.captures(text).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(block.as_str()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(candidate) = balanced_object(text) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    None
}

/// Find the first brace-balanced substring, honoring string literals and
/// escapes so braces inside strings do not throw off the depth count.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
