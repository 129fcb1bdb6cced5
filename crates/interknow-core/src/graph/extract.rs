//! Best-effort JSON extraction from free-text generator output

use serde_json::Value;

use crate::error::{Error, Result};

/// Extract the first JSON object from a model response
///
/// Tries, in order: the whole text, a fenced ```json block, then the first
/// balanced-brace object found by a string-aware scan.
pub fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Structure("empty model output".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Ok(value);
        }
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            if value.is_object() {
                return Ok(value);
            }
        }
    }

    let candidate = first_balanced_object(trimmed)
        .ok_or_else(|| Error::Structure("no JSON object found in model output".to_string()))?;

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| Error::Structure(format!("invalid JSON object: {}", e)))?;
    Ok(value)
}

/// Contents of the first ``` fenced block, preferring one tagged json
fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body_start = start + "```json".len();
        let end = text[body_start..].find("```")?;
        return Some(text[body_start..body_start + end].trim());
    }

    let start = text.find("```")?;
    let after_fence = start + 3;
    let newline = text[after_fence..].find('\n')?;
    let body_start = after_fence + newline + 1;
    let end = text[body_start..].find("```")?;
    Some(text[body_start..body_start + end].trim())
}

/// Slice of the first `{ ... }` whose braces balance outside string literals
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
