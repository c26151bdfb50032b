//! Structured result extraction from freeform model output.
//!
//! Models frequently wrap the JSON they were asked for in prose ("Here is the
//! result: {...} Thanks!"). Extraction first tries the whole trimmed text,
//! then locates the object that owns a sentinel key and cuts it out with a
//! brace-depth scan that understands string literals and escapes.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Extract a typed payload from `text`, using `sentinel` to find an embedded object.
///
/// Only the first occurrence of the sentinel key is considered.
pub fn extract_payload<T: DeserializeOwned>(text: &str, sentinel: &str) -> Option<T> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Some(parsed);
    }

    let slice = find_sentinel_object(trimmed, sentinel)?;
    match serde_json::from_str::<T>(slice) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(target: "extract", sentinel = %sentinel, error = %e, "Embedded object did not match expected payload");
            None
        }
    }
}

/// Extract the embedded JSON object owning `sentinel` as an untyped value.
///
/// Whole-text JSON is taken as-is only when the sentinel is a top-level key;
/// otherwise (nested objects, arrays) the sentinel scan decides.
pub fn extract_object(text: &str, sentinel: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.get(sentinel).is_some() {
            return Some(value);
        }
    }
    let slice = find_sentinel_object(trimmed, sentinel)?;
    serde_json::from_str::<Value>(slice)
        .ok()
        .filter(|v| v.get(sentinel).is_some())
}

/// Locate the substring of the object that encloses the first `"sentinel"` key.
pub fn find_sentinel_object<'a>(text: &'a str, sentinel: &str) -> Option<&'a str> {
    let needle = format!("\"{sentinel}\"");
    let key_at = text.find(&needle)?;
    let open = text[..key_at].rfind('{')?;
    let close = matching_brace(text, open)?;
    Some(&text[open..=close])
}

/// Index of the `}` that closes the `{` at `open`, honouring string literals.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[open..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}
