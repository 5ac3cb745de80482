use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionError;

/// Opening (```` ```json ````) and closing (```` ``` ````) fence markers.
static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("fence regex is valid"));

/// Remove every Markdown code-fence marker and trim the result.
///
/// Removal repeats until nothing changes, so stray backticks that line up
/// into a new marker after one pass are removed as well. Applying the
/// function to its own output is a no-op.
pub fn strip_code_fences(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = FENCE_MARKER.replace_all(&current, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

/// Parse a model reply as JSON after stripping code fences.
///
/// Anything other than a bare JSON document (for example an object wrapped
/// in explanatory sentences) is rejected as malformed.
pub fn parse_model_json(text: &str) -> Result<serde_json::Value, ExtractionError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(ExtractionError::MalformedResponse("empty response".into()));
    }
    serde_json::from_str(&cleaned).map_err(|e| ExtractionError::MalformedResponse(e.to_string()))
}
