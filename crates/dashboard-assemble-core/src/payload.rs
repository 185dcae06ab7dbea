use std::io::{self, Read};
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{AssembleError, AssembleResult};

/// Ordered field mapping parsed from the request JSON. Key order is the
/// document order of the source text and is preserved through injection.
pub type Payload = serde_json::Map<String, Value>;

#[derive(Debug, Clone)]
pub enum PayloadSource {
    File(PathBuf),
    Stdin,
    Inline(String),
}

pub fn load_payload(source: PayloadSource) -> AssembleResult<String> {
    match source {
        PayloadSource::File(path) => std::fs::read_to_string(&path).map_err(|err| {
            AssembleError::InvalidPayload(format!(
                "failed to read payload file '{}': {err}",
                path.display()
            ))
        }),
        PayloadSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(|err| {
                AssembleError::InvalidPayload(format!("failed to read stdin payload: {err}"))
            })?;
            Ok(buffer)
        }
        PayloadSource::Inline(raw) => Ok(raw),
    }
}

/// Unwraps a payload that was pasted inside a Markdown code fence. Anything
/// that is not a complete fence pair passes through untouched (trimmed).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 3 || lines[lines.len() - 1].trim() != "```" {
        return trimmed;
    }

    let start = trimmed.find('\n').map(|idx| idx + 1).unwrap_or(0);
    let end = trimmed.rfind('\n').unwrap_or(trimmed.len());
    trimmed[start..end].trim()
}

pub fn parse_payload(raw: &str) -> AssembleResult<Payload> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(AssembleError::InvalidPayload("payload is empty".to_string()));
    }

    let value: Value = serde_json::from_str(cleaned).map_err(|err| {
        AssembleError::InvalidPayload(format!("payload is not valid JSON: {err}"))
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(AssembleError::InvalidPayload(format!(
            "payload must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_passes_through() {
        let raw = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fences(raw), raw);
    }

    #[test]
    fn parses_object_payload() {
        let payload = parse_payload("{\"noi\": 120000}").unwrap();
        assert_eq!(payload.get("noi").and_then(Value::as_i64), Some(120000));
    }

    #[test]
    fn parses_fenced_payload() {
        let payload = parse_payload("```\n{\"x\": 1}\n```").unwrap();
        assert_eq!(payload.get("x").and_then(Value::as_i64), Some(1));
    }

    #[test]
    fn rejects_non_object_payload() {
        let err = parse_payload("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, AssembleError::InvalidPayload(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_payload("{not json").unwrap_err();
        assert!(matches!(err, AssembleError::InvalidPayload(_)));
    }

    #[test]
    fn rejects_empty_payload_text() {
        let err = parse_payload("   ").unwrap_err();
        assert!(matches!(err, AssembleError::InvalidPayload(_)));
    }

    #[test]
    fn load_missing_file_is_invalid_payload() {
        let err = load_payload(PayloadSource::File(PathBuf::from("/no/such/payload.json")))
            .unwrap_err();
        assert!(matches!(err, AssembleError::InvalidPayload(_)));
    }
}
