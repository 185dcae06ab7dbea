use serde_json::Value;

use crate::payload::Payload;

/// Presence and shape checks applied to a payload before assembly. The
/// assembler itself enforces no schema; callers decide which keys matter.
#[derive(Debug, Clone, Default)]
pub struct PayloadChecks {
    pub required: Vec<String>,
    pub non_empty: Vec<String>,
}

/// Returns a list of human-readable issues. An empty list means the payload
/// passed every configured check.
pub fn check_payload(payload: &Payload, checks: &PayloadChecks) -> Vec<String> {
    let mut issues = Vec::new();

    for key in &checks.required {
        if !payload.contains_key(key) {
            issues.push(format!("missing required key: {key}"));
        }
    }

    for key in &checks.non_empty {
        if let Some(value) = payload.get(key) {
            if is_empty_value(value) {
                issues.push(format!("{key} is empty (must contain at least one entry)"));
            }
        }
    }

    issues
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
