use serde_json::Value;

use crate::error::{AssembleError, AssembleResult};
use crate::payload::Payload;

const RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "let",
    "new",
    "null",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Renders the data-injection block for a payload.
///
/// The output format is stable: a leading newline, then one line per payload
/// key in insertion order, each of the form
///
/// ```text
/// {indent}var {key} = {value};
/// ```
///
/// where `{value}` is the compact JSON rendering of the field. An empty
/// payload renders as a single newline. Keys that are not plain JavaScript
/// identifiers (or that collide with a reserved word) have no representation
/// in this syntax and fail with [`AssembleError::Serialization`].
pub fn render_injection(payload: &Payload, indent: usize) -> AssembleResult<String> {
    let pad = " ".repeat(indent);
    let mut block = String::from("\n");

    for (key, value) in payload {
        ensure_identifier(key)?;
        block.push_str(&pad);
        block.push_str("var ");
        block.push_str(key);
        block.push_str(" = ");
        block.push_str(&render_value(value)?);
        block.push_str(";\n");
    }

    Ok(block)
}

fn render_value(value: &Value) -> AssembleResult<String> {
    let serialized = serde_json::to_string(value)
        .map_err(|err| AssembleError::Serialization(format!("cannot render value: {err}")))?;

    // "</" only occurs inside string literals; breaking it keeps a string
    // value from terminating the surrounding <script> element. "<\/" parses
    // back to "</" in both JSON and JavaScript.
    Ok(serialized.replace("</", "<\\/"))
}

fn ensure_identifier(key: &str) -> AssembleResult<()> {
    let mut chars = key.chars();
    let head_ok = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_' || ch == '$');
    let tail_ok = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$');

    if !head_ok || !tail_ok {
        return Err(AssembleError::Serialization(format!(
            "payload key '{key}' is not a valid injection identifier"
        )));
    }

    if RESERVED_WORDS.contains(&key) {
        return Err(AssembleError::Serialization(format!(
            "payload key '{key}' is a reserved word"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_from(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    #[test]
    fn renders_fields_in_insertion_order() {
        let payload = payload_from(json!({"b": 2, "a": 1}));
        let block = render_injection(&payload, 0).unwrap();
        assert_eq!(block, "\nvar b = 2;\nvar a = 1;\n");
    }

    #[test]
    fn empty_payload_renders_bare_newline() {
        let payload = Payload::new();
        assert_eq!(render_injection(&payload, 4).unwrap(), "\n");
    }

    #[test]
    fn indent_prefixes_every_line() {
        let payload = payload_from(json!({"x": true}));
        let block = render_injection(&payload, 2).unwrap();
        assert_eq!(block, "\n  var x = true;\n");
    }

    #[test]
    fn nested_values_render_compact() {
        let payload = payload_from(json!({"rules": {"min": 1.25, "banks": ["A", "B"]}}));
        let block = render_injection(&payload, 0).unwrap();
        assert_eq!(
            block,
            "\nvar rules = {\"min\":1.25,\"banks\":[\"A\",\"B\"]};\n"
        );
    }

    #[test]
    fn script_close_is_broken_in_strings() {
        let payload = payload_from(json!({"note": "</script><script>alert(1)"}));
        let block = render_injection(&payload, 0).unwrap();
        assert!(block.contains("<\\/script>"));
        assert!(!block.contains("</script>"));
    }

    #[test]
    fn invalid_identifier_key_fails() {
        let payload = payload_from(json!({"not-a-key": 1}));
        let err = render_injection(&payload, 0).unwrap_err();
        assert!(matches!(err, AssembleError::Serialization(_)));
    }

    #[test]
    fn reserved_word_key_fails() {
        let payload = payload_from(json!({"class": 1}));
        let err = render_injection(&payload, 0).unwrap_err();
        assert!(matches!(err, AssembleError::Serialization(_)));
    }
}
