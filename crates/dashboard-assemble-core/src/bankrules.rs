use serde_json::{Map, Value};

use crate::payload::Payload;

/// Compacts an authoritative bank-rules document into the per-bank shape the
/// dashboard engine reads.
///
/// The input is expected to look like
/// `{"banks": {"<name>": {"models": {"financial": {...}, "non_financial": {...}},
/// "eligibility_notes": "..."}}}`. Each output entry carries
/// `allowFinancial` / `allowNonFinancial` (model `enabled` flags),
/// `minFinancial` / `minNonFinancial` (model `min_dscr`, null when absent),
/// and two optional fields derived from the rule text rather than bank names:
/// `adjustment = "excludeOtherIncome"` when the financial formula or notes
/// mention excluding other income, and `turnoverMultiplier = 1.2` when the
/// non-financial text carries the 20% note.
pub fn derive_bank_rules(full: &Value) -> Value {
    let mut out = Map::new();

    let Some(banks) = full.get("banks").and_then(Value::as_object) else {
        return Value::Object(out);
    };

    for (bank_name, bank) in banks {
        let models = bank.get("models").and_then(Value::as_object);
        let financial = models
            .and_then(|models| models.get("financial"))
            .and_then(Value::as_object);
        let non_financial = models
            .and_then(|models| models.get("non_financial"))
            .and_then(Value::as_object);
        let notes = bank
            .get("eligibility_notes")
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut entry = Map::new();
        entry.insert(
            "allowFinancial".to_string(),
            Value::Bool(model_enabled(financial)),
        );
        entry.insert(
            "allowNonFinancial".to_string(),
            Value::Bool(model_enabled(non_financial)),
        );
        entry.insert("minFinancial".to_string(), min_dscr(financial));
        entry.insert("minNonFinancial".to_string(), min_dscr(non_financial));

        let financial_text = rule_text(financial, notes);
        if financial_text.contains("exclude") && financial_text.contains("other income") {
            entry.insert(
                "adjustment".to_string(),
                Value::String("excludeOtherIncome".to_string()),
            );
        }

        let non_financial_text = rule_text(non_financial, notes);
        if non_financial_text.contains("20%") || non_financial_text.contains("20 %") {
            entry.insert("turnoverMultiplier".to_string(), Value::from(1.2));
        }

        out.insert(bank_name.clone(), Value::Object(entry));
    }

    Value::Object(out)
}

/// Guarantees the payload carries a `bankRules` key. An inline
/// `bankRulesFull` document (or the supplied fallback) is compacted via
/// [`derive_bank_rules`]; the full document itself is never injected and is
/// removed from the payload.
pub fn ensure_bank_rules(payload: &mut Payload, fallback: Option<&Value>) {
    let inline_full = payload.remove("bankRulesFull");

    if payload.contains_key("bankRules") {
        return;
    }

    let derived = match inline_full.as_ref().or(fallback) {
        Some(full) => derive_bank_rules(full),
        None => Value::Object(Map::new()),
    };

    payload.insert("bankRules".to_string(), derived);
}

fn model_enabled(model: Option<&Map<String, Value>>) -> bool {
    model
        .and_then(|model| model.get("enabled"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn min_dscr(model: Option<&Map<String, Value>>) -> Value {
    model
        .and_then(|model| model.get("min_dscr"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn rule_text(model: Option<&Map<String, Value>>, notes: &str) -> String {
    let formula = model
        .and_then(|model| model.get("formula_text"))
        .and_then(Value::as_str)
        .unwrap_or("");
    format!("{formula}\n{notes}").to_lowercase()
}
