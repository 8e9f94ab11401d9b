//! Helpers shared by the acceptance checks.

use serde_json::Value;

/// Items of an array field, empty when absent or not an array
pub(crate) fn items<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Whether a field is present and carries content
pub(crate) fn has_content(value: &Value, key: &str) -> bool {
    match value.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

/// Collapse per-item findings into one warning
pub(crate) fn join(findings: Vec<String>) -> Option<String> {
    if findings.is_empty() {
        None
    } else {
        Some(findings.join("; "))
    }
}

/// Check that every item of `array_key` has content in each of `fields`
pub(crate) fn items_have(payload: &Value, array_key: &str, label: &str, fields: &[(&str, &str)]) -> Option<String> {
    let findings = items(payload, array_key)
        .iter()
        .enumerate()
        .flat_map(|(i, item)| {
            fields
                .iter()
                .filter(move |(field, _)| !has_content(item, field))
                .map(move |(_, what)| format!("{} {} missing {}", label, i + 1, what))
        })
        .collect();
    join(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_content() {
        let v = json!({"a": "", "b": " x ", "c": [], "d": {}, "e": 0, "f": null});
        assert!(!has_content(&v, "a"));
        assert!(has_content(&v, "b"));
        assert!(!has_content(&v, "c"));
        assert!(!has_content(&v, "d"));
        assert!(has_content(&v, "e"));
        assert!(!has_content(&v, "f"));
        assert!(!has_content(&v, "missing"));
    }

    #[test]
    fn test_items_have_reports_each_gap() {
        let v = json!({"things": [{"a": "x", "b": ""}, {"a": "", "b": "y"}]});
        assert_eq!(
            items_have(&v, "things", "Thing", &[("a", "an a"), ("b", "a b")]).unwrap(),
            "Thing 1 missing a b; Thing 2 missing an a"
        );
        assert!(items_have(&json!({}), "things", "Thing", &[("a", "an a")]).is_none());
    }
}
