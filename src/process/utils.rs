use serde_json::Value;

/// Render a JSON cell as text without reformatting numbers.
///
/// Strings lose their quotes, numbers keep the digits the provider sent
/// (the crate enables `arbitrary_precision`), null becomes empty.
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// `cell_text` for an optional field, with a fallback when it is absent.
pub fn field_or(v: Option<&Value>, fallback: &str) -> String {
    match v {
        None | Some(Value::Null) => fallback.to_string(),
        Some(v) => cell_text(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_keep_their_digits() {
        let v: Value = serde_json::from_str("0.12345678901234567890").unwrap();
        assert_eq!(cell_text(&v), "0.12345678901234567890");
        assert_eq!(cell_text(&json!("S3")), "S3");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn fallback_for_missing_fields() {
        assert_eq!(field_or(None, "Unknown"), "Unknown");
        assert_eq!(field_or(Some(&json!("eastus")), "Unknown"), "eastus");
    }
}
