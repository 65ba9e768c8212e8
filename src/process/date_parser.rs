use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// `"2025-01-15"` as returned in AWS `TimePeriod.Start`.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Azure `UsageDate` arrives as the number `20250115`, occasionally as a
/// string of the same digits or as an ISO timestamp.
pub fn parse_usage_date(v: &Value) -> Option<NaiveDate> {
    let raw = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(&raw, "%Y%m%d").ok();
    }
    parse_iso_date(raw.get(..10)?)
}

/// Azure Monitor `timeStamp` (`2025-01-01T00:00:00Z`) → `"2025-01"`.
pub fn month_of_timestamp(s: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.format("%Y-%m").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn usage_date_forms() {
        let want = NaiveDate::from_ymd_opt(2025, 1, 15);
        assert_eq!(parse_usage_date(&json!(20250115)), want);
        assert_eq!(parse_usage_date(&json!("20250115")), want);
        assert_eq!(parse_usage_date(&json!("2025-01-15T00:00:00")), want);
        assert_eq!(parse_usage_date(&json!(null)), None);
    }

    #[test]
    fn monitor_month() {
        assert_eq!(
            month_of_timestamp("2024-11-01T00:00:00Z").as_deref(),
            Some("2024-11")
        );
        assert_eq!(month_of_timestamp("garbage"), None);
    }
}
