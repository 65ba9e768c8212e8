use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use super::utils::cell_text;

/// One (time bucket, group) cost figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostRow {
    /// `None` when the query had no time granularity.
    pub date: Option<NaiveDate>,
    /// Group key values, in the order the dimensions were requested.
    pub dimensions: Vec<String>,
    /// Decimal text exactly as the provider sent it.
    pub amount: String,
    pub currency: String,
}

impl CostRow {
    pub fn date_str(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn dimension(&self, i: usize) -> String {
        self.dimensions.get(i).cloned().unwrap_or_default()
    }
}

/// A dashboard from the search API. Any other field is kept by key.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub title: String,
    pub uid: String,
    pub extra: BTreeMap<String, Value>,
}

impl DashboardRow {
    pub fn from_value(v: &Value) -> Self {
        let extra: BTreeMap<String, Value> = v
            .as_object()
            .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        let text = |key: &str| extra.get(key).map(cell_text).unwrap_or_default();
        let title = text("title");
        let uid = text("uid");
        Self { title, uid, extra }
    }

    /// Value for `key`, empty when the dashboard does not carry it.
    pub fn field(&self, key: &str) -> String {
        match key {
            "title" => self.title.clone(),
            "uid" => self.uid.clone(),
            other => self.extra.get(other).map(cell_text).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub subscription_id: String,
    pub name: String,
    pub kind: String,
    pub location: String,
}

/// Monthly total of one usage metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    /// `YYYY-MM`
    pub month: String,
    pub total: String,
}
