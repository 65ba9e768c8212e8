// src/query.rs

use chrono::{Duration, NaiveDate};

/// Inclusive start, exclusive-by-convention end, both calendar days.
///
/// AWS treats `end` as exclusive; Azure treats it as inclusive. Each
/// fetcher formats the window the way its API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `today - days` .. `today`.
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    /// A single day.
    pub fn day(today: NaiveDate) -> Self {
        Self {
            start: today,
            end: today,
        }
    }

    /// Months approximated as 30 days each.
    pub fn trailing_months(today: NaiveDate, months: i64) -> Self {
        Self::trailing_days(today, 30 * months)
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    /// Azure only: one aggregate over the whole window.
    None,
}

impl Granularity {
    pub fn as_aws(&self) -> &'static str {
        match self {
            Granularity::Daily | Granularity::None => "DAILY",
        }
    }

    pub fn as_azure(&self) -> &'static str {
        match self {
            Granularity::Daily => "Daily",
            Granularity::None => "None",
        }
    }
}

/// Restrict results to the listed values of one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionFilter {
    pub key: String,
    pub values: Vec<String>,
}

/// One cost request: window, bucket size and grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostQuery {
    pub window: DateWindow,
    pub granularity: Granularity,
    /// Dimension names in the order their values appear in each row.
    pub group_by: Vec<String>,
    pub filter: Option<DimensionFilter>,
    pub metric: String,
}

impl CostQuery {
    pub fn new(window: DateWindow, granularity: Granularity, metric: impl Into<String>) -> Self {
        Self {
            window,
            granularity,
            group_by: Vec::new(),
            filter: None,
            metric: metric.into(),
        }
    }

    pub fn group_by(mut self, dimension: impl Into<String>) -> Self {
        self.group_by.push(dimension.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, values: &[&str]) -> Self {
        self.filter = Some(DimensionFilter {
            key: key.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }
}
