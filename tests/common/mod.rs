#![allow(dead_code)]

use std::{collections::HashMap, path::Path, time::Duration};

use chrono::NaiveDate;
use costscraper::{
    config::{Config, Endpoints},
    retry::{Backoff, RetryPolicy},
};
use serde_json::json;

pub const TEST_KEY_PEM: &str = include_str!("../fixtures/test_key.pem");

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
}

/// Same attempt budget as production, millisecond waits.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        backoff: Backoff::Fixed(Duration::from_millis(5)),
        ..RetryPolicy::fixed()
    }
}

pub fn endpoints(base: &str) -> Endpoints {
    Endpoints {
        azure_login: base.to_string(),
        azure_management: base.to_string(),
        google_apis: base.to_string(),
        google_sheets: base.to_string(),
    }
}

/// Config from literal pairs, with every endpoint pointed at `base`.
pub fn config(base: &str, pairs: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut cfg = Config::from_lookup(|k| map.get(k).cloned());
    cfg.endpoints = endpoints(base);
    cfg
}

/// Write a service-account key whose token endpoint is `{base}/token`.
pub fn write_key_file(dir: &Path, base: &str) -> String {
    let path = dir.join("service_account.json");
    let key = json!({
        "type": "service_account",
        "client_email": "scraper@test-project.iam.gserviceaccount.com",
        "private_key": TEST_KEY_PEM,
        "token_uri": format!("{base}/token"),
    });
    std::fs::write(&path, key.to_string()).unwrap();
    path.to_string_lossy().to_string()
}
