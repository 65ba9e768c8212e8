mod common;

use costscraper::{
    config::GrafanaSettings,
    fetch::grafana::search_dashboards,
    jobs::{Job, JobContext},
    pipeline,
    sink::SinkTarget,
    Error,
};
use reqwest::Client;
use serde_json::json;
use tempfile::tempdir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn dashboard_links_land_in_dated_csv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(header("authorization", "Bearer glsa_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"title": "Billing, monthly", "uid": "a1", "type": "dash-db", "url": "/d/a1/billing"},
            {"title": "Team", "uid": "f1", "type": "dash-folder", "url": "/dashboards/f/f1"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out = dir.path().to_string_lossy().to_string();
    let base = format!("{}/", server.uri());
    let cfg = common::config(
        &server.uri(),
        &[
            ("GRAFANA_API_URL", base.as_str()),
            ("GRAFANA_API_KEY", "glsa_test"),
            ("OUTPUT_DIR", out.as_str()),
        ],
    );
    let ctx = JobContext::new(&cfg, Client::new(), common::today());

    let outcome = pipeline::run_job(Job::GrafanaDashboardLinks, SinkTarget::Csv, &ctx)
        .await
        .unwrap();
    assert_eq!(outcome.rows, 2);

    let path = outcome.local_path.unwrap();
    assert_eq!(
        path,
        dir.path().join("Grafana/2025/03/09/grafana_dashboard_links.csv")
    );
    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        "Dashboard Name,Type,URL\n\
         \"Billing, monthly\",dash-db,/d/a1/billing\n\
         Team,dash-folder,/dashboards/f/f1\n"
    );
}

#[tokio::test]
async fn search_failure_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .expect(1)
        .mount(&server)
        .await;

    let settings = GrafanaSettings {
        search_url: format!("{}/api/search", server.uri()),
        token: "bad".into(),
    };
    let err = search_dashboards(&Client::new(), &settings, &common::fast_retry())
        .await
        .unwrap_err();
    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid API key");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_grafana_settings_fail_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = common::config(&server.uri(), &[("GRAFANA_API_URL", "http://unused")]);
    let ctx = JobContext::new(&cfg, Client::new(), common::today());
    let err = pipeline::run_job(Job::GrafanaDashboards, SinkTarget::Csv, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}
