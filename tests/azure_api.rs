mod common;

use costscraper::{
    auth,
    config::AzureSettings,
    fetch::{AzureClient, CostType},
    jobs::{Job, JobContext},
    pipeline,
    query::{CostQuery, DateWindow, Granularity},
    sink::SinkTarget,
    Error,
};
use reqwest::Client;
use serde_json::json;
use tempfile::tempdir;
use wiremock::{
    matchers::{body_string_contains, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const COST_PATH: &str = "/subscriptions/sub-1/providers/Microsoft.CostManagement/query";

fn settings() -> AzureSettings {
    AzureSettings {
        client_id: "client".into(),
        client_secret: "secret".into(),
        tenant_id: "tenant".into(),
        subscription_ids: vec!["sub-1".into()],
    }
}

fn query() -> CostQuery {
    CostQuery::new(
        DateWindow::trailing_days(common::today(), 7),
        Granularity::Daily,
        "PreTaxCost",
    )
    .group_by("ServiceName")
}

fn cost_page() -> serde_json::Value {
    json!({
        "properties": {
            "nextLink": null,
            "columns": [
                {"name": "PreTaxCost", "type": "Number"},
                {"name": "UsageDate", "type": "Number"},
                {"name": "ServiceName", "type": "String"},
                {"name": "Currency", "type": "String"}
            ],
            "rows": [
                [0.000123456789, 20250305, "Storage", "USD"],
                [12.5, 20250306, "Azure Cognitive Services", "USD"]
            ]
        }
    })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "az-token", "expires_in": 3599})),
        )
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> AzureClient {
    AzureClient::new(
        Client::new(),
        &common::endpoints(&server.uri()),
        "az-token".into(),
    )
    .with_retry(common::fast_retry())
}

#[tokio::test]
async fn token_exchange_returns_bearer() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let token = auth::azure::fetch_token(
        &Client::new(),
        &common::endpoints(&server.uri()),
        &settings(),
    )
    .await
    .unwrap();
    assert_eq!(token, "az-token");
}

#[tokio::test]
async fn token_rejection_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let err = auth::azure::fetch_token(
        &Client::new(),
        &common::endpoints(&server.uri()),
        &settings(),
    )
    .await
    .unwrap_err();
    match err {
        Error::Auth { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid_client");
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limited_query_is_resubmitted_until_it_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COST_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COST_PATH))
        .and(query_param("api-version", "2023-03-01"))
        .and(header("authorization", "Bearer az-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cost_page()))
        .mount(&server)
        .await;

    let props = client(&server)
        .query_costs("sub-1", &query(), CostType::Usage)
        .await
        .unwrap();
    assert_eq!(props.rows.len(), 2);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    // identical payload every time
    assert!(requests.windows(2).all(|w| w[0].body == w[1].body));
}

#[tokio::test]
async fn persistent_rate_limit_stops_after_five_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COST_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(5)
        .mount(&server)
        .await;

    let err = client(&server)
        .query_costs("sub-1", &query(), CostType::Usage)
        .await
        .unwrap_err();
    match err {
        Error::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 5),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn other_failures_surface_status_and_body_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COST_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("BadRequest: invalid grouping"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .query_costs("sub-1", &query(), CostType::Usage)
        .await
        .unwrap_err();
    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid grouping"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn next_link_pages_are_appended_in_order() {
    let server = MockServer::start().await;
    let mut first = cost_page();
    first["properties"]["nextLink"] = json!(format!("{}/page-2", server.uri()));
    Mock::given(method("POST"))
        .and(path(COST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"columns": [], "rows": [[1, 20250307, "Compute", "USD"]]}
        })))
        .mount(&server)
        .await;

    let props = client(&server)
        .query_costs("sub-1", &query(), CostType::Usage)
        .await
        .unwrap();
    assert_eq!(props.rows.len(), 3);
    assert_eq!(props.columns.len(), 4);
    assert_eq!(props.rows[2][2], json!("Compute"));
}

#[tokio::test]
async fn cognitive_job_skips_failing_subscription_and_writes_csv() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/sub-ok/providers/Microsoft.CostManagement/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cost_page()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/sub-bad/providers/Microsoft.CostManagement/query"))
        .respond_with(ResponseTemplate::new(403).set_body_string("AuthorizationFailed"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out = dir.path().to_string_lossy().to_string();
    let cfg = common::config(
        &server.uri(),
        &[
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "secret"),
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_SUBSCRIPTION_ID", "sub-ok,sub-bad"),
            ("OUTPUT_DIR", out.as_str()),
        ],
    );
    let ctx = JobContext::new(&cfg, Client::new(), common::today())
        .with_api_retry(common::fast_retry());

    let outcome = pipeline::run_job(Job::AzureCognitiveServices, SinkTarget::Csv, &ctx)
        .await
        .unwrap();
    assert_eq!(outcome.rows, 1);

    let written = std::fs::read_to_string(outcome.local_path.unwrap()).unwrap();
    assert_eq!(
        written,
        "SubscriptionID,PreTaxCost,UsageDate,ServiceName,Currency\n\
         sub-ok,12.5,2025-03-06,Azure Cognitive Services,USD\n"
    );
}

#[tokio::test]
async fn job_writes_nothing_when_every_subscription_fails() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("InternalError"))
        .with_priority(10)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out = dir.path().to_string_lossy().to_string();
    let cfg = common::config(
        &server.uri(),
        &[
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "secret"),
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_SUBSCRIPTION_ID", "sub-a,sub-b"),
            ("OUTPUT_DIR", out.as_str()),
        ],
    );
    let ctx = JobContext::new(&cfg, Client::new(), common::today())
        .with_api_retry(common::fast_retry());

    assert!(pipeline::run_job(Job::AzureCostPerService, SinkTarget::Csv, &ctx)
        .await
        .is_err());
    let path = Job::AzureCostPerService.output_path(dir.path(), common::today());
    assert!(!path.exists());
}
