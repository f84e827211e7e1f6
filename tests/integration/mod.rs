//! End-to-end runs of the built-in scenarios against a fake gateway.

mod support;

use gateload_types::{
    CheckSummary, ConfigFile, Metric, MetricSummary, SETUP_GROUP, ThresholdStatus, VerdictStatus,
};
use serde_json::json;
use support::{BOT_KEY, TOKEN, USER_ID, budget, mount_accounts, mount_user_delete, run};
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn check<'a>(checks: &'a [CheckSummary], name: &str) -> &'a CheckSummary {
    checks
        .iter()
        .find(|c| c.name == name && c.group.is_none())
        .unwrap_or_else(|| panic!("no check named {name:?} in {checks:?}"))
}

fn counter(summary: Option<&MetricSummary>) -> f64 {
    match summary {
        Some(MetricSummary::Counter { count, .. }) => *count,
        other => panic!("expected a counter, got {other:?}"),
    }
}

#[tokio::test]
async fn businesses_create_fetch_delete_per_iteration() {
    let server = MockServer::start().await;
    mount_accounts(&server, 201, 200).await;
    mount_user_delete(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/users/users/{USER_ID}/businesses")))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(json!({"description": "Business for load test"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": USER_ID,
            "businesses": [{"id": 1}, {"id": 77}]
        })))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/businesses/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 77})))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/businesses/77"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let out = run(&server, "businesses", &ConfigFile::default(), budget(2, 3))
        .await
        .expect("run should succeed");
    let receipt = &out.summary.receipt;

    assert_eq!(receipt.verdict.status, VerdictStatus::Pass);
    assert_eq!(receipt.state.iterations_complete, 3);
    assert_eq!(receipt.state.iterations_interrupted, 0);
    // setup: create + login, 3 per iteration, teardown: delete user
    assert_eq!(counter(receipt.metrics.get(&Metric::HttpReqs)), 12.0);
    assert_eq!(counter(receipt.metrics.get(&Metric::Iterations)), 3.0);

    for name in [
        "Create business (200)",
        "Get business by ID (200)",
        "Delete business (200)",
    ] {
        let c = check(&receipt.checks, name);
        assert_eq!((c.passes, c.fails), (3, 0), "{name}");
    }
    let setup = receipt
        .checks
        .iter()
        .find(|c| c.group.as_deref() == Some(SETUP_GROUP))
        .expect("setup check");
    assert_eq!(setup.name, "User Creation - Status is 201");

    let scenario_tags: std::collections::BTreeSet<_> = out
        .outcome
        .samples
        .iter()
        .filter(|s| s.metric == Metric::Iterations)
        .map(|s| s.tags.get("scenario").cloned())
        .collect();
    assert_eq!(scenario_tags.len(), 1);
    assert!(scenario_tags.contains(&Some("default".to_string())));

    let export = out.summary.export_path.expect("businesses exports a summary");
    assert!(export.ends_with("it_businesses_summary.json"));
}

#[tokio::test]
async fn report_delete_failures_are_recorded_not_fatal() {
    let server = MockServer::start().await;
    mount_accounts(&server, 201, 200).await;
    mount_user_delete(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/users/reports"))
        .and(body_partial_json(json!({"user_id": USER_ID, "customers": 10})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "rep-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/reports/rep-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "rep-1"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/reports/rep-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let out = run(&server, "reports", &ConfigFile::default(), budget(1, 2))
        .await
        .expect("run should succeed");
    let receipt = &out.summary.receipt;

    // No thresholds: failed checks show up in the summary but do not fail the run.
    assert_eq!(receipt.verdict.status, VerdictStatus::Pass);
    assert_eq!(receipt.state.iterations_complete, 2);

    let deleted = check(&receipt.checks, "Delete report (204)");
    assert_eq!((deleted.passes, deleted.fails), (0, 2));
    let created = check(&receipt.checks, "Create report (201)");
    assert_eq!((created.passes, created.fails), (2, 0));

    match receipt.metrics.get(&Metric::HttpReqFailed) {
        Some(MetricSummary::Rate { passes, .. }) => assert_eq!(*passes, 2),
        other => panic!("expected http_req_failed rate, got {other:?}"),
    }
    assert!(out.summary.stdout.contains("↳  0% — ✓ 0 / ✗ 2"));
}

#[tokio::test]
async fn chat_requests_carry_the_session_token() {
    let server = MockServer::start().await;
    mount_accounts(&server, 201, 200).await;
    mount_user_delete(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/models/chat/generate_response"))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(json!({"context": {"history": []}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
        .expect(4)
        .mount(&server)
        .await;

    let out = run(&server, "chat-model", &ConfigFile::default(), budget(2, 4))
        .await
        .expect("run should succeed");

    let c = check(
        &out.summary.receipt.checks,
        "Chat model responded successfully (200)",
    );
    assert_eq!((c.passes, c.fails), (4, 0));
    assert_eq!(out.summary.export_path, None);
}

#[tokio::test]
async fn failed_login_in_setup_aborts_before_load() {
    let server = MockServer::start().await;
    mount_accounts(&server, 201, 401).await;
    mount_user_delete(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/users/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = match run(&server, "users", &ConfigFile::default(), budget(1, 1)).await {
        Ok(_) => panic!("setup should have failed"),
        Err(err) => err,
    };
    let msg = format!("{err:#}");
    assert!(msg.contains("scenario users aborted during setup"), "{msg}");
    assert!(msg.contains("Status: 401"), "{msg}");
}

#[tokio::test]
async fn auth_thresholds_from_config_file_gate_the_verdict() {
    let server = MockServer::start().await;
    mount_accounts(&server, 409, 200).await;

    let dir = tempdir().unwrap();
    let cfg_path = dir.path().join("gateload.toml");
    std::fs::write(
        &cfg_path,
        r#"
[defaults]
graceful_stop = "5s"

[scenario.auth]
vus = 2
iterations = 4

[scenario.auth.thresholds]
"checks{scenario:default,name:CreateUser}" = ["rate>0.95"]
"http_req_duration{name:ListUsers}" = ["p(95)<500"]
"#,
    )
    .unwrap();
    let file = gateload_config::load_config_file(&cfg_path, true).unwrap();

    let out = run(&server, "auth", &file, Default::default())
        .await
        .expect("run should succeed");
    let receipt = &out.summary.receipt;

    assert_eq!(receipt.options.vus, 2);
    assert_eq!(receipt.options.iterations, Some(4));
    assert_eq!(receipt.options.graceful_stop_ms, 5_000);
    assert_eq!(receipt.state.iterations_complete, 4);
    assert_eq!(receipt.verdict.status, VerdictStatus::Fail);

    let by_key = |key: &str| {
        receipt
            .thresholds
            .iter()
            .find(|t| t.key == key)
            .unwrap_or_else(|| panic!("no threshold {key}"))
    };
    let create = by_key("checks{scenario:default,name:CreateUser}");
    assert_eq!(create.status, ThresholdStatus::Fail);
    assert_eq!(create.observed, Some(0.0));
    assert_eq!(
        by_key("http_req_duration{name:ListUsers}").status,
        ThresholdStatus::NoData
    );

    let login = check(&receipt.checks, "User Login - Status is 200");
    assert_eq!((login.passes, login.fails), (4, 0));
}

#[tokio::test]
async fn smoke_stops_early_when_login_fails() {
    let server = MockServer::start().await;
    mount_accounts(&server, 201, 500).await;
    mount_user_delete(&server, 0).await;

    Mock::given(method("POST"))
        .and(path("/models/chat/generate_response"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = run(&server, "smoke", &ConfigFile::default(), Default::default())
        .await
        .expect("run should succeed");
    let receipt = &out.summary.receipt;

    assert_eq!(receipt.verdict.status, VerdictStatus::Fail);
    assert_eq!(receipt.state.iterations_complete, 1);
    assert_eq!(receipt.checks.len(), 2);
    assert_eq!(check(&receipt.checks, "User created (201)").passes, 1);
    assert_eq!(check(&receipt.checks, "Login successful (200)").fails, 1);

    let requests = server.received_requests().await.unwrap_or_default();
    let create = requests
        .iter()
        .find(|r| r.url.path() == "/api/users/users")
        .expect("user creation request");
    assert_eq!(
        create.headers.get("X-Bot-Key").map(|v| v.to_str().unwrap()),
        Some(BOT_KEY)
    );
}
