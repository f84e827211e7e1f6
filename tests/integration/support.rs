//! Fake gateway and run helpers shared by the end-to-end tests.

use gateload_app::{LoadRunner, RunOutcome, SummaryOutcome, SummaryRequest, SummaryUseCase};
use gateload_app::{SystemClock, TextOptions, scenarios, tool_info};
use gateload_client::GatewayClient;
use gateload_config::{
    EnvSnapshot, GatewayOverrides, OptionOverrides, resolve_gateway, resolve_options,
};
use gateload_types::ConfigFile;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOT_KEY: &str = "it-bot-key";
pub const TOKEN: &str = "it-token";
pub const USER_ID: u64 = 42;

/// Create-user and login routes, plus the user delete used by teardown.
pub async fn mount_accounts(server: &MockServer, create_status: u16, login_status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/users/users"))
        .and(header("X-Bot-Key", BOT_KEY))
        .respond_with(ResponseTemplate::new(create_status).set_body_json(json!({"id": USER_ID})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(login_status)
                .set_body_json(json!({"access_token": TOKEN, "token_type": "bearer"})),
        )
        .mount(server)
        .await;
}

pub async fn mount_user_delete(server: &MockServer, expected: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("/api/users/users/{USER_ID}")))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(expected)
        .mount(server)
        .await;
}

pub struct Run {
    pub outcome: RunOutcome,
    pub summary: SummaryOutcome,
}

/// Resolve config the way the CLI does, run the scenario, and summarize it.
pub async fn run(
    server: &MockServer,
    scenario: &str,
    file: &ConfigFile,
    overrides: OptionOverrides,
) -> anyhow::Result<Run> {
    let env = EnvSnapshot::from_lookup(|key| match key {
        "BOT_KEY" => Some(BOT_KEY.to_string()),
        "SCENARIO" => Some(format!("it_{scenario}")),
        _ => None,
    });
    let gateway = resolve_gateway(
        &env,
        file,
        &GatewayOverrides {
            base_url: Some(server.uri()),
            ..GatewayOverrides::default()
        },
    )?;

    let scenario = scenarios::find(scenario)
        .ok_or_else(|| anyhow::anyhow!("no scenario named {scenario}"))?;
    let options = resolve_options(
        scenario.name(),
        scenario.options(),
        file.scenarios.get(scenario.name()),
        &overrides,
        gateway.graceful_stop,
    )?;
    let export_path = scenario.exports_summary().then(|| gateway.summary_path());
    let label = gateway.scenario_label.clone();

    let client = GatewayClient::new(gateway.base_url.clone(), gateway.request_timeout)?;
    let runner = LoadRunner::new(client, gateway, Arc::new(SystemClock));
    let (_stop_tx, stop_rx) = watch::channel(false);
    let outcome = runner
        .execute(Arc::clone(&scenario), &options, stop_rx)
        .await?;

    let summary = SummaryUseCase::new(tool_info()).execute(SummaryRequest {
        scenario: scenario.name().to_string(),
        label,
        options,
        outcome: outcome.clone(),
        export_path,
        text: TextOptions {
            colors: false,
            ..TextOptions::default()
        },
    })?;

    Ok(Run { outcome, summary })
}

pub fn budget(vus: u32, iterations: u64) -> OptionOverrides {
    OptionOverrides {
        vus: Some(vus),
        iterations: Some(iterations),
        ..OptionOverrides::default()
    }
}
