use super::{SCENARIO_PASSWORD, Scenario, Session, load_options};
use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_config::thresholds;
use gateload_types::ScenarioOptions;
use gateload_types::api::{CreateUserPayload, LoginPayload};
use rand::Rng;
use std::time::Duration;

/// Registration and login under load; every iteration creates a fresh user.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthScenario;

#[async_trait]
impl Scenario for AuthScenario {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn description(&self) -> &'static str {
        "create a unique user then log in with it"
    }

    fn options(&self) -> ScenarioOptions {
        ScenarioOptions {
            thresholds: thresholds([
                ("checks{scenario:default,name:CreateUser}", &["rate>0.95"]),
                ("checks{scenario:default,name:LoginUser}", &["rate>0.95"]),
            ]),
            ..load_options(10, Duration::from_secs(30))
        }
    }

    async fn iteration(&self, vu: &mut Vu, _session: Option<&Session>) -> anyhow::Result<()> {
        let now = vu.now_unix_ms();
        let (suffix, jitter) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..1_000_000u32), rng.gen_range(0..=10_000u64))
        };
        // VU id and iteration keep logins distinct within a run, even on a shared millisecond.
        let login = format!(
            "loadtest_user_{}_{}_{now}_{suffix}",
            vu.id(),
            vu.iteration()
        );
        let telegram_id = u64::from(vu.id()) + vu.iteration() + now + jitter;
        let bot_key = vu.config().bot_key.clone();

        let payload = CreateUserPayload::new(telegram_id, &login, SCENARIO_PASSWORD);
        let created = vu
            .request(
                ApiRequest::new(Endpoint::CreateUser)
                    .bot_key(bot_key)
                    .json(&payload)?,
            )
            .await;
        vu.check_status("User Creation - Status is 201", &created, 201);

        let credentials = LoginPayload {
            login,
            password: SCENARIO_PASSWORD.to_string(),
        };
        let logged_in = vu
            .request(ApiRequest::new(Endpoint::Login).json(&credentials)?)
            .await;
        vu.check_status("User Login - Status is 200", &logged_in, 200);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::LoadRunner;
    use crate::scenarios;
    use crate::tests_support::{FixedClock, gateway_config};
    use gateload_client::GatewayClient;
    use gateload_types::ScenarioOptions;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tokio::sync::watch;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn concurrent_vus_never_share_a_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/users"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "t"})),
            )
            .mount(&server)
            .await;

        // A frozen clock puts every request in the same millisecond.
        let config = gateway_config(&server.uri());
        let client = GatewayClient::new(config.base_url.clone(), config.request_timeout).unwrap();
        let runner = LoadRunner::new(client, config, Arc::new(FixedClock::default()));
        let options = ScenarioOptions {
            vus: 8,
            iterations: Some(200),
            graceful_stop_ms: 30_000,
            ..ScenarioOptions::default()
        };
        let outcome = runner
            .execute(scenarios::find("auth").unwrap(), &options, watch::channel(false).1)
            .await
            .unwrap();
        assert_eq!(outcome.state.iterations_complete, 200);

        let logins: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/users/users")
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["login"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(logins.len(), 200);
        let distinct: BTreeSet<&String> = logins.iter().collect();
        assert_eq!(distinct.len(), logins.len());
        assert!(logins.iter().all(|l| l.starts_with("loadtest_user_")));
    }
}
