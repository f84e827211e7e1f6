//! Built-in scenarios.
//!
//! Each scenario is a unit struct implementing [`Scenario`]. The runner calls
//! `setup` once with VU id 0, `iteration` repeatedly on every load VU, and
//! `teardown` once after the load phase.

mod auth;
mod businesses;
mod chat_model;
mod reports;
mod smoke;
mod users;

pub use auth::AuthScenario;
pub use businesses::BusinessesScenario;
pub use chat_model::ChatModelScenario;
pub use reports::ReportsScenario;
pub use smoke::SmokeScenario;
pub use users::UsersScenario;

use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_error::SetupError;
use gateload_types::ScenarioOptions;
use gateload_types::api::{CreateUserPayload, LoginPayload, ResourceId};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Password used for every user the scenarios create.
pub const SCENARIO_PASSWORD: &str = "password123";

/// Created by setup and read, never mutated, by iterations and teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user_id: ResourceId,
}

#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Built-in VUs, budget and thresholds before config overrides.
    fn options(&self) -> ScenarioOptions;

    /// Whether the JSON summary is written without `--summary-export`.
    fn exports_summary(&self) -> bool {
        false
    }

    async fn setup(&self, _vu: &mut Vu) -> anyhow::Result<Option<Session>> {
        Ok(None)
    }

    async fn iteration(&self, vu: &mut Vu, session: Option<&Session>) -> anyhow::Result<()>;

    async fn teardown(&self, _vu: &mut Vu, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Every scenario in listing order.
pub fn all() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(AuthScenario),
        Arc::new(BusinessesScenario),
        Arc::new(ChatModelScenario),
        Arc::new(ReportsScenario),
        Arc::new(UsersScenario),
        Arc::new(SmokeScenario),
    ]
}

pub fn find(name: &str) -> Option<Arc<dyn Scenario>> {
    all().into_iter().find(|s| s.name() == name)
}

pub(crate) fn load_options(vus: u32, duration: Duration) -> ScenarioOptions {
    ScenarioOptions {
        vus,
        duration_ms: Some(duration.as_millis() as u64),
        ..ScenarioOptions::default()
    }
}

pub(crate) fn require_session(session: Option<&Session>) -> anyhow::Result<&Session> {
    session.ok_or_else(|| anyhow::anyhow!("scenario iteration requires a setup session"))
}

/// Create a dedicated user and log in as it.
///
/// Any failure here is fatal for the run.
pub(crate) async fn provision_user(vu: &mut Vu) -> anyhow::Result<Session> {
    let now = vu.now_unix_ms();
    let login = format!("load_biz_user_{}_{}", vu.id(), now);
    let telegram_id = u64::from(vu.id()) + now + rand::thread_rng().gen_range(0..=10_000);
    let bot_key = vu.config().bot_key.clone();

    let payload = CreateUserPayload::new(telegram_id, &login, SCENARIO_PASSWORD);
    let created = vu
        .request(
            ApiRequest::new(Endpoint::CreateUser)
                .bot_key(bot_key)
                .json(&payload)?,
        )
        .await;
    if created.status != 201 {
        return Err(SetupError::CreateUser {
            status: created.status,
        }
        .into());
    }
    let user_id = created
        .resource_id("id")
        .ok_or_else(|| SetupError::MissingField {
            step: "create user".to_string(),
            field: "id".to_string(),
        })?;
    vu.check_status("User Creation - Status is 201", &created, 201);

    let credentials = LoginPayload {
        login,
        password: SCENARIO_PASSWORD.to_string(),
    };
    let logged_in = vu
        .request(ApiRequest::new(Endpoint::Login).json(&credentials)?)
        .await;
    if logged_in.status != 200 {
        return Err(SetupError::Login {
            status: logged_in.status,
        }
        .into());
    }
    let access_token = logged_in
        .string_field("access_token")
        .ok_or_else(|| SetupError::MissingField {
            step: "login".to_string(),
            field: "access_token".to_string(),
        })?;
    if access_token.is_empty() {
        return Err(SetupError::EmptyToken.into());
    }

    info!(user_id = %user_id, "setup user ready");
    Ok(Session {
        access_token,
        user_id,
    })
}

/// Best-effort removal of the setup user.
pub(crate) async fn remove_user(vu: &mut Vu, session: &Session) {
    let deleted = vu
        .request(
            ApiRequest::new(Endpoint::DeleteUser(session.user_id.clone()))
                .bearer(session.access_token.clone()),
        )
        .await;
    if !(200..300).contains(&deleted.status) {
        warn!(
            user_id = %session.user_id,
            status = deleted.status,
            "teardown could not delete user"
        );
    }
    info!("Cleaned up user with ID: {}", session.user_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_findable() {
        let names: Vec<&str> = all().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["auth", "businesses", "chat-model", "reports", "users", "smoke"]
        );
        for name in names {
            assert_eq!(find(name).map(|s| s.name()), Some(name));
        }
        assert!(find("soak").is_none());
    }

    #[test]
    fn builtin_options_match_scenario_table() {
        let table = [
            ("auth", 10, Some(30_000), None, false),
            ("businesses", 5, Some(30_000), None, true),
            ("chat-model", 10, Some(30_000), None, false),
            ("reports", 5, Some(30_000), None, true),
            ("users", 5, Some(30_000), None, true),
            ("smoke", 1, None, Some(1), false),
        ];
        for (name, vus, duration_ms, iterations, exports) in table {
            let s = find(name).unwrap();
            let opts = s.options();
            assert_eq!(opts.vus, vus, "{name}");
            assert_eq!(opts.duration_ms, duration_ms, "{name}");
            assert_eq!(opts.iterations, iterations, "{name}");
            assert_eq!(s.exports_summary(), exports, "{name}");
            assert!(!s.description().is_empty());
        }
    }

    #[test]
    fn builtin_thresholds_parse() {
        for s in all() {
            gateload_domain::parse_thresholds(&s.options().thresholds)
                .unwrap_or_else(|e| panic!("{}: {e}", s.name()));
        }
    }

    #[test]
    fn missing_session_is_an_error() {
        assert!(require_session(None).is_err());
    }
}
