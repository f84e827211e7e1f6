use super::{Scenario, Session, load_options, provision_user, remove_user, require_session};
use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_types::ScenarioOptions;
use gateload_types::api::PatchUserPayload;
use std::time::Duration;

/// Read and update traffic against the user routes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsersScenario;

#[async_trait]
impl Scenario for UsersScenario {
    fn name(&self) -> &'static str {
        "users"
    }

    fn description(&self) -> &'static str {
        "list users, fetch the setup user, patch its email"
    }

    fn options(&self) -> ScenarioOptions {
        load_options(5, Duration::from_secs(30))
    }

    fn exports_summary(&self) -> bool {
        true
    }

    async fn setup(&self, vu: &mut Vu) -> anyhow::Result<Option<Session>> {
        provision_user(vu).await.map(Some)
    }

    async fn iteration(&self, vu: &mut Vu, session: Option<&Session>) -> anyhow::Result<()> {
        let session = require_session(session)?;
        let token = &session.access_token;
        let user_id = &session.user_id;

        let listed = vu
            .request(ApiRequest::new(Endpoint::ListUsers).bearer(token.clone()))
            .await;
        vu.check_status("Get all users (200)", &listed, 200);

        let fetched = vu
            .request(ApiRequest::new(Endpoint::GetUser(user_id.clone())).bearer(token.clone()))
            .await;
        vu.check_status("Get user by ID (200)", &fetched, 200);

        let patch = PatchUserPayload {
            email: format!("loadtest_updated_{}_{}@example.com", vu.id(), vu.iteration()),
        };
        let patched = vu
            .request(
                ApiRequest::new(Endpoint::PatchUser(user_id.clone()))
                    .bearer(token.clone())
                    .json(&patch)?,
            )
            .await;
        vu.check_status("Patch user (200)", &patched, 200);

        Ok(())
    }

    async fn teardown(&self, vu: &mut Vu, session: &Session) -> anyhow::Result<()> {
        remove_user(vu, session).await;
        Ok(())
    }
}
