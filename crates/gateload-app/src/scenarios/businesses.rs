use super::{Scenario, Session, load_options, provision_user, remove_user, require_session};
use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_types::ScenarioOptions;
use gateload_types::api::BusinessPayload;
use std::time::Duration;

/// Business lifecycle: add, read back, delete.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessesScenario;

#[async_trait]
impl Scenario for BusinessesScenario {
    fn name(&self) -> &'static str {
        "businesses"
    }

    fn description(&self) -> &'static str {
        "add a business to the setup user, fetch it, delete it"
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

        let payload = BusinessPayload {
            name: format!("Load Test Biz {}_{}", vu.id(), vu.iteration()),
            description: "Business for load test".to_string(),
        };
        let added = vu
            .request(
                ApiRequest::new(Endpoint::AddBusiness(session.user_id.clone()))
                    .bearer(token.clone())
                    .json(&payload)?,
            )
            .await;
        vu.check_status("Create business (200)", &added, 200);

        // The response lists all of the user's businesses; the new one is last.
        let Some(business_id) = added.last_id_in("businesses") else {
            return Ok(());
        };

        let fetched = vu
            .request(
                ApiRequest::new(Endpoint::GetBusiness(business_id.clone())).bearer(token.clone()),
            )
            .await;
        vu.check_status("Get business by ID (200)", &fetched, 200);

        let deleted = vu
            .request(ApiRequest::new(Endpoint::DeleteBusiness(business_id)).bearer(token.clone()))
            .await;
        vu.check_status("Delete business (200)", &deleted, 200);

        Ok(())
    }

    async fn teardown(&self, vu: &mut Vu, session: &Session) -> anyhow::Result<()> {
        remove_user(vu, session).await;
        Ok(())
    }
}
