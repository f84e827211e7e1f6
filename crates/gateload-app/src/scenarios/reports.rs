use super::{Scenario, Session, load_options, provision_user, remove_user, require_session};
use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_types::ScenarioOptions;
use gateload_types::api::ReportPayload;
use std::time::Duration;

/// Report lifecycle: create, read back, delete.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportsScenario;

#[async_trait]
impl Scenario for ReportsScenario {
    fn name(&self) -> &'static str {
        "reports"
    }

    fn description(&self) -> &'static str {
        "create a report for the setup user, fetch it, delete it"
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

        let report = ReportPayload::sample(
            format!("Load Test Report {}_{}", vu.id(), vu.iteration()),
            session.user_id.clone(),
            100 + vu.iteration(),
        );
        let created = vu
            .request(
                ApiRequest::new(Endpoint::CreateReport)
                    .bearer(token.clone())
                    .json(&report)?,
            )
            .await;
        vu.check_status("Create report (201)", &created, 201);

        let Some(report_id) = created.resource_id("id") else {
            return Ok(());
        };

        let fetched = vu
            .request(ApiRequest::new(Endpoint::GetReport(report_id.clone())).bearer(token.clone()))
            .await;
        vu.check_status("Get report by ID (200)", &fetched, 200);

        let deleted = vu
            .request(ApiRequest::new(Endpoint::DeleteReport(report_id)).bearer(token.clone()))
            .await;
        vu.check_status("Delete report (204)", &deleted, 204);

        Ok(())
    }

    async fn teardown(&self, vu: &mut Vu, session: &Session) -> anyhow::Result<()> {
        remove_user(vu, session).await;
        Ok(())
    }
}
