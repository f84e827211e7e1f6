use super::{SCENARIO_PASSWORD, Scenario, Session};
use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_config::thresholds;
use gateload_types::ScenarioOptions;
use gateload_types::api::{
    BusinessPayload, ChatPayload, CreateUserPayload, LoginPayload, ReportPayload, ResourceId,
};
use std::time::Duration;
use tracing::{error, info};

const SMOKE_QUESTION: &str = "Кратко расскажи, что такое MVP в бизнесе.";

/// One pass over every route, end to end, with cleanup.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmokeScenario;

#[async_trait]
impl Scenario for SmokeScenario {
    fn name(&self) -> &'static str {
        "smoke"
    }

    fn description(&self) -> &'static str {
        "single pass: user, login, business, report, chat, cleanup"
    }

    fn options(&self) -> ScenarioOptions {
        ScenarioOptions {
            vus: 1,
            iterations: Some(1),
            thresholds: thresholds([("checks", &["rate==1.0"])]),
            ..ScenarioOptions::default()
        }
    }

    async fn iteration(&self, vu: &mut Vu, _session: Option<&Session>) -> anyhow::Result<()> {
        info!("--- Starting Smoke Test ---");
        let now = vu.now_unix_ms();
        let login = format!("smokeuser_{now}");
        let bot_key = vu.config().bot_key.clone();

        let user = CreateUserPayload::new(now, &login, SCENARIO_PASSWORD);
        let created = vu
            .request(
                ApiRequest::new(Endpoint::CreateUser)
                    .bot_key(bot_key)
                    .json(&user)?,
            )
            .await;
        if !vu.check_status("User created (201)", &created, 201) {
            error!(
                "Smoke test failed at User Creation. Status: {}, Body: {}",
                created.status, created.body
            );
            return Ok(());
        }
        let user_id = created.resource_id("id");
        info!("User created with ID: {}", display_id(&user_id));

        let credentials = LoginPayload {
            login,
            password: SCENARIO_PASSWORD.to_string(),
        };
        let logged_in = vu
            .request(ApiRequest::new(Endpoint::Login).json(&credentials)?)
            .await;
        if !vu.check_status("Login successful (200)", &logged_in, 200) {
            error!(
                "Smoke test failed at Login. Status: {}, Body: {}",
                logged_in.status, logged_in.body
            );
            return Ok(());
        }
        let token = logged_in.string_field("access_token").unwrap_or_default();
        info!("Login successful.");

        let mut business_id = None;
        let mut report_id = None;

        if let Some(user_id) = &user_id {
            let business = BusinessPayload {
                name: format!("Smoke Biz {}", vu.now_unix_ms()),
                description: "Smoke test business".to_string(),
            };
            let added = vu
                .request(
                    ApiRequest::new(Endpoint::AddBusiness(user_id.clone()))
                        .bearer(token.clone())
                        .json(&business)?,
                )
                .await;
            vu.check_status("Add Business (200)", &added, 200);
            business_id = added.last_id_in("businesses");
            info!("Business added with ID: {}", display_id(&business_id));

            let report = ReportPayload::sample(
                format!("Smoke Report {}", vu.now_unix_ms()),
                user_id.clone(),
                100,
            );
            let added = vu
                .request(
                    ApiRequest::new(Endpoint::CreateReport)
                        .bearer(token.clone())
                        .json(&report)?,
                )
                .await;
            vu.check_status("Add Report (201)", &added, 201);
            report_id = added.resource_id("id");
            info!("Report added with ID: {}", display_id(&report_id));
        }

        let answered = vu
            .request(
                ApiRequest::new(Endpoint::GenerateResponse)
                    .bearer(token.clone())
                    .json(&ChatPayload::question(SMOKE_QUESTION))?,
            )
            .await;
        vu.check_status("Chat Model (200)", &answered, 200);
        let has_answer = answered
            .string_field("response")
            .is_some_and(|r| !r.is_empty());
        vu.check("Chat Model response not empty", &answered, has_answer);
        info!("Chat Model responded.");

        if let Some(id) = report_id {
            let deleted = vu
                .request(ApiRequest::new(Endpoint::DeleteReport(id)).bearer(token.clone()))
                .await;
            vu.check_status("Delete Report (204)", &deleted, 204);
            info!("Report deleted.");
        }
        if let Some(id) = business_id {
            let deleted = vu
                .request(ApiRequest::new(Endpoint::DeleteBusiness(id)).bearer(token.clone()))
                .await;
            vu.check_status("Delete Business (200)", &deleted, 200);
            info!("Business deleted.");
        }
        if let Some(id) = user_id {
            let deleted = vu
                .request(ApiRequest::new(Endpoint::DeleteUser(id)).bearer(token.clone()))
                .await;
            vu.check_status("Delete User (204)", &deleted, 204);
            info!("User deleted.");
        }

        info!("--- Smoke Test Completed Successfully ---");
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }
}

fn display_id(id: &Option<ResourceId>) -> String {
    id.as_ref()
        .map_or_else(|| "null".to_string(), ToString::to_string)
}
