use super::{Scenario, Session, load_options, provision_user, remove_user, require_session};
use crate::vu::Vu;
use async_trait::async_trait;
use gateload_client::{ApiRequest, Endpoint};
use gateload_types::ScenarioOptions;
use gateload_types::api::ChatPayload;
use std::time::Duration;

/// Model responses are slow; this route gets its own timeout.
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Default, Clone, Copy)]
pub struct ChatModelScenario;

#[async_trait]
impl Scenario for ChatModelScenario {
    fn name(&self) -> &'static str {
        "chat-model"
    }

    fn description(&self) -> &'static str {
        "ask the chat model a question per iteration"
    }

    fn options(&self) -> ScenarioOptions {
        load_options(10, Duration::from_secs(30))
    }

    async fn setup(&self, vu: &mut Vu) -> anyhow::Result<Option<Session>> {
        provision_user(vu).await.map(Some)
    }

    async fn iteration(&self, vu: &mut Vu, session: Option<&Session>) -> anyhow::Result<()> {
        let session = require_session(session)?;
        let question = ChatPayload::question(format!(
            "Случайный вопрос от VU {} итерация {}: что такое A/B тестирование?",
            vu.id(),
            vu.iteration()
        ));

        let answered = vu
            .request(
                ApiRequest::new(Endpoint::GenerateResponse)
                    .bearer(session.access_token.clone())
                    .timeout(CHAT_TIMEOUT)
                    .json(&question)?,
            )
            .await;
        vu.check_status("Chat model responded successfully (200)", &answered, 200);

        Ok(())
    }

    async fn teardown(&self, vu: &mut Vu, session: &Session) -> anyhow::Result<()> {
        remove_user(vu, session).await;
        Ok(())
    }
}
