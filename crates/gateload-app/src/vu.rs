//! Per-virtual-user execution context.
//!
//! A [`Vu`] sends requests through the shared client, records the built-in HTTP
//! metrics and checks into a local buffer, and flushes that buffer into the
//! shared [`MetricsSink`] once per iteration.

use crate::Clock;
use crate::metrics::MetricsSink;
use gateload_client::{ApiRequest, GatewayClient};
use gateload_config::GatewayConfig;
use gateload_types::api::ResourceId;
use gateload_types::{
    DEFAULT_SCENARIO_TAG, Metric, MetricSample, SETUP_GROUP, TEARDOWN_GROUP, Tags,
};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::warn;

/// Which part of the run a VU is executing; decides the base tags.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Load,
    Teardown,
}

impl Phase {
    fn tags(self) -> Tags {
        let (key, value) = match self {
            Phase::Setup => ("group", SETUP_GROUP),
            Phase::Load => ("scenario", DEFAULT_SCENARIO_TAG),
            Phase::Teardown => ("group", TEARDOWN_GROUP),
        };
        Tags::from([(key.to_string(), value.to_string())])
    }
}

/// Outcome of one request as seen by a scenario.
///
/// Transport failures are folded in with status `0` so scenarios treat them
/// like any other failed check.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub tag: &'static str,
    pub status: u16,
    pub body: String,
    pub error: Option<String>,
}

impl Exchange {
    pub fn json_field(&self, field: &str) -> Option<serde_json::Value> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()?
            .get(field)
            .cloned()
    }

    pub fn resource_id(&self, field: &str) -> Option<ResourceId> {
        ResourceId::from_json(&self.json_field(field)?)
    }

    /// `id` of the last element of the array at `field`.
    pub fn last_id_in(&self, field: &str) -> Option<ResourceId> {
        let items = self.json_field(field)?;
        let last = items.as_array()?.last()?;
        ResourceId::from_json(last.get("id")?)
    }

    pub fn string_field(&self, field: &str) -> Option<String> {
        self.json_field(field)?.as_str().map(str::to_owned)
    }
}

pub struct Vu {
    id: u32,
    iteration: u64,
    base_tags: Tags,
    client: GatewayClient,
    config: Arc<GatewayConfig>,
    clock: Arc<dyn Clock>,
    sink: MetricsSink,
    buffer: Vec<MetricSample>,
}

impl Vu {
    pub fn new(
        id: u32,
        phase: Phase,
        client: GatewayClient,
        config: Arc<GatewayConfig>,
        clock: Arc<dyn Clock>,
        sink: MetricsSink,
    ) -> Self {
        Self {
            id,
            iteration: 0,
            base_tags: phase.tags(),
            client,
            config,
            clock,
            sink,
            buffer: Vec::new(),
        }
    }

    /// 1-based for load VUs, 0 during setup and teardown.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 0-based per VU.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub(crate) fn set_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn now_unix_ms(&self) -> u64 {
        self.clock.now_unix_ms()
    }

    /// Send a request and record `http_reqs`, `http_req_duration`,
    /// `http_req_failed` and `data_received`.
    pub async fn request(&mut self, req: ApiRequest) -> Exchange {
        let tag = req.tag();
        let method = req.endpoint.method().to_string();
        let started = Instant::now();
        let result = self.client.send(req).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let exchange = match result {
            Ok(resp) => Exchange {
                tag,
                status: resp.status,
                body: resp.body,
                error: None,
            },
            Err(err) => {
                warn!(vu = self.id, name = tag, error = %err, "request failed");
                Exchange {
                    tag,
                    status: 0,
                    body: String::new(),
                    error: Some(err.to_string()),
                }
            }
        };

        let mut tags = self.base_tags.clone();
        tags.insert("name".to_string(), tag.to_string());
        tags.insert("method".to_string(), method);
        tags.insert("status".to_string(), exchange.status.to_string());

        let failed = !(200..400).contains(&exchange.status);
        self.push(Metric::HttpReqs, 1.0, tags.clone());
        self.push(Metric::HttpReqDuration, elapsed_ms, tags.clone());
        self.push(Metric::HttpReqFailed, if failed { 1.0 } else { 0.0 }, tags.clone());
        self.push(Metric::DataReceived, exchange.body.len() as f64, tags);

        exchange
    }

    /// Record a named check against `exchange`. Returns `passed`.
    pub fn check(&mut self, name: &str, exchange: &Exchange, passed: bool) -> bool {
        let mut tags = self.base_tags.clone();
        tags.insert("check".to_string(), name.to_string());
        tags.insert("name".to_string(), exchange.tag.to_string());
        self.push(Metric::Checks, if passed { 1.0 } else { 0.0 }, tags);
        passed
    }

    /// Shorthand for the common "status is N" check.
    pub fn check_status(&mut self, name: &str, exchange: &Exchange, expected: u16) -> bool {
        self.check(name, exchange, exchange.status == expected)
    }

    pub(crate) fn record_iteration(&mut self, duration_ms: f64) {
        let tags = self.base_tags.clone();
        self.push(Metric::Iterations, 1.0, tags.clone());
        self.push(Metric::IterationDuration, duration_ms, tags);
    }

    fn push(&mut self, metric: Metric, value: f64, tags: Tags) {
        self.buffer.push(MetricSample {
            metric,
            value,
            tags,
        });
    }

    pub(crate) fn flush(&mut self) {
        self.sink.extend(&mut self.buffer);
    }
}
