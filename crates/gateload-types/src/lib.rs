//! Shared types for gateload.
//!
//! Design goal: versioned, explicit, boring.
//! These structs are used for summary receipts, Markdown/CI renderings, and the
//! optional config file. Wire payloads for the gateway API live in [`api`].

pub mod api;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SUMMARY_SCHEMA_V1: &str = "gateload.summary.v1";

/// Tag value that marks samples produced by the load phase (as opposed to setup/teardown).
pub const DEFAULT_SCENARIO_TAG: &str = "default";

pub const SETUP_GROUP: &str = "::setup";
pub const TEARDOWN_GROUP: &str = "::teardown";

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunMeta {
    pub id: String,

    /// Scenario that was executed (e.g. `businesses`).
    pub scenario: String,

    /// Label used for the exported file name (`SCENARIO` env, default `default_scenario`).
    pub label: String,

    pub started_at: String,
    pub ended_at: String,
    pub host: HostInfo,
}

/// Resolved execution options of one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct ScenarioOptions {
    pub vus: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Shared iteration budget across all VUs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,

    pub graceful_stop_ms: u64,

    /// Threshold key (`metric` or `metric{tag:value}`) -> expressions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunState {
    pub test_run_duration_ms: u64,

    /// True when the load phase was stopped early (Ctrl+C).
    #[serde(default)]
    pub interrupted: bool,

    /// Completed iterations across all VUs.
    #[serde(default)]
    pub iterations_complete: u64,

    /// Iterations that errored out or were aborted after the graceful stop.
    #[serde(default)]
    pub iterations_interrupted: u64,
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Rate,
    Trend,
    Gauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Built-in metrics recorded by the runner.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Checks,
    DataReceived,
    HttpReqDuration,
    HttpReqFailed,
    HttpReqs,
    IterationDuration,
    Iterations,
    Vus,
    VusMax,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Checks,
        Metric::DataReceived,
        Metric::HttpReqDuration,
        Metric::HttpReqFailed,
        Metric::HttpReqs,
        Metric::IterationDuration,
        Metric::Iterations,
        Metric::Vus,
        Metric::VusMax,
    ];

    pub fn kind(self) -> MetricKind {
        match self {
            Metric::Checks | Metric::HttpReqFailed => MetricKind::Rate,
            Metric::DataReceived | Metric::HttpReqs | Metric::Iterations => MetricKind::Counter,
            Metric::HttpReqDuration | Metric::IterationDuration => MetricKind::Trend,
            Metric::Vus | Metric::VusMax => MetricKind::Gauge,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Checks => "checks",
            Metric::DataReceived => "data_received",
            Metric::HttpReqDuration => "http_req_duration",
            Metric::HttpReqFailed => "http_req_failed",
            Metric::HttpReqs => "http_reqs",
            Metric::IterationDuration => "iteration_duration",
            Metric::Iterations => "iterations",
            Metric::Vus => "vus",
            Metric::VusMax => "vus_max",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn display_unit(self) -> &'static str {
        match self {
            Metric::HttpReqDuration | Metric::IterationDuration => "ms",
            Metric::DataReceived => "B",
            _ => "",
        }
    }
}

/// One observation. Trend values are milliseconds; rate values are 0.0 or 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub metric: Metric,
    pub value: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrendSummary {
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    #[serde(rename = "p(90)")]
    pub p90: f64,
    #[serde(rename = "p(95)")]
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricSummary {
    Counter { count: f64, rate: f64 },
    Rate { passes: u64, fails: u64, rate: f64 },
    Trend(TrendSummary),
    Gauge { value: f64, min: f64, max: f64 },
}

impl MetricSummary {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSummary::Counter { .. } => MetricKind::Counter,
            MetricSummary::Rate { .. } => MetricKind::Rate,
            MetricSummary::Trend(_) => MetricKind::Trend,
            MetricSummary::Gauge { .. } => MetricKind::Gauge,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,

    /// `::setup`, `::teardown`, or absent for the load phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStatus {
    Pass,
    Fail,
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ThresholdOutcome {
    /// Threshold key, e.g. `checks{scenario:default,name:CreateUser}`.
    pub key: String,

    /// Expression as written, e.g. `rate>0.95`.
    pub expression: String,

    pub status: ThresholdStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct VerdictCounts {
    pub pass: u32,
    pub fail: u32,
    pub no_data: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub counts: VerdictCounts,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SummaryReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunMeta,
    pub options: ScenarioOptions,
    pub state: RunState,
    pub metrics: BTreeMap<Metric, MetricSummary>,
    pub checks: Vec<CheckSummary>,
    pub thresholds: Vec<ThresholdOutcome>,
    pub verdict: Verdict,
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default, rename = "scenario")]
    pub scenarios: BTreeMap<String, ScenarioConfigFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DefaultsConfig {
    /// Overrides the `GATEWAY_PORT`-derived base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<String>,

    /// Duration string parseable by humantime, e.g. "30s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graceful_stop: Option<String>,

    /// Default per-request timeout, e.g. "60s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ScenarioConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vus: Option<u32>,

    /// Duration string parseable by humantime, e.g. "2m".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,

    /// Replaces the scenario's built-in thresholds when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<BTreeMap<String, Vec<String>>>,
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn unknown_metric_names_never_resolve(name in "[a-z_]{1,24}") {
            let resolved = Metric::from_name(&name);
            let known = Metric::ALL.iter().any(|m| m.name() == name);
            prop_assert_eq!(resolved.is_some(), known);
        }
    }
}
