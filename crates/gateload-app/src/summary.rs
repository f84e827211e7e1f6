//! End-of-test summary: aggregate samples, apply thresholds, render.

use crate::render::{TextOptions, render_text};
use crate::runner::RunOutcome;
use crate::host_info;
use anyhow::Context;
use gateload_domain::{
    evaluate_thresholds, parse_thresholds, summarize_checks, summarize_samples,
    verdict_from_outcomes,
};
use gateload_types::{RunMeta, SUMMARY_SCHEMA_V1, ScenarioOptions, SummaryReceipt, ToolInfo};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub scenario: String,

    /// Value of `SCENARIO`, used for the report file name.
    pub label: String,
    pub options: ScenarioOptions,
    pub outcome: RunOutcome,

    /// Where the JSON receipt should go, if anywhere.
    pub export_path: Option<PathBuf>,
    pub text: TextOptions,
}

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub receipt: SummaryReceipt,

    /// Text summary for standard output.
    pub stdout: String,

    /// The CLI writes `receipt` here as pretty JSON.
    pub export_path: Option<PathBuf>,
}

pub struct SummaryUseCase {
    tool: ToolInfo,
}

impl SummaryUseCase {
    pub fn new(tool: ToolInfo) -> Self {
        Self { tool }
    }

    pub fn execute(&self, req: SummaryRequest) -> anyhow::Result<SummaryOutcome> {
        let thresholds = parse_thresholds(&req.options.thresholds)
            .with_context(|| format!("invalid thresholds for scenario {}", req.scenario))?;

        let samples = &req.outcome.samples;
        let elapsed = req.outcome.elapsed;
        let outcomes = evaluate_thresholds(&thresholds, samples, elapsed);
        let verdict = verdict_from_outcomes(&outcomes);

        let receipt = SummaryReceipt {
            schema: SUMMARY_SCHEMA_V1.to_string(),
            tool: self.tool.clone(),
            run: RunMeta {
                id: uuid::Uuid::new_v4().to_string(),
                scenario: req.scenario,
                label: req.label.clone(),
                started_at: req.outcome.started_at,
                ended_at: req.outcome.ended_at,
                host: host_info(),
            },
            options: req.options,
            state: req.outcome.state,
            metrics: summarize_samples(samples, elapsed),
            checks: summarize_checks(samples),
            thresholds: outcomes,
            verdict,
        };

        info!("Finished running scenario: {}", req.label);
        if let Some(path) = &req.export_path {
            info!("Report will be saved to: {}", path.display());
        }

        Ok(SummaryOutcome {
            stdout: render_text(&receipt, &req.text),
            receipt,
            export_path: req.export_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateload_types::{
        Metric, MetricSample, MetricSummary, RunState, Tags, ThresholdStatus, VerdictStatus,
    };
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn check(name: &str, endpoint: &str, passed: bool) -> MetricSample {
        let tags: Tags = [
            ("scenario", "default"),
            ("check", name),
            ("name", endpoint),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        MetricSample {
            metric: Metric::Checks,
            value: if passed { 1.0 } else { 0.0 },
            tags,
        }
    }

    fn request(samples: Vec<MetricSample>, thresholds: BTreeMap<String, Vec<String>>) -> SummaryRequest {
        SummaryRequest {
            scenario: "auth".to_string(),
            label: "auth-nightly".to_string(),
            options: ScenarioOptions {
                vus: 1,
                duration_ms: Some(1_000),
                iterations: None,
                graceful_stop_ms: 30_000,
                thresholds,
            },
            outcome: RunOutcome {
                samples,
                started_at: "2024-01-01T00:00:00Z".to_string(),
                ended_at: "2024-01-01T00:00:01Z".to_string(),
                elapsed: Duration::from_secs(1),
                state: RunState {
                    test_run_duration_ms: 1_000,
                    interrupted: false,
                    iterations_complete: 2,
                    iterations_interrupted: 0,
                },
            },
            export_path: Some(PathBuf::from("results/auth-nightly_summary.json")),
            text: TextOptions {
                indent: " ".to_string(),
                colors: false,
            },
        }
    }

    fn use_case() -> SummaryUseCase {
        SummaryUseCase::new(crate::tool_info())
    }

    #[test]
    fn crossed_threshold_fails_the_verdict() {
        let samples = vec![
            check("User Creation - Status is 201", "CreateUser", true),
            check("User Creation - Status is 201", "CreateUser", false),
            check("User Login - Status is 200", "LoginUser", true),
        ];
        let thresholds = gateload_config::thresholds([
            ("checks{scenario:default,name:CreateUser}", &["rate>0.95"]),
            ("checks{scenario:default,name:LoginUser}", &["rate>0.95"]),
        ]);

        let out = use_case().execute(request(samples, thresholds)).unwrap();
        let r = &out.receipt;

        assert_eq!(r.schema, SUMMARY_SCHEMA_V1);
        assert_eq!(r.run.label, "auth-nightly");
        assert_eq!(r.verdict.status, VerdictStatus::Fail);
        assert_eq!(r.verdict.counts.fail, 1);
        assert_eq!(r.verdict.counts.pass, 1);
        assert_eq!(r.checks.len(), 2);
        assert_eq!(
            r.metrics.get(&Metric::Checks),
            Some(&MetricSummary::Rate {
                passes: 2,
                fails: 1,
                rate: 2.0 / 3.0
            })
        );
        assert!(out.stdout.contains("User Creation - Status is 201"));
        assert_eq!(
            out.export_path,
            Some(PathBuf::from("results/auth-nightly_summary.json"))
        );
    }

    #[test]
    fn threshold_without_samples_is_no_data() {
        let thresholds = gateload_config::thresholds([("checks", &["rate==1.0"])]);
        let out = use_case().execute(request(Vec::new(), thresholds)).unwrap();

        assert_eq!(out.receipt.thresholds.len(), 1);
        assert_eq!(out.receipt.thresholds[0].status, ThresholdStatus::NoData);
        assert_eq!(out.receipt.verdict.status, VerdictStatus::Pass);
        assert!(out.receipt.metrics.is_empty());
    }

    #[test]
    fn invalid_threshold_is_an_error() {
        let thresholds = gateload_config::thresholds([("checks", &["rate=>1"])]);
        let err = use_case().execute(request(Vec::new(), thresholds)).unwrap_err();
        assert!(format!("{err:#}").contains("invalid thresholds for scenario auth"));
    }

    #[test]
    fn receipt_serializes_with_schema_tag() {
        let out = use_case()
            .execute(request(vec![check("c", "ListUsers", true)], BTreeMap::new()))
            .unwrap();
        let json = serde_json::to_value(&out.receipt).unwrap();
        assert_eq!(json["schema"], "gateload.summary.v1");
        assert_eq!(json["metrics"]["checks"]["type"], "rate");
        assert_eq!(json["state"]["iterations_complete"], 2);
    }
}
