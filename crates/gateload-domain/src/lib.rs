//! Domain logic for gateload.
//!
//! This crate is intentionally I/O-free: it turns recorded samples into
//! end-of-test metrics and applies threshold policy.

mod threshold;

pub use threshold::{
    Aggregation, Comparison, Threshold, ThresholdExpr, ThresholdKey, evaluate_thresholds,
    parse_thresholds, verdict_from_outcomes,
};

use gateload_types::{
    CheckSummary, Metric, MetricKind, MetricSample, MetricSummary, Tags, TrendSummary,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// Linear interpolation between closest ranks, `pct` in `0.0..=100.0`.
///
/// `sorted` must be ascending and non-empty.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pct = pct.clamp(0.0, 100.0);
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Summarize trend values (milliseconds). Returns `None` for an empty slice.
pub fn summarize_trend(values: &[f64]) -> Option<TrendSummary> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let sum: f64 = v.iter().sum();
    Some(TrendSummary {
        avg: sum / v.len() as f64,
        min: v[0],
        med: percentile_sorted(&v, 50.0),
        max: v[v.len() - 1],
        p90: percentile_sorted(&v, 90.0),
        p95: percentile_sorted(&v, 95.0),
    })
}

/// Summarize values of one metric according to its kind.
pub fn summarize_values(kind: MetricKind, values: &[f64], elapsed: Duration) -> Option<MetricSummary> {
    if values.is_empty() {
        return None;
    }
    let summary = match kind {
        MetricKind::Counter => {
            let count: f64 = values.iter().sum();
            let secs = elapsed.as_secs_f64();
            let rate = if secs > 0.0 { count / secs } else { 0.0 };
            MetricSummary::Counter { count, rate }
        }
        MetricKind::Rate => {
            let passes = values.iter().filter(|v| **v != 0.0).count() as u64;
            let fails = values.len() as u64 - passes;
            MetricSummary::Rate {
                passes,
                fails,
                rate: passes as f64 / values.len() as f64,
            }
        }
        MetricKind::Trend => MetricSummary::Trend(summarize_trend(values)?),
        MetricKind::Gauge => {
            let value = values[values.len() - 1];
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            MetricSummary::Gauge { value, min, max }
        }
    };
    Some(summary)
}

/// True when every selector tag is present on the sample with the same value.
pub fn tags_match(tags: &Tags, selector: &Tags) -> bool {
    selector
        .iter()
        .all(|(k, v)| tags.get(k).is_some_and(|actual| actual == v))
}

/// Values of `metric` whose tags satisfy `selector`, in recording order.
pub fn select_values(samples: &[MetricSample], metric: Metric, selector: &Tags) -> Vec<f64> {
    samples
        .iter()
        .filter(|s| s.metric == metric && tags_match(&s.tags, selector))
        .map(|s| s.value)
        .collect()
}

/// Build end-of-test summaries for every metric that received samples.
pub fn summarize_samples(
    samples: &[MetricSample],
    elapsed: Duration,
) -> BTreeMap<Metric, MetricSummary> {
    let mut by_metric: BTreeMap<Metric, Vec<f64>> = BTreeMap::new();
    for s in samples {
        by_metric.entry(s.metric).or_default().push(s.value);
    }

    by_metric
        .into_iter()
        .filter_map(|(metric, values)| {
            summarize_values(metric.kind(), &values, elapsed).map(|summary| (metric, summary))
        })
        .collect()
}

/// Per-check pass/fail counts, ordered by first appearance.
///
/// Check samples carry a `check` tag (the check name) and, for setup/teardown,
/// a `group` tag.
pub fn summarize_checks(samples: &[MetricSample]) -> Vec<CheckSummary> {
    let mut out: Vec<CheckSummary> = Vec::new();

    for s in samples.iter().filter(|s| s.metric == Metric::Checks) {
        let Some(name) = s.tags.get("check") else {
            continue;
        };
        let group = s.tags.get("group").cloned();

        let idx = match out
            .iter()
            .position(|c| &c.name == name && c.group == group)
        {
            Some(idx) => idx,
            None => {
                out.push(CheckSummary {
                    name: name.clone(),
                    group,
                    passes: 0,
                    fails: 0,
                });
                out.len() - 1
            }
        };

        if s.value != 0.0 {
            out[idx].passes += 1;
        } else {
            out[idx].fails += 1;
        }
    }

    out
}
