//! Threshold parsing and evaluation.
//!
//! Keys look like `checks` or `checks{scenario:default,name:CreateUser}`;
//! expressions look like `rate>0.95`, `p(95)<500`, or `count>=10`.

use crate::{percentile_sorted, select_values};
use gateload_error::ThresholdError;
use gateload_types::{
    Metric, MetricKind, MetricSample, Tags, ThresholdOutcome, ThresholdStatus, Verdict,
    VerdictCounts, VerdictStatus,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

static EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z]+(?:\(\s*[^)]*\))?)\s*(===|==|!=|<=|>=|<|>)\s*(\S+)\s*$")
        .expect("threshold expression regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdKey {
    pub metric: Metric,
    pub selector: Tags,
}

impl FromStr for ThresholdKey {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ThresholdError::Empty);
        }

        let (name, selector) = match s.split_once('{') {
            None => (s, Tags::new()),
            Some((name, rest)) => {
                let inner = rest
                    .strip_suffix('}')
                    .ok_or_else(|| ThresholdError::MalformedSelector(s.to_string()))?;
                (name.trim(), parse_selector(inner, s)?)
            }
        };

        let metric =
            Metric::from_name(name).ok_or_else(|| ThresholdError::UnknownMetric(name.to_string()))?;

        Ok(ThresholdKey { metric, selector })
    }
}

fn parse_selector(inner: &str, whole: &str) -> Result<Tags, ThresholdError> {
    let mut tags = Tags::new();
    for pair in inner.split(',') {
        let (k, v) = pair
            .split_once(':')
            .ok_or_else(|| ThresholdError::MalformedSelector(whole.to_string()))?;
        let (k, v) = (k.trim(), v.trim());
        if k.is_empty() || v.is_empty() {
            return Err(ThresholdError::MalformedSelector(whole.to_string()));
        }
        tags.insert(k.to_string(), v.to_string());
    }
    Ok(tags)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Aggregation {
    Count,
    Rate,
    Value,
    Avg,
    Min,
    Med,
    Max,
    Percentile(f64),
}

impl Aggregation {
    fn applies_to(self, kind: MetricKind) -> bool {
        match self {
            Aggregation::Count => kind == MetricKind::Counter,
            Aggregation::Rate => matches!(kind, MetricKind::Rate | MetricKind::Counter),
            Aggregation::Value => kind == MetricKind::Gauge,
            Aggregation::Avg
            | Aggregation::Med
            | Aggregation::Percentile(_) => kind == MetricKind::Trend,
            Aggregation::Min | Aggregation::Max => {
                matches!(kind, MetricKind::Trend | MetricKind::Gauge)
            }
        }
    }

    fn label(self) -> String {
        match self {
            Aggregation::Count => "count".to_string(),
            Aggregation::Rate => "rate".to_string(),
            Aggregation::Value => "value".to_string(),
            Aggregation::Avg => "avg".to_string(),
            Aggregation::Min => "min".to_string(),
            Aggregation::Med => "med".to_string(),
            Aggregation::Max => "max".to_string(),
            Aggregation::Percentile(p) => format!("p({p})"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let agg = match s {
            "count" => Aggregation::Count,
            "rate" => Aggregation::Rate,
            "value" => Aggregation::Value,
            "avg" => Aggregation::Avg,
            "min" => Aggregation::Min,
            "med" => Aggregation::Med,
            "max" => Aggregation::Max,
            other => {
                let inner = other
                    .strip_prefix("p(")
                    .and_then(|r| r.strip_suffix(')'))
                    .ok_or_else(|| ThresholdError::UnknownAggregation(other.to_string()))?;
                let pct: f64 = inner
                    .trim()
                    .parse()
                    .map_err(|_| ThresholdError::UnknownAggregation(other.to_string()))?;
                if !(0.0..=100.0).contains(&pct) {
                    return Err(ThresholdError::UnknownAggregation(other.to_string()));
                }
                Aggregation::Percentile(pct)
            }
        };
        Ok(agg)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    pub fn holds(self, observed: f64, limit: f64) -> bool {
        match self {
            Comparison::Lt => observed < limit,
            Comparison::Le => observed <= limit,
            Comparison::Gt => observed > limit,
            Comparison::Ge => observed >= limit,
            Comparison::Eq => observed == limit,
            Comparison::Ne => observed != limit,
        }
    }
}

impl FromStr for Comparison {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            "==" | "===" => Ok(Comparison::Eq),
            "!=" => Ok(Comparison::Ne),
            other => Err(ThresholdError::MissingOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub limit: f64,
    pub source: String,
}

impl FromStr for ThresholdExpr {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ThresholdError::Empty);
        }

        let caps = EXPR.captures(s).ok_or_else(|| {
            if s.contains(['<', '>', '=', '!']) {
                ThresholdError::UnknownAggregation(s.trim().to_string())
            } else {
                ThresholdError::MissingOperator(s.trim().to_string())
            }
        })?;

        let aggregation: Aggregation = caps[1].parse()?;
        let comparison: Comparison = caps[2].parse()?;
        let limit: f64 = caps[3]
            .parse()
            .map_err(|_| ThresholdError::InvalidValue(caps[3].to_string()))?;
        if !limit.is_finite() {
            return Err(ThresholdError::InvalidValue(caps[3].to_string()));
        }

        Ok(ThresholdExpr {
            aggregation,
            comparison,
            limit,
            source: s.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    /// Key exactly as configured, used in reports.
    pub raw_key: String,
    pub key: ThresholdKey,
    pub exprs: Vec<ThresholdExpr>,
}

/// Parse and validate a threshold map (key -> expressions).
pub fn parse_thresholds(
    map: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<Threshold>, ThresholdError> {
    let mut out = Vec::with_capacity(map.len());
    for (raw_key, exprs) in map {
        let key: ThresholdKey = raw_key.parse()?;
        let exprs = exprs
            .iter()
            .map(|e| e.parse::<ThresholdExpr>())
            .collect::<Result<Vec<_>, _>>()?;

        for e in &exprs {
            if !e.aggregation.applies_to(key.metric.kind()) {
                return Err(ThresholdError::IncompatibleAggregation {
                    metric: key.metric.name().to_string(),
                    kind: key.metric.kind().as_str().to_string(),
                    aggregation: e.aggregation.label(),
                });
            }
        }

        out.push(Threshold {
            raw_key: raw_key.clone(),
            key,
            exprs,
        });
    }
    Ok(out)
}

fn observe(kind: MetricKind, agg: Aggregation, values: &[f64], elapsed: Duration) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let v = match agg {
        Aggregation::Count => values.iter().sum(),
        Aggregation::Rate if kind == MetricKind::Counter => {
            let secs = elapsed.as_secs_f64();
            if secs > 0.0 {
                values.iter().sum::<f64>() / secs
            } else {
                0.0
            }
        }
        Aggregation::Rate => {
            values.iter().filter(|v| **v != 0.0).count() as f64 / values.len() as f64
        }
        Aggregation::Value => values[values.len() - 1],
        Aggregation::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Aggregation::Min => sorted[0],
        Aggregation::Max => sorted[sorted.len() - 1],
        Aggregation::Med => percentile_sorted(&sorted, 50.0),
        Aggregation::Percentile(p) => percentile_sorted(&sorted, p),
    };
    Some(v)
}

/// Evaluate thresholds on the end-of-test samples.
///
/// A sub-metric without samples yields [`ThresholdStatus::NoData`] and never fails.
pub fn evaluate_thresholds(
    thresholds: &[Threshold],
    samples: &[MetricSample],
    elapsed: Duration,
) -> Vec<ThresholdOutcome> {
    let mut out = Vec::new();
    for t in thresholds {
        let values = select_values(samples, t.key.metric, &t.key.selector);
        for e in &t.exprs {
            let observed = observe(t.key.metric.kind(), e.aggregation, &values, elapsed);
            let status = match observed {
                None => ThresholdStatus::NoData,
                Some(v) if e.comparison.holds(v, e.limit) => ThresholdStatus::Pass,
                Some(_) => ThresholdStatus::Fail,
            };
            out.push(ThresholdOutcome {
                key: t.raw_key.clone(),
                expression: e.source.clone(),
                status,
                observed,
            });
        }
    }
    out
}

pub fn verdict_from_outcomes(outcomes: &[ThresholdOutcome]) -> Verdict {
    let mut counts = VerdictCounts::default();
    let mut reasons = Vec::new();

    for o in outcomes {
        match o.status {
            ThresholdStatus::Pass => counts.pass += 1,
            ThresholdStatus::NoData => counts.no_data += 1,
            ThresholdStatus::Fail => {
                counts.fail += 1;
                reasons.push(format!(
                    "threshold {key} {expr} crossed (observed {observed})",
                    key = o.key,
                    expr = o.expression,
                    observed = o
                        .observed
                        .map(|v| format!("{v:.4}"))
                        .unwrap_or_else(|| "n/a".to_string()),
                ));
            }
        }
    }

    let status = if counts.fail > 0 {
        VerdictStatus::Fail
    } else {
        VerdictStatus::Pass
    };

    Verdict {
        status,
        counts,
        reasons,
    }
}
