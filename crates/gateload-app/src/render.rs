// ----------------------------
// Rendering helpers
// ----------------------------

use colored::Colorize;
use gateload_types::{
    CheckSummary, Metric, MetricSummary, SummaryReceipt, ThresholdOutcome, ThresholdStatus,
    TrendSummary, VerdictStatus,
};
use std::fmt::Write as _;

const NAME_WIDTH: usize = 24;

#[derive(Debug, Clone)]
pub struct TextOptions {
    pub indent: String,
    pub colors: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            colors: true,
        }
    }
}

#[derive(Clone, Copy)]
enum Tone {
    Good,
    Bad,
    Muted,
}

fn paint(s: &str, tone: Tone, opts: &TextOptions) -> String {
    if !opts.colors {
        return s.to_string();
    }
    match tone {
        Tone::Good => s.green().to_string(),
        Tone::Bad => s.red().to_string(),
        Tone::Muted => s.dimmed().to_string(),
    }
}

/// Console summary in the familiar load-test layout.
pub fn render_text(receipt: &SummaryReceipt, opts: &TextOptions) -> String {
    let i = opts.indent.as_str();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{i}scenario: {} (label {}), {} VUs, {}",
        receipt.run.scenario,
        receipt.run.label,
        receipt.options.vus,
        budget(receipt)
    );
    let _ = writeln!(
        out,
        "{i}iterations: {} complete, {} interrupted{}",
        receipt.state.iterations_complete,
        receipt.state.iterations_interrupted,
        if receipt.state.interrupted {
            " (stopped early)"
        } else {
            ""
        }
    );

    if !receipt.thresholds.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{i}THRESHOLDS");
        for t in &receipt.thresholds {
            let (mark, tone) = threshold_mark(t.status);
            let _ = writeln!(
                out,
                "{i}  {} {} '{}' {}",
                paint(mark, tone, opts),
                t.key,
                t.expression,
                paint(&observed(t), Tone::Muted, opts)
            );
        }
    }

    if !receipt.checks.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{i}CHECKS");
        for c in &receipt.checks {
            let label = match &c.group {
                Some(g) => format!("{} [{g}]", c.name),
                None => c.name.clone(),
            };
            if c.fails == 0 {
                let _ = writeln!(out, "{i}  {} {label}", paint("✓", Tone::Good, opts));
            } else {
                let _ = writeln!(out, "{i}  {} {label}", paint("✗", Tone::Bad, opts));
                let _ = writeln!(
                    out,
                    "{i}   ↳  {:.0}% — ✓ {} / ✗ {}",
                    check_rate(c) * 100.0,
                    c.passes,
                    c.fails
                );
            }
        }
    }

    if !receipt.metrics.is_empty() {
        out.push('\n');
        for (metric, summary) in &receipt.metrics {
            let name = metric.name();
            let dots = ".".repeat(NAME_WIDTH.saturating_sub(name.len()) + 2);
            let _ = writeln!(
                out,
                "{i}  {name}{}: {}",
                paint(&dots, Tone::Muted, opts),
                format_summary(*metric, summary)
            );
        }
    }

    out
}

pub fn render_markdown(receipt: &SummaryReceipt) -> String {
    let mut out = String::new();

    let header = match receipt.verdict.status {
        VerdictStatus::Pass => "✅ gateload: pass",
        VerdictStatus::Fail => "❌ gateload: fail",
    };
    out.push_str(header);
    out.push_str("\n\n");

    let _ = writeln!(
        out,
        "**Scenario:** `{}` (label `{}`), {} VUs, {}\n",
        receipt.run.scenario,
        receipt.run.label,
        receipt.options.vus,
        budget(receipt)
    );

    if !receipt.thresholds.is_empty() {
        out.push_str("| threshold | expression | observed | status |\n");
        out.push_str("|---|---|---:|---|\n");
        for t in &receipt.thresholds {
            let status = match t.status {
                ThresholdStatus::Pass => "✅",
                ThresholdStatus::Fail => "❌",
                ThresholdStatus::NoData => "➖ no data",
            };
            let _ = writeln!(
                out,
                "| `{}` | `{}` | {} | {} |",
                t.key,
                t.expression,
                t.observed.map(|v| format!("{v:.4}")).unwrap_or_default(),
                status
            );
        }
        out.push('\n');
    }

    if !receipt.checks.is_empty() {
        out.push_str("| check | passes | fails | rate |\n");
        out.push_str("|---|---:|---:|---:|\n");
        for c in &receipt.checks {
            let name = match &c.group {
                Some(g) => format!("{} `{g}`", c.name),
                None => c.name.clone(),
            };
            let _ = writeln!(
                out,
                "| {name} | {} | {} | {:.2}% |",
                c.passes,
                c.fails,
                check_rate(c) * 100.0
            );
        }
        out.push('\n');
    }

    if !receipt.metrics.is_empty() {
        out.push_str("| metric | value |\n");
        out.push_str("|---|---|\n");
        for (metric, summary) in &receipt.metrics {
            let _ = writeln!(
                out,
                "| `{}` | {} |",
                metric.name(),
                format_summary(*metric, summary)
            );
        }
    }

    if !receipt.verdict.reasons.is_empty() {
        out.push_str("\n**Notes:**\n");
        for r in &receipt.verdict.reasons {
            let _ = writeln!(out, "- {r}");
        }
    }

    out
}

/// `::error` workflow commands for crossed thresholds and failing checks.
pub fn github_annotations(receipt: &SummaryReceipt) -> Vec<String> {
    let scenario = &receipt.run.scenario;
    let mut lines = Vec::new();

    for t in &receipt.thresholds {
        if t.status != ThresholdStatus::Fail {
            continue;
        }
        lines.push(format!(
            "::error::gateload {scenario}: threshold {} '{}' crossed ({})",
            t.key,
            t.expression,
            observed(t)
        ));
    }

    for c in receipt.checks.iter().filter(|c| c.fails > 0) {
        lines.push(format!(
            "::error::gateload {scenario}: check '{}' failed {} of {}",
            c.name,
            c.fails,
            c.passes + c.fails
        ));
    }

    lines
}

fn budget(receipt: &SummaryReceipt) -> String {
    match (receipt.options.duration_ms, receipt.options.iterations) {
        (Some(ms), Some(n)) => format!("{} or {n} iterations", format_ms_duration(ms)),
        (Some(ms), None) => format_ms_duration(ms),
        (None, Some(n)) => format!("{n} iterations"),
        (None, None) => "1 iteration".to_string(),
    }
}

fn format_ms_duration(ms: u64) -> String {
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

fn threshold_mark(status: ThresholdStatus) -> (&'static str, Tone) {
    match status {
        ThresholdStatus::Pass => ("✓", Tone::Good),
        ThresholdStatus::Fail => ("✗", Tone::Bad),
        ThresholdStatus::NoData => ("-", Tone::Muted),
    }
}

fn observed(t: &ThresholdOutcome) -> String {
    match t.observed {
        Some(v) => format!("observed {v:.4}"),
        None => "no data".to_string(),
    }
}

fn check_rate(c: &CheckSummary) -> f64 {
    let total = c.passes + c.fails;
    if total == 0 {
        0.0
    } else {
        c.passes as f64 / total as f64
    }
}

fn format_summary(metric: Metric, summary: &MetricSummary) -> String {
    match summary {
        MetricSummary::Counter { count, rate } => match metric {
            Metric::DataReceived => format!("{} {}/s", format_bytes(*count), format_bytes(*rate)),
            _ => format!("{count:.0} {rate:.2}/s"),
        },
        MetricSummary::Rate {
            passes,
            fails,
            rate,
        } => format!("{:.2}% {passes} out of {}", rate * 100.0, passes + fails),
        MetricSummary::Trend(t) => format_trend(t, metric.display_unit()),
        MetricSummary::Gauge { value, min, max } => format!("{value:.0} min={min:.0} max={max:.0}"),
    }
}

fn format_trend(t: &TrendSummary, unit: &str) -> String {
    format!(
        "avg={:.2}{unit} min={:.2}{unit} med={:.2}{unit} max={:.2}{unit} p(90)={:.2}{unit} p(95)={:.2}{unit}",
        t.avg, t.min, t.med, t.max, t.p90, t.p95
    )
}

fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
