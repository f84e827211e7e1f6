//! Application layer for gateload.
//!
//! The app layer coordinates the gateway client, the scenarios and domain logic.
//! It does not parse CLI flags and it does not do filesystem I/O.

mod metrics;
mod render;
mod runner;
pub mod scenarios;
mod summary;
mod vu;

pub use metrics::MetricsSink;
pub use render::{TextOptions, github_annotations, render_markdown, render_text};
pub use runner::{LoadRunner, RunOutcome};
pub use scenarios::{Scenario, Session};
pub use summary::{SummaryOutcome, SummaryRequest, SummaryUseCase};
pub use vu::{Exchange, Phase, Vu};

use gateload_types::{HostInfo, ToolInfo};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;

    fn now_unix_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }

    fn now_unix_ms(&self) -> u64 {
        let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        u64::try_from(nanos / 1_000_000).unwrap_or(0)
    }
}

pub fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "gateload".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn host_info() -> HostInfo {
    HostInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_formats_rfc3339() {
        let clock = SystemClock;
        let ts = clock.now_rfc3339();
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z'));
        assert!(clock.now_unix_ms() > 1_600_000_000_000);
    }

    #[test]
    fn tool_info_names_the_binary() {
        let tool = tool_info();
        assert_eq!(tool.name, "gateload");
        assert!(!tool.version.is_empty());
    }
}
