#![no_main]

use gateload_domain::{ThresholdExpr, ThresholdKey};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // First line is the key, the rest is the expression.
    let (key, expr) = s.split_once('\n').unwrap_or((s, ""));
    let _ = key.parse::<ThresholdKey>();
    if let Ok(parsed) = expr.parse::<ThresholdExpr>() {
        assert!(parsed.limit.is_finite());
    }
});
