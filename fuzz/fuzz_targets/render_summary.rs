#![no_main]

use gateload_app::{TextOptions, github_annotations, render_markdown, render_text};
use gateload_types::SummaryReceipt;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(receipt) = serde_json::from_slice::<SummaryReceipt>(data) {
        let _ = render_markdown(&receipt);
        let _ = render_text(&receipt, &TextOptions::default());
        let _ = github_annotations(&receipt);
    }
});
