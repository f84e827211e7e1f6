#![no_main]

use gateload_config::{OptionOverrides, resolve_options};
use gateload_types::{ConfigFile, ScenarioOptions};
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(cfg) = toml::from_str::<ConfigFile>(s) else {
        return;
    };

    // Whatever the file says, resolution either errors or yields runnable options.
    for (name, scenario) in &cfg.scenarios {
        let builtin = ScenarioOptions {
            vus: 1,
            iterations: Some(1),
            ..ScenarioOptions::default()
        };
        if let Ok(opts) = resolve_options(
            name,
            builtin,
            Some(scenario),
            &OptionOverrides::default(),
            Duration::from_secs(30),
        ) {
            assert!(opts.vus >= 1);
            assert_ne!(opts.iterations, Some(0));
            assert_ne!(opts.duration_ms, Some(0));
        }
    }
});
