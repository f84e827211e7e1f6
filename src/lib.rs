//! Gateload workspace-level test package.
//!
//! This crate only hosts the end-to-end tests in `tests/integration`, which drive
//! the scenarios through the runner and the summary use case against a fake
//! gateway. The functionality lives in the member crates:
//! - `gateload-types`: summary receipt, config file and wire payload types
//! - `gateload-domain`: metric aggregation and thresholds
//! - `gateload-config`: env/TOML/flag resolution
//! - `gateload-client`: HTTP client for the gateway API
//! - `gateload-app`: scenarios, virtual-user runner, summary rendering
//! - `gateload` (gateload-cli): CLI interface
