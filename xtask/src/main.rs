use anyhow::Context;
use clap::{Parser, Subcommand};
use gateload_types::{ConfigFile, SummaryReceipt};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

const SUMMARY_SCHEMA_FILE: &str = "gateload.summary.v1.schema.json";
const CONFIG_SCHEMA_FILE: &str = "gateload.config.v1.schema.json";

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for gateload")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for the summary receipt and the config file.
    Schema {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },

    /// Validate exported summaries against the current summary schema.
    Validate {
        /// Summary JSON files, e.g. tests/k6/results/*_summary.json
        #[arg(required = true)]
        summaries: Vec<PathBuf>,
    },

    /// Run the repo checks (fmt, clippy, test, schema).
    Ci,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Schema { out_dir } => cmd_schema(&out_dir),
        Command::Validate { summaries } => cmd_validate(&summaries),
        Command::Ci => cmd_ci(),
    }
}

fn cmd_ci() -> anyhow::Result<()> {
    run("cargo", ["fmt", "--all", "--", "--check"])?;
    run(
        "cargo",
        ["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )?;
    run("cargo", ["test", "--workspace"])?;
    run("cargo", ["run", "-p", "xtask", "--", "schema"])?;
    Ok(())
}

fn run<const N: usize>(bin: &str, args: [&str; N]) -> anyhow::Result<()> {
    let status = std::process::Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("running {bin}"))?;
    if !status.success() {
        anyhow::bail!("{bin} {} failed: {status}", args.join(" "));
    }
    Ok(())
}

fn cmd_schema(out_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;

    write_schema(out_dir, SUMMARY_SCHEMA_FILE, schema_for!(SummaryReceipt))?;
    write_schema(out_dir, CONFIG_SCHEMA_FILE, schema_for!(ConfigFile))?;
    Ok(())
}

fn write_schema<T: serde::Serialize>(out_dir: &Path, name: &str, schema: T) -> anyhow::Result<()> {
    let path = out_dir.join(name);
    let mut json = serde_json::to_vec_pretty(&schema)?;
    json.push(b'\n');
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_validate(summaries: &[PathBuf]) -> anyhow::Result<()> {
    let schema = serde_json::to_value(schema_for!(SummaryReceipt))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("summary schema does not compile: {e}"))?;

    let mut invalid = 0usize;
    for path in summaries {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let instance: serde_json::Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse json {}", path.display()))?;

        let errors: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| format!("{}: {e}", e.instance_path))
            .collect();
        if errors.is_empty() {
            println!("ok      {}", path.display());
        } else {
            invalid += 1;
            println!("invalid {}", path.display());
            for e in errors {
                println!("  {e}");
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} of {} summaries failed validation", summaries.len());
    }
    Ok(())
}
