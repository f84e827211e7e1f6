use anyhow::Context;
use clap::{Parser, Subcommand};
use gateload_app::{
    LoadRunner, SummaryRequest, SummaryUseCase, SystemClock, TextOptions, github_annotations,
    render_markdown, scenarios, tool_info,
};
use gateload_client::GatewayClient;
use gateload_config::{
    DEFAULT_CONFIG_FILE, EnvSnapshot, GatewayOverrides, OptionOverrides, load_config_file,
    resolve_gateway, resolve_options,
};
use gateload_domain::parse_thresholds;
use gateload_error::ConfigError;
use gateload_types::{ConfigFile, SummaryReceipt, VerdictStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gateload",
    version,
    about = "Load and smoke tests for the gateway API, with CI thresholds"
)]
struct Cli {
    /// Debug logging for gateload crates (overrides RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scenario against the gateway and print its summary.
    Run {
        /// Scenario name (see `gateload list`)
        scenario: String,

        /// Number of virtual users
        #[arg(long)]
        vus: Option<u32>,

        /// Load phase duration (e.g. "30s")
        #[arg(long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,

        /// Total iterations shared by all virtual users
        #[arg(long)]
        iterations: Option<u64>,

        /// Gateway base URL (defaults to http://localhost:$GATEWAY_PORT)
        #[arg(long)]
        base_url: Option<String>,

        /// TOML config file; only an explicitly passed file must exist
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the JSON summary
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Write the JSON summary here, even for scenarios that do not export one
        #[arg(long)]
        summary_export: Option<PathBuf>,

        /// Plain text summary
        #[arg(long, default_value_t = false)]
        no_color: bool,

        /// Grace period for in-flight iterations once the budget is spent (e.g. "30s")
        #[arg(long, value_parser = humantime::parse_duration)]
        graceful_stop: Option<Duration>,
    },

    /// List scenarios with their built-in options.
    List,

    /// Check that the gateway answers on its root route.
    Ping {
        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render a Markdown summary from a JSON summary receipt.
    Md {
        #[arg(long)]
        summary: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Emit GitHub Actions annotations from a JSON summary receipt.
    GithubAnnotations {
        #[arg(long)]
        summary: PathBuf,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Run {
            scenario,
            vus,
            duration,
            iterations,
            base_url,
            config,
            results_dir,
            summary_export,
            no_color,
            graceful_stop,
        } => run_scenario(RunArgs {
            scenario,
            options: OptionOverrides {
                vus,
                duration,
                iterations,
            },
            gateway: GatewayOverrides {
                base_url,
                results_dir,
                graceful_stop,
            },
            config,
            summary_export,
            colors: !no_color,
        }),

        Command::List => {
            for s in scenarios::all() {
                let opts = s.options();
                let budget = match (opts.iterations, opts.duration_ms) {
                    (Some(n), _) => format!("{n} iteration(s)"),
                    (None, Some(ms)) => {
                        humantime::format_duration(Duration::from_millis(ms)).to_string()
                    }
                    (None, None) => "1 iteration(s)".to_string(),
                };
                println!(
                    "{:<12} {:>3} vus  {:<14} {}",
                    s.name(),
                    opts.vus,
                    budget,
                    s.description()
                );
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Ping { base_url, config } => {
            let file = load_config(config.as_deref())?;
            let gateway = resolve_gateway(
                &EnvSnapshot::from_env(),
                &file,
                &GatewayOverrides {
                    base_url,
                    ..GatewayOverrides::default()
                },
            )?;
            let client = GatewayClient::new(gateway.base_url.clone(), gateway.request_timeout)?;
            let resp = runtime()?
                .block_on(client.ping())
                .with_context(|| format!("ping {}", gateway.base_url))?;

            println!("{} {}", resp.status, resp.body.trim());
            if !resp.is_success() {
                anyhow::bail!("gateway at {} answered {}", gateway.base_url, resp.status);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Md { summary, out } => {
            let receipt: SummaryReceipt = read_json(&summary)?;
            let md = render_markdown(&receipt);

            match out {
                Some(path) => {
                    fs::write(&path, md).with_context(|| format!("write {}", path.display()))?;
                }
                None => {
                    print!("{md}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::GithubAnnotations { summary } => {
            let receipt: SummaryReceipt = read_json(&summary)?;
            for line in github_annotations(&receipt) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

struct RunArgs {
    scenario: String,
    options: OptionOverrides,
    gateway: GatewayOverrides,
    config: Option<PathBuf>,
    summary_export: Option<PathBuf>,
    colors: bool,
}

fn run_scenario(args: RunArgs) -> anyhow::Result<ExitCode> {
    let scenario = scenarios::find(&args.scenario).ok_or_else(|| {
        let known: Vec<_> = scenarios::all().iter().map(|s| s.name()).collect();
        anyhow::Error::new(ConfigError::UnknownScenario(args.scenario.clone()))
            .context(format!("known scenarios: {}", known.join(", ")))
    })?;

    let file = load_config(args.config.as_deref())?;
    let gateway = resolve_gateway(&EnvSnapshot::from_env(), &file, &args.gateway)?;
    let options = resolve_options(
        scenario.name(),
        scenario.options(),
        file.scenarios.get(scenario.name()),
        &args.options,
        gateway.graceful_stop,
    )?;

    // Reject bad thresholds before sending any traffic.
    parse_thresholds(&options.thresholds)
        .with_context(|| format!("invalid thresholds for scenario {}", scenario.name()))?;

    let export_path = args.summary_export.or_else(|| {
        scenario
            .exports_summary()
            .then(|| gateway.summary_path())
    });
    let label = gateway.scenario_label.clone();

    info!(
        scenario = scenario.name(),
        base_url = %gateway.base_url,
        vus = options.vus,
        "starting run"
    );

    let client = GatewayClient::new(gateway.base_url.clone(), gateway.request_timeout)?;
    let runner = LoadRunner::new(client, gateway, Arc::new(SystemClock));

    let outcome = runtime()?.block_on(async {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(watch_interrupts(stop_tx));
        runner.execute(Arc::clone(&scenario), &options, stop_rx).await
    })?;

    let summary = SummaryUseCase::new(tool_info()).execute(SummaryRequest {
        scenario: scenario.name().to_string(),
        label,
        options,
        outcome,
        export_path,
        text: TextOptions {
            colors: args.colors,
            ..TextOptions::default()
        },
    })?;

    print!("{}", summary.stdout);

    if let Some(path) = &summary.export_path {
        write_json(path, &summary.receipt)?;
    }

    Ok(match summary.receipt.verdict.status {
        VerdictStatus::Pass => ExitCode::SUCCESS,
        VerdictStatus::Fail => ExitCode::from(2),
    })
}

/// First Ctrl+C stops new iterations; a second one exits immediately.
async fn watch_interrupts(stop_tx: watch::Sender<bool>) {
    let mut received = 0u32;
    while tokio::signal::ctrl_c().await.is_ok() {
        received += 1;
        if interrupt_action(received) == Interrupt::Exit {
            eprintln!("second interrupt received; exiting without teardown");
            std::process::exit(130);
        }
        warn!("interrupt received; stopping new iterations (press Ctrl+C again to exit now)");
        let _ = stop_tx.send(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    GracefulStop,
    Exit,
}

fn interrupt_action(received: u32) -> Interrupt {
    if received > 1 {
        Interrupt::Exit
    } else {
        Interrupt::GracefulStop
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(
            "info,gateload_app=debug,gateload_client=debug,gateload_config=debug,gateload=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let cfg = match explicit {
        Some(path) => load_config_file(path, true)?,
        None => load_config_file(Path::new(DEFAULT_CONFIG_FILE), false)?,
    };
    Ok(cfg)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
