//! Virtual-user scheduling: setup, concurrent load phase, teardown.

use crate::metrics::MetricsSink;
use crate::scenarios::{Scenario, Session};
use crate::vu::{Phase, Vu};
use crate::Clock;
use anyhow::Context;
use gateload_client::GatewayClient;
use gateload_config::GatewayConfig;
use gateload_types::{Metric, MetricSample, RunState, ScenarioOptions, Tags};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub samples: Vec<MetricSample>,
    pub started_at: String,
    pub ended_at: String,
    pub elapsed: Duration,
    pub state: RunState,
}

#[derive(Default)]
struct Counters {
    complete: AtomicU64,
    interrupted: AtomicU64,
}

pub struct LoadRunner {
    client: GatewayClient,
    config: Arc<GatewayConfig>,
    clock: Arc<dyn Clock>,
}

impl LoadRunner {
    pub fn new(client: GatewayClient, config: GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            config: Arc::new(config),
            clock,
        }
    }

    fn vu(&self, id: u32, phase: Phase, sink: &MetricsSink) -> Vu {
        Vu::new(
            id,
            phase,
            self.client.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.clock),
            sink.clone(),
        )
    }

    /// Run `scenario` to completion.
    ///
    /// Only a setup failure is an error. Flipping `stop` to `true` stops new
    /// iterations; in-flight ones get the graceful-stop window, then teardown
    /// runs as usual.
    pub async fn execute(
        &self,
        scenario: Arc<dyn Scenario>,
        options: &ScenarioOptions,
        mut stop: watch::Receiver<bool>,
    ) -> anyhow::Result<RunOutcome> {
        let sink = MetricsSink::new();
        let started_at = self.clock.now_rfc3339();
        let started = Instant::now();

        let mut setup_vu = self.vu(0, Phase::Setup, &sink);
        // Only a stop requested while setup runs aborts it; an earlier one just skips the load phase.
        stop.borrow_and_update();
        let setup = tokio::select! {
            res = scenario.setup(&mut setup_vu) => res,
            () = stop_requested(&mut stop) => {
                Err(anyhow::anyhow!("interrupted before setup finished"))
            }
        };
        setup_vu.flush();
        let session = setup
            .with_context(|| format!("scenario {} aborted during setup", scenario.name()))?
            .map(Arc::new);

        // The load-phase clock starts once setup is done.
        let load_started = Instant::now();

        sink.record(Metric::Vus, f64::from(options.vus), Tags::new());
        sink.record(Metric::VusMax, f64::from(options.vus), Tags::new());

        // Neither budget given means a single iteration.
        let budget = match (options.iterations, options.duration_ms) {
            (Some(n), _) => Some(n),
            (None, None) => Some(1),
            (None, Some(_)) => None,
        }
        .map(|n| Arc::new(AtomicU64::new(n)));
        let deadline = options
            .duration_ms
            .map(|ms| load_started + Duration::from_millis(ms));
        let grace = Duration::from_millis(options.graceful_stop_ms);
        let counters = Arc::new(Counters::default());

        info!(
            scenario = scenario.name(),
            vus = options.vus,
            duration_ms = options.duration_ms,
            iterations = options.iterations,
            "starting load phase"
        );

        let mut tasks = JoinSet::new();
        for id in 1..=options.vus {
            tasks.spawn(drive_vu(
                self.vu(id, Phase::Load, &sink),
                Arc::clone(&scenario),
                session.clone(),
                budget.clone(),
                deadline,
                stop.clone(),
                Arc::clone(&counters),
            ));
        }

        let mut interrupted = *stop.borrow();
        let mut watching = !interrupted;
        let mut hard_stop = deadline.map(|d| d + grace);
        if interrupted {
            hard_stop = Some(Instant::now() + grace);
        }

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Err(e)) if e.is_panic() => {
                        error!(error = %e, "virtual user panicked");
                        counters.interrupted.fetch_add(1, Ordering::Relaxed);
                    }
                    Some(_) => {}
                },
                () = sleep_until(hard_stop.unwrap_or_else(Instant::now)), if hard_stop.is_some() => {
                    let aborted = tasks.len() as u64;
                    warn!(aborted, "graceful stop elapsed, aborting in-flight iterations");
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    counters.interrupted.fetch_add(aborted, Ordering::Relaxed);
                    break;
                }
                changed = stop.changed(), if watching => match changed {
                    Err(_) => watching = false,
                    Ok(()) if *stop.borrow() => {
                        info!("stop requested, waiting for in-flight iterations");
                        watching = false;
                        interrupted = true;
                        let soft = Instant::now() + grace;
                        hard_stop = Some(hard_stop.map_or(soft, |h| h.min(soft)));
                    }
                    Ok(()) => {}
                },
            }
        }

        if let Some(session) = &session {
            let mut teardown_vu = self.vu(0, Phase::Teardown, &sink);
            if let Err(e) = scenario.teardown(&mut teardown_vu, session).await {
                warn!(error = %format!("{e:#}"), "teardown failed");
            }
            teardown_vu.flush();
        }

        let elapsed = started.elapsed();
        let state = RunState {
            test_run_duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            interrupted,
            iterations_complete: counters.complete.load(Ordering::Relaxed),
            iterations_interrupted: counters.interrupted.load(Ordering::Relaxed),
        };
        debug!(?state, samples = sink.len(), "run finished");

        Ok(RunOutcome {
            samples: sink.drain(),
            started_at,
            ended_at: self.clock.now_rfc3339(),
            elapsed,
            state,
        })
    }
}

/// Resolves when `stop` flips to `true`; never resolves once the sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *stop.borrow() {
            return;
        }
    }
}

async fn drive_vu(
    mut vu: Vu,
    scenario: Arc<dyn Scenario>,
    session: Option<Arc<Session>>,
    budget: Option<Arc<AtomicU64>>,
    deadline: Option<Instant>,
    stop: watch::Receiver<bool>,
    counters: Arc<Counters>,
) {
    let mut iteration = 0u64;
    loop {
        if *stop.borrow() || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if let Some(budget) = &budget {
            let claimed = budget.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                n.checked_sub(1)
            });
            if claimed.is_err() {
                break;
            }
        }

        vu.set_iteration(iteration);
        let started = Instant::now();
        match scenario.iteration(&mut vu, session.as_deref()).await {
            Ok(()) => {
                vu.record_iteration(started.elapsed().as_secs_f64() * 1000.0);
                counters.complete.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(vu = vu.id(), iteration, error = %format!("{e:#}"), "iteration failed");
                counters.interrupted.fetch_add(1, Ordering::Relaxed);
            }
        }
        vu.flush();
        iteration += 1;
    }
}
