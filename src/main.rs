//!
//! NOVA - near-earth object propagation and threat assessment
//!
//! Imports a catalog of tracked objects, propagates them on a fixed tick, ranks the ones
//! closing on the reference satellite and optionally deploys interceptors against them.

#[macro_use]
mod macros;
#[macro_use]
extern crate impl_ops;

mod bodies;
mod environment;
mod error;
mod input;
mod interceptor;
mod output;
mod propagate;
mod sim;
mod store;
mod threat;
mod types;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tokio::{signal, time};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bodies::sim_object::CatalogRecord;
use environment::Environment;
use input::cli;
use interceptor::{InterceptorAction, InterceptorManager};
use output::csv_output::CSVController;
use sim::Simulation;
use store::MemoryStore;

async fn sleep_for(duration_s: Option<f64>) {
    match duration_s {
        Some(secs) => time::sleep(Duration::from_secs_f64(secs)).await,
        None => std::future::pending().await,
    }
}

/// SIGHUP asks for an immediate catalog refresh.
#[cfg(unix)]
type HangupSignal = signal::unix::Signal;

#[cfg(unix)]
fn hangup_signal() -> std::io::Result<HangupSignal> {
    signal::unix::signal(signal::unix::SignalKind::hangup())
}

#[cfg(unix)]
async fn next_hangup(hangup: &mut HangupSignal) {
    if hangup.recv().await.is_none() {
        std::future::pending::<()>().await;
    }
}

#[cfg(not(unix))]
type HangupSignal = ();

#[cfg(not(unix))]
fn hangup_signal() -> std::io::Result<HangupSignal> {
    Ok(())
}

#[cfg(not(unix))]
async fn next_hangup(_: &mut HangupSignal) {
    std::future::pending::<()>().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = cli::check_cli();
    let params = input::gather_runtime_parameters(&args);
    let reference = input::read_reference_satellite(args.reference.as_ref())
        .context("reading reference satellite")?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let catalog_store = Arc::new(MemoryStore::<CatalogRecord>::new());
    let rows = input::read_catalog_from_file(&args.catalog)
        .with_context(|| format!("reading catalog {}", args.catalog.display()))?;
    let imported =
        input::import_catalog(&*catalog_store, rows, reference.altitude, &mut rng).await?;
    info!(imported, stored = catalog_store.len(), "catalog imported");

    let interceptors = InterceptorManager::new(
        Arc::new(MemoryStore::<InterceptorAction>::new()),
        reference.clone(),
    );
    let out_dir = args.out.clone().unwrap_or_else(|| PathBuf::from("."));
    let (mut output_controller, out_path) =
        CSVController::new(&out_dir).context("creating output directory")?;

    let mut sim = Simulation::new(
        Environment::new(Utc::now(), reference),
        catalog_store,
        Box::new(rng),
        params.clone(),
    );
    let mut view_rx = sim.subscribe();
    let refresh = sim.refresh_trigger();
    let mut hangup = hangup_signal().context("installing SIGHUP handler")?;
    let cancel = CancellationToken::new();
    let sim_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            sim.run(cancel).await;
            sim
        }
    });

    let stop = sleep_for(args.duration);
    let interrupt = signal::ctrl_c();
    tokio::pin!(stop, interrupt);
    let mut last_write: Option<f64> = None;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = &mut interrupt => {
                info!("interrupt received");
                break;
            }
            _ = next_hangup(&mut hangup) => {
                info!("catalog refresh requested");
                refresh.notify_one();
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow_and_update().clone();

                if last_write.map_or(true, |t| view.sim_time_s - t >= params.write_period) {
                    output::write_out_view(&view, &mut output_controller)?;
                    last_write = Some(view.sim_time_s);
                }
                if args.auto_intercept {
                    if let Err(err) = interceptors.engage_critical(&view.active_threats).await {
                        warn!(error = %err, "auto intercept failed");
                    }
                    if let Err(err) = interceptors.stand_down(&view.objects).await {
                        warn!(error = %err, "interceptor stand down failed");
                    }
                }
            }
        }
    }

    cancel.cancel();
    let sim = sim_task.await?;
    let actions = interceptors.list().await?;
    output::write_out_interceptors(&actions, &mut output_controller)?;

    info!(
        steps = sim.environment().step_count,
        tracked = sim.objects().len(),
        active_threats = sim.active_threats().len(),
        interceptors = actions.len(),
        resolved = actions.iter().filter(|a| a.status.is_terminal()).count(),
        output = %out_path.display(),
        "session finished"
    );

    Ok(())
}
