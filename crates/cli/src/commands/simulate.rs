//! `simulate` command implementation.

use anyhow::{Context, Result};
use contracts::{BatcherFile, NextAvgFormula};
use tracing::info;

use crate::cli::SimulateArgs;
use crate::simulation::Simulation;

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let mut file = load_config(args)?;
    apply_overrides(&mut file, args);

    // Overrides can produce values the file never had
    config_loader::validate(&file).context("Invalid simulation settings")?;

    info!(
        batcher = %file.batcher.name,
        probe_interval_ms = file.batcher.probe_interval_ms,
        probe_ms = file.simulation.probe_ms,
        producers = file.simulation.producers,
        items_per_producer = file.simulation.items_per_producer,
        formula = ?file.batcher.next_avg_formula,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let simulation = Simulation::new(file.batcher, file.simulation);
    let stats = simulation.run(shutdown_signal()).await?;

    info!(
        items = stats.delivery.total_items,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.1}", stats.throughput()),
        "Simulation completed"
    );
    stats.print_summary();

    Ok(())
}

fn load_config(args: &SimulateArgs) -> Result<BatcherFile> {
    match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(BatcherFile::default())
        }
    }
}

fn apply_overrides(file: &mut BatcherFile, args: &SimulateArgs) {
    if let Some(producers) = args.producers {
        file.simulation.producers = producers;
    }
    if let Some(items) = args.items {
        file.simulation.items_per_producer = items;
    }
    if let Some(probe_ms) = args.probe_ms {
        file.simulation.probe_ms = probe_ms;
    }
    if args.corrected_formula {
        file.batcher.next_avg_formula = NextAvgFormula::Corrected;
    }
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that fails to install never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
