//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{BridgeRunConfig, BridgeRunner};

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref sink) = args.packet_sink {
        info!(packet_sink = %sink, "Overriding packet sink from CLI");
        config.bridge.packet_sink = Some(sink.clone());
    }
    if let Some(tick_ms) = args.tick_ms {
        if tick_ms == 0 {
            anyhow::bail!("--tick-ms must be > 0");
        }
        info!(tick_ms, "Overriding tick interval from CLI");
        config.bridge.tick_interval_ms = tick_ms;
    }

    info!(
        transport = ?config.transport.kind,
        tick_interval_ms = config.bridge.tick_interval_ms,
        markers = config.markers.len(),
        outputs = config.outputs.len(),
        preflight = config.preflight.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let run_config = BridgeRunConfig {
        config,
        max_ticks: (args.max_ticks != 0).then_some(args.max_ticks),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        mock_markers_hz: args.mock_markers,
        run_preflight: !args.skip_preflight,
    };

    info!("Starting bridge...");
    let stats = BridgeRunner::new(run_config)
        .run(shutdown_signal())
        .await
        .context("Bridge execution failed")?;

    info!(
        ticks = stats.ticks,
        markers = stats.markers,
        packets = stats.packets,
        duration_secs = stats.duration.as_secs_f64(),
        packet_rate = format!("{:.2}", stats.packet_rate()),
        "Bridge completed"
    );
    stats.print_summary();

    info!("EmotiBit bridge finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Bridge:");
    println!("  Tick interval: {} ms", config.bridge.tick_interval_ms);
    match &config.bridge.packet_sink {
        Some(sink) => println!("  Packet sink: {}", sink),
        None => println!("  Packet sink: (log only)"),
    }
    println!("  Transport: {:?}", config.transport.kind);

    println!("\nMarker inputs ({}):", config.markers.len());
    for marker in &config.markers {
        println!("  - {}", marker.path.display());
    }

    println!("\nOutputs ({}):", config.outputs.len());
    for output in &config.outputs {
        println!("  - {} <- {}", output.source_id, output.path.display());
    }

    if !config.preflight.is_empty() {
        println!("\nPreflight ({}):", config.preflight.len());
        for cmd in &config.preflight {
            println!("  - `{}` expecting '{}'", cmd.command, cmd.expect);
        }
    }

    println!();
}
