use std::process::ExitCode;

use benor_node::{cli::Args, Launcher};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Consensus events go to the audit file, everything else to stdout.
    let file_appender = tracing_appender::rolling::never("logs", format!("audit-{}.log", args.run_name));
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "consensus"
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,benor_node=debug".into()))
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "consensus"
        }));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .init();

    let config = match args.to_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.save_config {
        if let Err(e) = config.save_to_file(path) {
            error!("Failed to save config to {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    info!("--- STARTING SIMULATION ---");
    info!(
        "N={} F={} (tolerance {}), transport {:?}",
        config.protocol.nodes,
        config.protocol.faulty,
        config.protocol.tolerance(),
        config.transport
    );

    let launcher = match Launcher::launch(config).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to launch nodes: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let started = launcher.start_all();
    info!("{} round drivers armed", started);

    let report = launcher.wait_for_decision().await;
    launcher.shutdown();

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to render report: {}", e),
    }

    if report.exceeds_tolerance || report.reached_agreement() {
        ExitCode::SUCCESS
    } else {
        error!("❌ cluster within tolerance did not reach agreement");
        ExitCode::FAILURE
    }
}
