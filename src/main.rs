//! wildfire-augment: binary entrypoint
//! Runs one correlation job against the source registry and exits.
//! Exit code is non-zero when the run state is `failed`.

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wildfire_augment::augment::clock::SystemClock;
use wildfire_augment::config::{file, Args, AugmentConfig, LogFormat};
use wildfire_augment::metrics::Metrics;
use wildfire_augment::{build_repository, run_with_budget, AugmentJob};

/// RUST_LOG takes precedence over `--log-level`.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

async fn run_cli(args: Args) -> anyhow::Result<bool> {
    let metrics = Metrics::install().context("installing metrics recorder")?;
    let file_cfg = file::load_default(args.config.as_deref())?;
    let cfg = AugmentConfig::resolve(&args, file_cfg).context("invalid configuration")?;

    info!(
        job_id = %cfg.job_id,
        registry = %cfg.registry.base_url(),
        protocol = %cfg.storage_protocol,
        "setting up registry gateway and storage"
    );
    let repo = build_repository(&cfg).context("building storage facade")?;
    if !repo.registry().ping().await {
        warn!(job_id = %cfg.job_id, "registry did not answer the startup ping");
    }

    let job = AugmentJob {
        job_id: cfg.job_id.clone(),
        tracer_id: cfg.tracer_id.clone(),
        work_dir: cfg.work_dir.clone(),
    };
    let report = run_with_budget(&job, &repo, &SystemClock, cfg.run_budget).await;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let exposition = metrics.render();
    info!(job_id = %cfg.job_id, metrics = %exposition, "run metrics");
    if let Some(path) = &args.metrics_file {
        std::fs::write(path, &exposition)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }
    Ok(report.succeeded())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    match run_cli(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = ?e, "augment job could not start");
            ExitCode::FAILURE
        }
    }
}
