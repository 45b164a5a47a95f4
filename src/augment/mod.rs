// src/augment/mod.rs
//! Correlation run: discovery → coverage gate → load → correlate.
//!
//! Discovery and load failures fail the whole run. Problems with a single
//! detection file only mark that file's batch in the [`RunReport`].

pub mod classify;
pub mod clock;
pub mod correlate;
pub mod date;
pub mod discovery;
pub mod records;
pub mod report;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::storage::ArtifactRepository;
use clock::Clock;
use correlate::{correlate_file, BatchWriter, SocialTables};
use report::RunReport;

pub use classify::SourceKind;
pub use report::{BatchOutcome, BatchReport, JobState};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "augment_sources_downloaded_total",
            "Registered sources downloaded for correlation, by kind."
        );
        describe_counter!(
            "augment_sources_ignored_total",
            "Registered sources that matched no source kind."
        );
        describe_counter!(
            "augment_batches_persisted_total",
            "Correlated batches uploaded and registered."
        );
        describe_counter!(
            "augment_batches_discarded_total",
            "Detection dates without any matching social post."
        );
        describe_counter!(
            "augment_batches_failed_total",
            "Detection files skipped because of parse or persistence errors."
        );
        describe_counter!(
            "augment_transfer_errors_total",
            "Signed-URL uploads/downloads that did not return 200."
        );
        describe_counter!("augment_runs_total", "Runs that reached the correlation stage.");
        describe_histogram!("augment_run_ms", "Correlation run time in milliseconds.");
        describe_gauge!("augment_last_run_ts", "Unix ts when a correlation run last finished.");
    });
}

/// Identity and scratch space of one correlation job.
#[derive(Debug, Clone)]
pub struct AugmentJob {
    pub job_id: String,
    pub tracer_id: String,
    pub work_dir: PathBuf,
}

/// Run one correlation pass to completion.
pub async fn run(job: &AugmentJob, repo: &ArtifactRepository, clock: &dyn Clock) -> RunReport {
    let t0 = start(job, repo);
    let mut report = RunReport::new(&job.job_id, &job.tracer_id);
    run_stages(job, repo, clock, &mut report).await;
    finish(job, report, t0)
}

/// [`run`] bounded by an overall time budget. Exhausting it fails the run;
/// batches finished before the deadline stay in the report.
pub async fn run_with_budget(
    job: &AugmentJob,
    repo: &ArtifactRepository,
    clock: &dyn Clock,
    budget: Duration,
) -> RunReport {
    let t0 = start(job, repo);
    let mut report = RunReport::new(&job.job_id, &job.tracer_id);

    let stages = run_stages(job, repo, clock, &mut report);
    if tokio::time::timeout(budget, stages).await.is_err() {
        error!(
            job_id = %job.job_id,
            budget_secs = budget.as_secs(),
            completed = report.batches.len(),
            "run budget exhausted"
        );
        report.mark_failed(format!("run budget of {}s exhausted", budget.as_secs()));
    }
    finish(job, report, t0)
}

fn start(job: &AugmentJob, repo: &ArtifactRepository) -> Instant {
    ensure_metrics_described();
    info!(job_id = %job.job_id, tracer_id = %job.tracer_id, protocol = %repo.protocol(), "starting job");
    Instant::now()
}

fn finish(job: &AugmentJob, report: RunReport, t0: Instant) -> RunReport {
    histogram!("augment_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("augment_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    let job_id = job.job_id.as_str();
    if report.succeeded() {
        info!(
            job_id,
            persisted = report.persisted(),
            discarded = report.discarded(),
            skipped = report.skipped(),
            "job finished"
        );
    } else {
        error!(
            job_id,
            tracer_id = %job.tracer_id,
            persisted = report.persisted(),
            cause = report.cause.as_deref().unwrap_or_default(),
            "job failed"
        );
    }
    report
}

// Fills `report` in place so a cancelled run keeps what it already did.
async fn run_stages(
    job: &AugmentJob,
    repo: &ArtifactRepository,
    clock: &dyn Clock,
    report: &mut RunReport,
) {
    let job_id = job.job_id.as_str();

    let found = match discovery::discover(repo, job_id, &job.work_dir).await {
        Ok(found) => found,
        Err(e) => return report.mark_failed(format!("discovery failed: {e}")),
    };

    if let Err(gate) = found.gate() {
        warn!(job_id, %gate, "could not run augmentation");
        report.gate = Some(gate);
        return;
    }

    let tables = match SocialTables::load(&found) {
        Ok(t) => t,
        Err(e) => return report.mark_failed(format!("loading social posts failed: {e}")),
    };

    let writer = BatchWriter {
        repo,
        job_id,
        work_dir: &job.work_dir,
        registered: &found.registered,
        clock,
    };
    for path in &found.detection_files {
        report.batches.push(correlate_file(path, &tables, &writer).await);
    }

    if report.skipped() > 0 {
        warn!(job_id, skipped = report.skipped(), "some detection dates were not persisted");
    }
    counter!("augment_runs_total").increment(1);
}
