// tests/augment_e2e.rs
//
// Full runs against the in-process registry: discovery, gate, correlation,
// persistence and the run report.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use common::{detections, posts, FakeRegistry, FixedClock};
use serde_json::json;
use wildfire_augment::augment::report::RunReport;
use wildfire_augment::augment::{BatchOutcome, JobState};
use wildfire_augment::{
    build_repository, run, run_with_budget, ArtifactRepository, AugmentJob, Protocol,
};

const AUG_15: &str = "sentinel/1/0_2021_08_15____wildfire_coords.json";
const AUG_16: &str = "sentinel/1/0_2021_08_16____wildfire_coords.json";
const TWEETS: &str = "twitter/1/data_2024-01-01_120000.json";

fn at(h: u32, m: u32, s: u32) -> FixedClock {
    let t: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap();
    FixedClock(t)
}

fn job_for(
    fake: &FakeRegistry,
    protocol: Protocol,
    tmp: &std::path::Path,
) -> (AugmentJob, ArtifactRepository) {
    let cfg = fake.augment_config(protocol, tmp);
    let repo = build_repository(&cfg).unwrap();
    let job = AugmentJob {
        job_id: cfg.job_id.clone(),
        tracer_id: cfg.tracer_id.clone(),
        work_dir: cfg.work_dir.clone(),
    };
    (job, repo)
}

async fn run_once(
    fake: &FakeRegistry,
    protocol: Protocol,
    tmp: &std::path::Path,
    clock: &FixedClock,
) -> RunReport {
    let (job, repo) = job_for(fake, protocol, tmp);
    run(&job, &repo, clock).await
}

fn seed_two_matching_days(fake: &FakeRegistry) {
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(AUG_16, &detections(&[(38.2, 23.6, "active")]));
    fake.seed(
        TWEETS,
        &posts(
            "Tweet",
            &[
                (2021, "August", 15, "wildfire", "first"),
                (2021, "August", 16, "wildfire", "second"),
            ],
        ),
    );
}

#[tokio::test]
async fn matching_tweet_produces_one_registered_batch() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(
        TWEETS,
        &posts("Tweet", &[(2021, "August", 15, "wildfire", "Evia fire")]),
    );
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(9, 5, 7)).await;

    assert_eq!(report.state, JobState::Finished);
    assert_eq!(report.persisted(), 1);
    let expected = "augmented/by_date/2021_August_15_20240301_090507.json";
    assert_eq!(report.persisted_paths(), vec![expected]);

    let registered = fake.registered_under("augmented/");
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].name, "2021_August_15_20240301_090507");
    assert_eq!(registered[0].protocol, Protocol::S3);

    let table = fake.blob_json(expected).unwrap();
    assert_eq!(
        table,
        json!({
            "0": {
                "Status": "active",
                "Lattitude": 38.0,
                "Longitude": 23.5,
                "Title": "n/a",
                "Text": "n/a",
                "Location": "n/a"
            },
            "1": {
                "Status": "tweet about wildfire",
                "Lattitude": 38.1,
                "Longitude": 23.7,
                "Title": "Evia fire",
                "Text": "Evia fire body",
                "Location": "Attica"
            }
        })
    );
    assert!(tmp
        .path()
        .join("work/by_date/2021_August_15_20240301_090507.json")
        .exists());
}

#[tokio::test]
async fn telegram_rows_follow_twitter_rows() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(
        TWEETS,
        &posts("Tweet", &[(2021, "August", 15, "wildfire", "tweet one")]),
    );
    fake.seed(
        "telegram/1/data.json",
        &posts(
            "Telegram",
            &[
                (2021, "August", 15, "flood", "tg one"),
                (2021, "August", 14, "flood", "tg stale"),
            ],
        ),
    );
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(10, 0, 0)).await;
    let batch = &report.batches[0];
    assert_eq!((batch.detection_rows, batch.twitter_matches, batch.telegram_matches), (1, 1, 1));

    let table = fake.blob_json(report.persisted_paths()[0]).unwrap();
    let statuses: Vec<&str> = ["0", "1", "2"]
        .iter()
        .map(|k| table[*k]["Status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["active", "tweet about wildfire", "telegram post about flood"]);
    assert!(table.get("3").is_none());
}

#[tokio::test]
async fn detections_alone_close_the_gate() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed("scraped/1/readme.txt", &json!({}));
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 0)).await;

    assert!(report.succeeded());
    let gate = report.gate.expect("gate closed");
    assert!(gate.detections && !gate.twitter && !gate.telegram);
    assert!(report.batches.is_empty());
    assert!(fake.blobs_under("augmented/").is_empty());
}

#[tokio::test]
async fn an_adjacent_day_is_not_a_match() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(
        TWEETS,
        &posts(
            "Tweet",
            &[
                (2021, "August", 16, "wildfire", "next day"),
                (2021, "August", 14, "wildfire", "day before"),
            ],
        ),
    );
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 0)).await;

    assert!(report.succeeded());
    assert_eq!(report.discarded(), 1);
    assert_eq!(report.batches[0].outcome, BatchOutcome::Discarded);
    assert!(fake.blobs_under("augmented/").is_empty());
}

#[tokio::test]
async fn reruns_never_overwrite_earlier_artifacts() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(
        TWEETS,
        &posts("Tweet", &[(2021, "August", 15, "wildfire", "Evia fire")]),
    );
    let tmp = tempfile::tempdir().unwrap();

    run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 0)).await;
    run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 1)).await;
    // Same second again: the local file exists, so the name gets a suffix.
    run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 1)).await;

    assert_eq!(
        fake.blobs_under("augmented/"),
        vec![
            "augmented/by_date/2021_August_15_20240301_090000.json",
            "augmented/by_date/2021_August_15_20240301_090001.json",
            "augmented/by_date/2021_August_15_20240301_090001_1.json",
        ]
    );
    assert_eq!(fake.registered_under("augmented/").len(), 3);
}

#[tokio::test]
async fn one_failed_batch_does_not_stop_the_run() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(AUG_16, &detections(&[(38.2, 23.6, "active")]));
    fake.seed("sentinel/1/xxbad____coords.json", &detections(&[(1.0, 1.0, "x")]));
    fake.seed(
        TWEETS,
        &posts(
            "Tweet",
            &[
                (2021, "August", 15, "wildfire", "first"),
                (2021, "August", 16, "wildfire", "second"),
            ],
        ),
    );
    *fake.state.fail_uploads_matching.lock() = Some("2021_August_15".into());
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 0)).await;

    assert!(report.succeeded());
    assert_eq!(report.batches.len(), 3);
    assert_eq!(report.persisted(), 1);
    assert_eq!(report.skipped(), 2);
    assert!(matches!(report.batches[0].outcome, BatchOutcome::Failed { .. }));
    assert!(matches!(report.batches[2].outcome, BatchOutcome::Unreadable { .. }));
    assert_eq!(
        fake.blobs_under("augmented/"),
        vec!["augmented/by_date/2021_August_16_20240301_090000.json"]
    );
}

#[tokio::test]
async fn unreachable_registry_fails_the_run() {
    let fake = FakeRegistry::start().await;
    fake.state.down.store(true, Ordering::SeqCst);
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(9, 0, 0)).await;

    assert_eq!(report.state, JobState::Failed);
    assert!(report.cause.unwrap().contains("discovery failed"));
}

#[tokio::test]
async fn local_mode_cannot_discover_remote_sources() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::Local, tmp.path(), &at(9, 0, 0)).await;

    assert!(!report.succeeded());
    assert!(report.cause.unwrap().contains("not supported"));
}

#[tokio::test]
async fn report_serializes_with_flattened_outcome() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(
        TWEETS,
        &posts("Tweet", &[(2021, "August", 15, "wildfire", "Evia fire")]),
    );
    let tmp = tempfile::tempdir().unwrap();

    let report = run_once(&fake, Protocol::S3, tmp.path(), &at(9, 5, 7)).await;
    let v = serde_json::to_value(&report).unwrap();

    assert_eq!(v["state"], "finished");
    assert_eq!(v["batches"][0]["outcome"], "persisted");
    assert_eq!(v["batches"][0]["date"], "2021_August_15");
}

#[tokio::test]
async fn same_second_in_another_work_dir_does_not_overwrite() {
    let fake = FakeRegistry::start().await;
    fake.seed(AUG_15, &detections(&[(38.0, 23.5, "active")]));
    fake.seed(
        TWEETS,
        &posts("Tweet", &[(2021, "August", 15, "wildfire", "Evia fire")]),
    );
    let (first, second) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());

    run_once(&fake, Protocol::S3, first.path(), &at(9, 0, 0)).await;
    let report = run_once(&fake, Protocol::S3, second.path(), &at(9, 0, 0)).await;

    assert_eq!(
        report.persisted_paths(),
        vec!["augmented/by_date/2021_August_15_20240301_090000_1.json"]
    );
    assert_eq!(fake.blobs_under("augmented/").len(), 2);
    assert_eq!(fake.registered_under("augmented/").len(), 2);
}

#[tokio::test]
async fn exhausted_budget_keeps_finished_batches() {
    let fake = FakeRegistry::start().await;
    seed_two_matching_days(&fake);
    *fake.state.slow_uploads_matching.lock() =
        Some(("2021_August_16".into(), Duration::from_secs(3)));
    let tmp = tempfile::tempdir().unwrap();
    let (job, repo) = job_for(&fake, Protocol::S3, tmp.path());

    let report = run_with_budget(&job, &repo, &at(9, 0, 0), Duration::from_secs(1)).await;

    assert_eq!(report.state, JobState::Failed);
    assert!(report.cause.as_deref().unwrap().contains("budget of 1s exhausted"));
    assert_eq!(
        report.persisted_paths(),
        vec!["augmented/by_date/2021_August_15_20240301_090000.json"]
    );
    assert_eq!(
        fake.registered_under("augmented/").len(),
        report.persisted(),
        "every registered artifact shows up in the report"
    );
}

#[tokio::test]
async fn generous_budget_matches_an_unbounded_run() {
    let fake = FakeRegistry::start().await;
    seed_two_matching_days(&fake);
    let tmp = tempfile::tempdir().unwrap();
    let (job, repo) = job_for(&fake, Protocol::S3, tmp.path());

    let report = run_with_budget(&job, &repo, &at(9, 0, 0), Duration::from_secs(30)).await;

    assert!(report.succeeded());
    assert_eq!(report.persisted(), 2);
}
