// src/augment/correlate.rs
//! Date join between one detection file and the loaded social tables.
//!
//! A post matches a detection file iff year, month name and day are equal.
//! Batches start with the detection rows (file order), followed by twitter
//! matches, then telegram matches (table order). Batches with no match are
//! dropped before anything is written.

use metrics::counter;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::date::{file_name_of, latest_snapshot, parse_capture_date, CaptureDate};
use super::discovery::Discovery;
use super::records::{
    load_detections, write_row_indexed, CorrelatedRecord, DetectionRecord, SocialSource, SocialTable,
};
use super::report::{BatchOutcome, BatchReport};
use crate::error::Result;
use crate::registry::SourceData;
use crate::storage::ArtifactRepository;

pub const OUTPUT_NAMESPACE: &str = "augmented/by_date";
const TELEGRAM_FILE: &str = "data.json";

/// Social tables for one run. Loaded once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SocialTables {
    pub twitter: Option<SocialTable>,
    pub telegram: Option<SocialTable>,
}

impl SocialTables {
    /// Latest twitter snapshot and the telegram history file, when present.
    pub fn load(discovery: &Discovery) -> Result<Self> {
        let twitter = match latest_snapshot(&discovery.twitter_files) {
            Some(path) => {
                info!(file = %path.display(), "loading latest twitter snapshot");
                Some(SocialTable::load(path, SocialSource::Twitter)?)
            }
            None => None,
        };

        let telegram = match telegram_file(&discovery.telegram_files) {
            Some(path) => {
                info!(file = %path.display(), "loading telegram history");
                Some(SocialTable::load(path, SocialSource::Telegram)?)
            }
            None => None,
        };

        Ok(Self { twitter, telegram })
    }

    fn tables(&self) -> impl Iterator<Item = &SocialTable> {
        self.twitter.iter().chain(self.telegram.iter())
    }
}

// `data.json` holds the full history; otherwise take the last name.
fn telegram_file(files: &[PathBuf]) -> Option<&PathBuf> {
    files
        .iter()
        .find(|p| file_name_of(p) == TELEGRAM_FILE)
        .or_else(|| files.iter().max_by_key(|p| file_name_of(p)))
}

/// Output rows for one detection date.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationBatch {
    pub date: CaptureDate,
    pub records: Vec<CorrelatedRecord>,
    pub detection_rows: usize,
    pub twitter_matches: usize,
    pub telegram_matches: usize,
}

impl CorrelationBatch {
    pub fn matched(&self) -> usize {
        self.twitter_matches + self.telegram_matches
    }

    /// Detection-only batches are never written.
    pub fn is_persistable(&self) -> bool {
        self.matched() > 0
    }
}

/// Pure join of one detection set against every loaded social table.
pub fn build_batch(
    date: &CaptureDate,
    detections: &[DetectionRecord],
    tables: &SocialTables,
) -> CorrelationBatch {
    let mut records: Vec<CorrelatedRecord> =
        detections.iter().map(CorrelatedRecord::from_detection).collect();
    let (mut twitter_matches, mut telegram_matches) = (0usize, 0usize);

    for table in tables.tables() {
        for post in &table.posts {
            let (Some(year), Some(month), Some(day)) = (post.year, post.month.as_deref(), post.day)
            else {
                continue;
            };
            if !date.matches(year, month, day) {
                continue;
            }
            records.push(CorrelatedRecord::from_post(post, table.source));
            match table.source {
                SocialSource::Twitter => twitter_matches += 1,
                SocialSource::Telegram => telegram_matches += 1,
            }
        }
    }

    CorrelationBatch {
        date: date.clone(),
        records,
        detection_rows: detections.len(),
        twitter_matches,
        telegram_matches,
    }
}

fn relative_path_for(name: &str) -> String {
    format!("{OUTPUT_NAMESPACE}/{name}.json")
}

/// Serializes batches under `<work_dir>/by_date` and pushes them through the facade.
pub struct BatchWriter<'a> {
    pub repo: &'a ArtifactRepository,
    pub job_id: &'a str,
    pub work_dir: &'a Path,
    /// Relative paths already taken in the registry.
    pub registered: &'a BTreeSet<String>,
    pub clock: &'a dyn Clock,
}

impl BatchWriter<'_> {
    fn output_dir(&self) -> PathBuf {
        self.work_dir.join("by_date")
    }

    // `{label}_{timestamp}`, suffixed while that name is taken locally or remotely.
    fn unique_name(&self, date: &CaptureDate) -> String {
        let base = format!("{}_{}", date.label(), self.clock.timestamp());
        if !self.is_taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|name| !self.is_taken(name))
            .unwrap_or(base)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.output_dir().join(format!("{name}.json")).exists()
            || self.registered.contains(&relative_path_for(name))
    }

    pub async fn persist(&self, batch: &CorrelationBatch) -> Result<SourceData> {
        let name = self.unique_name(&batch.date);
        let local_path = self.output_dir().join(format!("{name}.json"));
        write_row_indexed(&batch.records, &local_path)?;

        let source = SourceData::new(
            name.clone(),
            self.repo.protocol(),
            relative_path_for(&name),
        );
        self.repo.register_json(&source, self.job_id, &local_path).await
    }
}

/// Correlate one downloaded detection file and persist the batch if it matched.
/// Never fails: every problem ends up in the returned report.
pub async fn correlate_file(path: &Path, tables: &SocialTables, writer: &BatchWriter<'_>) -> BatchReport {
    let job_id = writer.job_id;
    let mut report = BatchReport {
        detection_file: path.to_path_buf(),
        date: None,
        detection_rows: 0,
        twitter_matches: 0,
        telegram_matches: 0,
        outcome: BatchOutcome::Discarded,
    };

    let date = match parse_capture_date(&file_name_of(path)) {
        Ok(d) => d,
        Err(e) => {
            warn!(job_id, file = %path.display(), error = %e, "skipping detection file");
            counter!("augment_batches_failed_total").increment(1);
            report.outcome = BatchOutcome::Unreadable { cause: e.to_string() };
            return report;
        }
    };
    report.date = Some(date.label());

    let detections = match load_detections(path) {
        Ok(d) => d,
        Err(e) => {
            warn!(job_id, file = %path.display(), error = %e, "skipping detection file");
            counter!("augment_batches_failed_total").increment(1);
            report.outcome = BatchOutcome::Unreadable { cause: e.to_string() };
            return report;
        }
    };

    let batch = build_batch(&date, &detections, tables);
    report.detection_rows = batch.detection_rows;
    report.twitter_matches = batch.twitter_matches;
    report.telegram_matches = batch.telegram_matches;

    if !batch.is_persistable() {
        debug!(job_id, date = %date.label(), "no social posts for capture date; batch discarded");
        counter!("augment_batches_discarded_total").increment(1);
        return report;
    }

    match writer.persist(&batch).await {
        Ok(source) => {
            info!(
                job_id,
                date = %date.label(),
                rows = batch.records.len(),
                matched = batch.matched(),
                relative_path = %source.relative_path,
                "correlated batch persisted"
            );
            counter!("augment_batches_persisted_total").increment(1);
            report.outcome = BatchOutcome::Persisted {
                relative_path: source.relative_path,
            };
        }
        Err(e) => {
            warn!(job_id, date = %date.label(), error = %e, kind = e.kind(), "failed to persist batch; continuing");
            counter!("augment_batches_failed_total").increment(1);
            report.outcome = BatchOutcome::Failed { cause: e.to_string() };
        }
    }
    report
}
