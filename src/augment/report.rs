// src/augment/report.rs
//! Run-level summary: coarse job state plus one entry per detection file.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::CoverageGateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Finished,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Uploaded and registered (or copied, in local mode).
    Persisted { relative_path: String },
    /// No social post matched the capture date.
    Discarded,
    /// Serialization or push failed; the run went on.
    Failed { cause: String },
    /// The file name or contents could not be read as detections.
    Unreadable { cause: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub detection_file: PathBuf,
    /// `{year}_{Month}_{day}`, absent when the date could not be parsed.
    pub date: Option<String>,
    pub detection_rows: usize,
    pub twitter_matches: usize,
    pub telegram_matches: usize,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub job_id: String,
    pub tracer_id: String,
    pub state: JobState,
    /// Why the run failed, if it did.
    pub cause: Option<String>,
    /// Set when the coverage gate stopped the run before correlation.
    pub gate: Option<CoverageGateError>,
    pub batches: Vec<BatchReport>,
}

impl RunReport {
    pub fn new(job_id: &str, tracer_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            tracer_id: tracer_id.to_string(),
            state: JobState::Finished,
            cause: None,
            gate: None,
            batches: Vec::new(),
        }
    }

    /// Fail in place; batches recorded so far are kept.
    pub fn mark_failed(&mut self, cause: impl Into<String>) {
        self.state = JobState::Failed;
        self.cause = Some(cause.into());
    }

    pub fn succeeded(&self) -> bool {
        self.state == JobState::Finished
    }

    fn count(&self, pred: impl Fn(&BatchOutcome) -> bool) -> usize {
        self.batches.iter().filter(|b| pred(&b.outcome)).count()
    }

    pub fn persisted(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Persisted { .. }))
    }

    pub fn discarded(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Discarded))
    }

    /// Batches that should have been written but were not.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Failed { .. } | BatchOutcome::Unreadable { .. }))
    }

    pub fn persisted_paths(&self) -> Vec<&str> {
        self.batches
            .iter()
            .filter_map(|b| match &b.outcome {
                BatchOutcome::Persisted { relative_path } => Some(relative_path.as_str()),
                _ => None,
            })
            .collect()
    }
}
