// src/augment/discovery.rs
use metrics::counter;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::classify::SourceKind;
use crate::error::{CoverageGateError, Result};
use crate::storage::ArtifactRepository;

/// Everything discovery downloaded, grouped by kind. Immutable after discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub detection_files: Vec<PathBuf>,
    pub twitter_files: Vec<PathBuf>,
    pub telegram_files: Vec<PathBuf>,
    pub ignored: usize,
    /// Relative path of every source the registry listed, recognized or not.
    pub registered: BTreeSet<String>,
}

impl Discovery {
    pub fn has_detections(&self) -> bool {
        !self.detection_files.is_empty()
    }

    pub fn has_twitter(&self) -> bool {
        !self.twitter_files.is_empty()
    }

    pub fn has_telegram(&self) -> bool {
        !self.telegram_files.is_empty()
    }

    /// Correlation needs detections and at least one social source.
    pub fn gate(&self) -> std::result::Result<(), CoverageGateError> {
        if self.has_detections() && (self.has_twitter() || self.has_telegram()) {
            return Ok(());
        }
        Err(CoverageGateError {
            detections: self.has_detections(),
            twitter: self.has_twitter(),
            telegram: self.has_telegram(),
        })
    }

    fn files_mut(&mut self, kind: SourceKind) -> Option<&mut Vec<PathBuf>> {
        match kind {
            SourceKind::Detection => Some(&mut self.detection_files),
            SourceKind::TwitterPost => Some(&mut self.twitter_files),
            SourceKind::TelegramPost => Some(&mut self.telegram_files),
            SourceKind::Unrecognized => None,
        }
    }
}

/// List every registered source and download the relevant ones into `work_dir`.
/// Any listing or download failure aborts discovery.
pub async fn discover(repo: &ArtifactRepository, job_id: &str, work_dir: &Path) -> Result<Discovery> {
    let sources = repo.list_sources().await?;
    info!(job_id, count = sources.len(), "listed registered sources");

    let mut found = Discovery {
        registered: sources.iter().map(|s| s.relative_path.clone()).collect(),
        ..Discovery::default()
    };
    for source in sources {
        let kind = SourceKind::classify(&source.relative_path);
        let Some(subdir) = kind.work_subdir() else {
            debug!(job_id, relative_path = %source.relative_path, "ignoring unrecognized source");
            counter!("augment_sources_ignored_total").increment(1);
            found.ignored += 1;
            continue;
        };

        let dest = work_dir.join(subdir).join(source.file_name());
        repo.download_json(&source, job_id, &dest).await?;
        counter!("augment_sources_downloaded_total", "kind" => kind.as_str()).increment(1);

        if let Some(files) = found.files_mut(kind) {
            // Same file name registered twice lands on the same path.
            if !files.contains(&dest) {
                files.push(dest);
            }
        }
    }

    info!(
        job_id,
        detections = found.detection_files.len(),
        twitter = found.twitter_files.len(),
        telegram = found.telegram_files.len(),
        ignored = found.ignored,
        "discovery finished"
    );
    Ok(found)
}
