// src/storage/local.rs
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ArtifactKind, ArtifactStore};
use crate::error::{AugmentError, Result};
use crate::registry::{Protocol, SourceData};

/// Maps a source identity to `<data_dir>/<relative_path>`.
#[derive(Debug, Clone)]
pub struct LocalFileRepository {
    data_dir: PathBuf,
}

impl LocalFileRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn logical_path(&self, source: &SourceData) -> PathBuf {
        self.data_dir.join(&source.relative_path)
    }

    /// `local://<path>` as recorded by the scrapers.
    pub fn pfn(path: &Path) -> String {
        format!("{}://{}", Protocol::Local, path.display())
    }

    /// Copy `local_file` to the logical path of `source`. The original stays put.
    pub async fn store(&self, local_file: &Path, source: &SourceData) -> Result<PathBuf> {
        let target = self.logical_path(source);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_file, &target).await?;
        Ok(target)
    }
}

pub struct LocalStore {
    files: LocalFileRepository,
}

impl LocalStore {
    pub fn new(files: LocalFileRepository) -> Self {
        Self { files }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    fn protocol(&self) -> Protocol {
        Protocol::Local
    }

    async fn store(
        &self,
        kind: ArtifactKind,
        source: &SourceData,
        job_id: &str,
        local_file: &Path,
    ) -> Result<SourceData> {
        info!(job_id, %kind, relative_path = %source.relative_path, "saving locally");
        let target = self.files.store(local_file, source).await?;
        info!(
            job_id,
            %kind,
            pfn = %LocalFileRepository::pfn(&target),
            "saved locally"
        );
        Ok(source.clone())
    }

    async fn fetch(
        &self,
        _kind: ArtifactKind,
        _source: &SourceData,
        _job_id: &str,
        _dest: &Path,
    ) -> Result<()> {
        Err(AugmentError::Unsupported {
            operation: "download",
            protocol: Protocol::Local.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_copies_into_relative_path_and_keeps_source() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("in.json");
        std::fs::write(&src, b"{}").unwrap();

        let repo = LocalFileRepository::new(tmp.path().join("data"));
        let sd = SourceData::new("n", Protocol::Local, "augmented/by_date/x.json");
        let out = repo.store(&src, &sd).await.unwrap();

        assert_eq!(out, tmp.path().join("data/augmented/by_date/x.json"));
        assert!(out.exists());
        assert!(src.exists());
        assert!(LocalFileRepository::pfn(&out).starts_with("local://"));
    }
}
