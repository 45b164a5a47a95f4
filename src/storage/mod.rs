// src/storage/mod.rs
//! Storage facade.
//!
//! The storage mode is resolved once at startup into one [`ArtifactStore`]
//! implementation: [`RemoteStore`] (signed URL transfer + registration) or
//! [`LocalStore`] (plain copy under a data dir, no registration).
//! [`ArtifactRepository`] is what the rest of the crate talks to.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::{Protocol, RegistryGateway, SignedTransfer, SourceData};

pub use local::{LocalFileRepository, LocalStore};
pub use remote::RemoteStore;

/// What kind of artifact is being moved. Only affects logging today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Photo,
    VideoOrDocument,
    StructuredRecord,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Photo => "photo",
            ArtifactKind::VideoOrDocument => "video",
            ArtifactKind::StructuredRecord => "json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One storage mode. Implementations must not keep per-call state.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Push `local_file` under the identity of `source`.
    async fn store(
        &self,
        kind: ArtifactKind,
        source: &SourceData,
        job_id: &str,
        local_file: &Path,
    ) -> Result<SourceData>;

    /// Pull the bytes behind `source` into `dest`.
    async fn fetch(
        &self,
        kind: ArtifactKind,
        source: &SourceData,
        job_id: &str,
        dest: &Path,
    ) -> Result<()>;
}

/// Entry point for moving scraped and augmented artifacts.
pub struct ArtifactRepository {
    registry: Arc<RegistryGateway>,
    store: Box<dyn ArtifactStore>,
}

impl ArtifactRepository {
    pub fn new(registry: Arc<RegistryGateway>, store: Box<dyn ArtifactStore>) -> Self {
        Self { registry, store }
    }

    /// Pick the store for `protocol`. Called once per run.
    pub fn for_protocol(
        protocol: Protocol,
        registry: Arc<RegistryGateway>,
        transfer: SignedTransfer,
        local_data_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        let store: Box<dyn ArtifactStore> = match protocol {
            Protocol::S3 => Box::new(RemoteStore::new(registry.clone(), transfer)),
            Protocol::Local => Box::new(LocalStore::new(LocalFileRepository::new(local_data_dir))),
        };
        Self::new(registry, store)
    }

    pub fn protocol(&self) -> Protocol {
        self.store.protocol()
    }

    pub fn registry(&self) -> &RegistryGateway {
        &self.registry
    }

    pub async fn list_sources(&self) -> Result<Vec<SourceData>> {
        self.registry.list_all().await
    }

    pub async fn register_photo(
        &self,
        source: &SourceData,
        job_id: &str,
        local_file: &Path,
    ) -> Result<SourceData> {
        self.store
            .store(ArtifactKind::Photo, source, job_id, local_file)
            .await
    }

    pub async fn register_video_or_document(
        &self,
        source: &SourceData,
        job_id: &str,
        local_file: &Path,
    ) -> Result<SourceData> {
        self.store
            .store(ArtifactKind::VideoOrDocument, source, job_id, local_file)
            .await
    }

    pub async fn register_json(
        &self,
        source: &SourceData,
        job_id: &str,
        local_file: &Path,
    ) -> Result<SourceData> {
        self.store
            .store(ArtifactKind::StructuredRecord, source, job_id, local_file)
            .await
    }

    pub async fn download_json(&self, source: &SourceData, job_id: &str, dest: &Path) -> Result<()> {
        self.store
            .fetch(ArtifactKind::StructuredRecord, source, job_id, dest)
            .await
    }
}
