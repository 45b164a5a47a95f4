// src/storage/remote.rs
use async_trait::async_trait;
use metrics::counter;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::{ArtifactKind, ArtifactStore};
use crate::error::Result;
use crate::registry::{Protocol, RegistryGateway, SignedTransfer, SourceData};

/// Object store behind signed URLs, with every upload registered afterwards.
pub struct RemoteStore {
    registry: Arc<RegistryGateway>,
    transfer: SignedTransfer,
}

impl RemoteStore {
    pub fn new(registry: Arc<RegistryGateway>, transfer: SignedTransfer) -> Self {
        Self { registry, transfer }
    }
}

#[async_trait]
impl ArtifactStore for RemoteStore {
    fn protocol(&self) -> Protocol {
        Protocol::S3
    }

    async fn store(
        &self,
        kind: ArtifactKind,
        source: &SourceData,
        job_id: &str,
        local_file: &Path,
    ) -> Result<SourceData> {
        let signed_url = self.registry.issue_upload_url(source).await?;

        info!(job_id, %kind, relative_path = %source.relative_path, "uploading to object store");
        let bytes = self.transfer.upload(&signed_url, local_file).await.inspect_err(|e| {
            counter!("augment_transfer_errors_total").increment(1);
            warn!(job_id, %kind, error = %e, "upload failed");
        })?;
        info!(job_id, %kind, bytes, relative_path = %source.relative_path, "uploaded");

        // The blob is already in the bucket; a failed registration leaves it orphaned.
        match self.registry.register(source).await {
            Ok(confirmed) => Ok(confirmed),
            Err(e) => {
                warn!(
                    job_id,
                    %kind,
                    relative_path = %source.relative_path,
                    error = %e,
                    "registration failed after upload; object left unregistered"
                );
                Err(e)
            }
        }
    }

    async fn fetch(
        &self,
        kind: ArtifactKind,
        source: &SourceData,
        job_id: &str,
        dest: &Path,
    ) -> Result<()> {
        let signed_url = self.registry.issue_download_url(source).await?;

        info!(job_id, %kind, relative_path = %source.relative_path, "downloading from object store");
        let bytes = self.transfer.download(&signed_url, dest).await.inspect_err(|e| {
            counter!("augment_transfer_errors_total").increment(1);
            warn!(job_id, %kind, error = %e, "download failed");
        })?;
        info!(job_id, %kind, bytes, dest = %dest.display(), "downloaded");
        Ok(())
    }
}
