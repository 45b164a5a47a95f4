// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod augment;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::augment::{run, run_with_budget, AugmentJob};
pub use crate::error::{AugmentError, CoverageGateError};
pub use crate::registry::{Protocol, SourceData};
pub use crate::storage::ArtifactRepository;

use std::sync::Arc;

use crate::config::AugmentConfig;
use crate::registry::{RegistryGateway, SignedTransfer};

/// Build the gateway and storage facade for `cfg`. The storage mode is fixed here.
pub fn build_repository(cfg: &AugmentConfig) -> error::Result<ArtifactRepository> {
    let registry = Arc::new(RegistryGateway::new(cfg.registry.clone())?);
    let transfer = SignedTransfer::new(cfg.registry.request_timeout)?;
    Ok(ArtifactRepository::for_protocol(
        cfg.storage_protocol,
        registry,
        transfer,
        cfg.local_data_dir.clone(),
    ))
}
