// src/registry/transfer.rs
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{AugmentError, Result};

/// Plain HTTP PUT/GET against pre-signed object URLs. Success is strictly 200.
#[derive(Clone)]
pub struct SignedTransfer {
    client: Client,
}

impl SignedTransfer {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// PUT the bytes of `local_file` to `signed_url`. Returns the byte count.
    pub async fn upload(&self, signed_url: &str, local_file: &Path) -> Result<u64> {
        let bytes = tokio::fs::read(local_file).await?;
        let len = bytes.len() as u64;
        let resp = self.client.put(signed_url).body(bytes).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(AugmentError::Transfer {
                direction: "upload",
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        debug!(bytes = len, file = %local_file.display(), "uploaded to signed url");
        Ok(len)
    }

    /// GET `signed_url` into `dest`, creating missing parent directories first.
    pub async fn download(&self, signed_url: &str, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let resp = self.client.get(signed_url).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(AugmentError::Transfer {
                direction: "download",
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let bytes = resp.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!(bytes = bytes.len(), file = %dest.display(), "downloaded from signed url");
        Ok(bytes.len() as u64)
    }
}
