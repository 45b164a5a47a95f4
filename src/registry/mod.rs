// src/registry/mod.rs
//! Remote source registry: shared types, the HTTP gateway and signed-URL transfers.

pub mod gateway;
pub mod transfer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use gateway::{RegistryConfig, RegistryGateway};
pub use transfer::SignedTransfer;

/// Storage protocol of a source, and the run-wide storage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    S3,
    /// Filesystem copy under a local data dir; offline runs only.
    Local,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::S3 => "s3",
            Protocol::Local => "local",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Protocol::S3),
            "local" => Ok(Protocol::Local),
            other => Err(format!(
                "storage protocol must be either 's3' or 'local', got '{other}'"
            )),
        }
    }
}

/// A registered (or about to be registered) source. Identity is `relative_path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceData {
    pub name: String,
    pub protocol: Protocol,
    pub relative_path: String,
}

impl SourceData {
    pub fn new(name: impl Into<String>, protocol: Protocol, relative_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol,
            relative_path: relative_path.into(),
        }
    }

    /// Last path segment of `relative_path`.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(self.relative_path.as_str())
    }
}

impl fmt::Display for SourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}://{})", self.name, self.protocol, self.relative_path)
    }
}
