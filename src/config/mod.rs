// src/config/mod.rs
//! Run configuration. Precedence: CLI flags / env vars > TOML file > defaults.

pub mod file;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::{Protocol, RegistryConfig};
use file::FileConfig;

const DEFAULT_WORK_DIR: &str = "./.tmp";
const DEFAULT_LOCAL_DATA_DIR: &str = "data";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SCHEME: &str = "http";
const DEFAULT_CLIENT_ID: u32 = 1;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RUN_BUDGET_SECS: u64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Correlate satellite wildfire detections with social-media posts by date.
#[derive(Debug, Clone, Parser)]
#[command(name = "wildfire-augment", version)]
pub struct Args {
    /// The job id
    #[arg(long, env = "AUGMENT_JOB_ID", default_value = "1")]
    pub job_id: String,

    /// The tracer id
    #[arg(long, env = "AUGMENT_TRACER_ID", default_value = "1")]
    pub tracer_id: String,

    /// Scratch directory for downloads and generated batches
    #[arg(long, env = "AUGMENT_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    #[arg(long, env = "KERNEL_PLANCKSTER_HOST")]
    pub kp_host: Option<String>,

    #[arg(long, env = "KERNEL_PLANCKSTER_PORT")]
    pub kp_port: Option<u16>,

    #[arg(long, env = "KERNEL_PLANCKSTER_SCHEME")]
    pub kp_scheme: Option<String>,

    #[arg(long, env = "KERNEL_PLANCKSTER_AUTH_TOKEN", hide_env_values = true)]
    pub kp_auth_token: Option<String>,

    #[arg(long, env = "KERNEL_PLANCKSTER_CLIENT_ID")]
    pub kp_client_id: Option<u32>,

    /// s3 | local
    #[arg(long, env = "STORAGE_PROTOCOL")]
    pub storage_protocol: Option<Protocol>,

    /// Root for local-mode artifacts
    #[arg(long, env = "LOCAL_DATA_DIR")]
    pub local_data_dir: Option<PathBuf>,

    #[arg(long, env = "AUGMENT_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "AUGMENT_RUN_BUDGET_SECS")]
    pub run_budget_secs: Option<u64>,

    /// TOML settings file (falls back to config/augment.toml)
    #[arg(long, env = file::ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `wildfire_augment=debug`; RUST_LOG wins when set
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub report: bool,

    /// Write the run's metrics (Prometheus text format) to this file
    #[arg(long, env = "AUGMENT_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentConfig {
    pub job_id: String,
    pub tracer_id: String,
    pub work_dir: PathBuf,
    pub storage_protocol: Protocol,
    pub local_data_dir: PathBuf,
    pub run_budget: Duration,
    pub registry: RegistryConfig,
}

impl AugmentConfig {
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        if args.job_id.trim().is_empty() || args.tracer_id.trim().is_empty() {
            bail!("job_id and tracer_id must both be set");
        }

        let storage_protocol = match (args.storage_protocol, file.storage_protocol.as_deref()) {
            (Some(p), _) => p,
            (None, Some(s)) => s.parse().map_err(anyhow::Error::msg)?,
            (None, None) => Protocol::S3,
        };

        let reg = file.registry;
        let auth_token = args
            .kp_auth_token
            .clone()
            .or(reg.auth_token)
            .filter(|t| !t.trim().is_empty());
        let Some(auth_token) = auth_token else {
            bail!("KERNEL_PLANCKSTER_AUTH_TOKEN must be set");
        };
        let host = args
            .kp_host
            .clone()
            .or(reg.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            bail!("KERNEL_PLANCKSTER_HOST must not be empty");
        }

        let timeout_secs = args
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let budget_secs = args
            .run_budget_secs
            .or(file.run_budget_secs)
            .unwrap_or(DEFAULT_RUN_BUDGET_SECS);
        if timeout_secs == 0 || budget_secs == 0 {
            bail!("request timeout and run budget must be positive");
        }

        Ok(Self {
            job_id: args.job_id.clone(),
            tracer_id: args.tracer_id.clone(),
            work_dir: args
                .work_dir
                .clone()
                .or(file.work_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
            storage_protocol,
            local_data_dir: args
                .local_data_dir
                .clone()
                .or(file.local_data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_DATA_DIR)),
            run_budget: Duration::from_secs(budget_secs),
            registry: RegistryConfig {
                scheme: args
                    .kp_scheme
                    .clone()
                    .or(reg.scheme)
                    .unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
                host,
                port: args.kp_port.or(reg.port).unwrap_or(DEFAULT_PORT),
                auth_token,
                client_id: args.kp_client_id.or(reg.client_id).unwrap_or(DEFAULT_CLIENT_ID),
                request_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}
