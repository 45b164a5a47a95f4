use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Process-wide Prometheus recorder. One per process.
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. Fails if one is already installed.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { handle })
    }

    /// Current values in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
