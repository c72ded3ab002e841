use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis_latency_ms: u64,
    pub poll_interval_ms: u64,
    pub max_occupancy: u8,
    pub crowded_threshold: u8,
    /// Upper bound (exclusive) for the numeric suffix of synthesized names.
    pub name_pool: u32,
    pub id_pool: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            analysis_latency_ms: 1500,
            poll_interval_ms: 3000,
            max_occupancy: 100,
            crowded_threshold: 75,
            name_pool: 100,
            id_pool: 1000,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Settings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.analysis_latency_ms > 0, "analysis_latency_ms must be positive");
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(self.max_occupancy <= 100, "max_occupancy cannot exceed 100");
        ensure!(
            self.crowded_threshold <= self.max_occupancy,
            "crowded_threshold cannot exceed max_occupancy"
        );
        ensure!(self.name_pool > 0, "name_pool must be non-zero");
        ensure!(self.id_pool > 0, "id_pool must be non-zero");
        Ok(())
    }

    pub fn analysis_latency(&self) -> Duration {
        Duration::from_millis(self.analysis_latency_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
