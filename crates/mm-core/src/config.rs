//! Orchestrator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of the orchestration core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Documents sampled per collection during discovery
    pub sample_size: u32,
    /// Ask the backend for AI-assisted analysis
    pub include_ai: bool,
    /// Progress poll period while a run is active
    pub poll_interval_ms: u64,
}

impl OrchestratorConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With sample size
    #[inline]
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: u32) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// With AI-assisted analysis
    #[inline]
    #[must_use]
    pub fn with_include_ai(mut self, include_ai: bool) -> Self {
        self.include_ai = include_ai;
        self
    }

    /// With poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Poll period; never zero
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            include_ai: false,
            poll_interval_ms: 2000,
        }
    }
}
