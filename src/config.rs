//! Tracer configuration.
//!
//! Values only; parsing them from a command line or file is left to the host.

use crate::error::PhaseError;
use crate::quantize::LowActivityPolicy;

/// Configuration for a [`PhaseTracer`](crate::tracer::PhaseTracer).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TracerConfig {
    /// Signature dimensionality `E`; must equal the projection matrix row count.
    /// Default: 16.
    pub signature_len: usize,

    /// Frequency vector length `B`; a power of two equal to the projection
    /// matrix column count. Default: 4096.
    pub vector_len: usize,

    /// Qualifying (memory-access) events per interval. Default: 10_000_000.
    pub interval_size: u64,

    /// Normalized Manhattan distance below which an interval matches a known
    /// phase, in `[0, 1]`. Default: 0.40.
    pub threshold: f64,

    /// Maximum number of stored phases before LRU eviction. `None` (default)
    /// keeps every phase.
    pub capacity: Option<usize>,

    /// Handling of intervals too quiet to quantize. Default: keep raw values.
    pub low_activity: LowActivityPolicy,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            signature_len: 16,
            vector_len: 4096,
            interval_size: 10_000_000,
            threshold: 0.40,
            capacity: None,
            low_activity: LowActivityPolicy::RetainRaw,
        }
    }
}

impl TracerConfig {
    /// Set the threshold from an integer percentage (40 → 0.40).
    pub fn with_threshold_percent(mut self, percent: u32) -> Self {
        self.threshold = percent as f64 / 100.0;
        self
    }

    /// Set the phase table capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Check every field against its accepted domain.
    pub fn validate(&self) -> Result<(), PhaseError> {
        if self.signature_len == 0 {
            return Err(PhaseError::InvalidConfig("signature length must be non-zero"));
        }
        if !self.vector_len.is_power_of_two() {
            return Err(PhaseError::InvalidConfig("vector length must be a power of two"));
        }
        if self.interval_size == 0 {
            return Err(PhaseError::InvalidConfig("interval size must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PhaseError::InvalidConfig("phase threshold must lie in [0, 1]"));
        }
        if self.capacity == Some(0) {
            return Err(PhaseError::InvalidConfig("phase table capacity must be non-zero"));
        }
        Ok(())
    }
}
