//! Adaptive sensor filter.
//!
//! Smooths raw field vectors, learns a baseline over a warmup window and then
//! tracks slow drift while refusing to absorb sustained anomalies into
//! "normal".
//!
//! The baseline adaptation rate is a three-band step function of how far the
//! current magnitude sits from the baseline, measured in units of the spike
//! threshold:
//!
//! ```text
//! |m - b| <  0.7·T  → baseline_rate           (slow drift)
//! |m - b| >= 0.7·T  → baseline_rate_elevated  (near frozen)
//! |m - b| >= 1.2·T  → 0                       (frozen)
//! ```
//!
//! # Example
//!
//! ```rust
//! use magplane_perception::filter::{FilterConfig, SensorFilter};
//! use magplane_types::Vec3;
//!
//! let mut filter = SensorFilter::new(FilterConfig {
//!     warmup_samples: 2,
//!     ..FilterConfig::default()
//! });
//!
//! let first = filter.update(Vec3::new(3.0, 4.0, 0.0));
//! assert!(!first.ready);
//! assert!(first.delta.is_none());
//!
//! let second = filter.update(Vec3::new(3.0, 4.0, 0.0));
//! assert!(second.ready);
//! assert!((filter.baseline().unwrap() - 5.0).abs() < 1e-5);
//! ```

use magplane_types::{MagplaneError, Reading, Vec3, ensure_positive, ensure_unit};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Tuning for [`SensorFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Per-axis exponential smoothing coefficient.
    pub smoothing: f32,
    /// Number of samples averaged into the initial baseline.
    pub warmup_samples: u32,
    /// Baseline drift rate while the signal sits near the baseline.
    pub baseline_rate: f32,
    /// Baseline drift rate while the signal is moderately elevated.
    pub baseline_rate_elevated: f32,
    /// Absolute delta (µT) that counts as a spike.
    pub spike_threshold: f32,
    /// Multiple of `spike_threshold` where the elevated band starts.
    pub elevated_band: f32,
    /// Multiple of `spike_threshold` where the baseline freezes.
    pub frozen_band: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.10,
            warmup_samples: 20,
            baseline_rate: 0.005,
            baseline_rate_elevated: 0.0005,
            spike_threshold: 6.0,
            elevated_band: 0.7,
            frozen_band: 1.2,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_positive("filter.smoothing", self.smoothing)?;
        ensure_unit("filter.smoothing", self.smoothing)?;
        if self.warmup_samples == 0 {
            return Err(MagplaneError::invalid(
                "filter.warmup_samples",
                "at least one warmup sample is required",
            ));
        }
        ensure_unit("filter.baseline_rate", self.baseline_rate)?;
        ensure_unit("filter.baseline_rate_elevated", self.baseline_rate_elevated)?;
        if self.baseline_rate_elevated > self.baseline_rate {
            return Err(MagplaneError::invalid(
                "filter.baseline_rate_elevated",
                "must not exceed filter.baseline_rate",
            ));
        }
        ensure_positive("filter.spike_threshold", self.spike_threshold)?;
        ensure_positive("filter.elevated_band", self.elevated_band)?;
        if self.frozen_band <= self.elevated_band {
            return Err(MagplaneError::invalid(
                "filter.frozen_band",
                "must be greater than filter.elevated_band",
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SensorFilter
// ────────────────────────────────────────────────────────────────────────────

/// Smoothing, warmup and adaptive-baseline stage for the field channel.
#[derive(Debug, Clone)]
pub struct SensorFilter {
    config: FilterConfig,
    smoothed: Option<Vec3>,
    magnitude: f32,
    baseline: Option<f32>,
    /// Accumulated warmup magnitudes.  `f64` keeps the mean exact enough
    /// for long windows.
    warmup_sum: f64,
    warmup_count: u32,
}

impl SensorFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            smoothed: None,
            magnitude: 0.0,
            baseline: None,
            warmup_sum: 0.0,
            warmup_count: 0,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Feed one raw sample and return the resulting [`Reading`].
    pub fn update(&mut self, raw: Vec3) -> Reading {
        let smoothed = match self.smoothed {
            Some(mut s) => {
                s.lerp_toward(raw, self.config.smoothing);
                s
            }
            // Cold start: adopt the first sample as-is.
            None => raw,
        };
        self.smoothed = Some(smoothed);
        let magnitude = smoothed.norm();
        self.magnitude = magnitude;

        let Some(mut baseline) = self.baseline else {
            self.warmup_sum += f64::from(magnitude);
            self.warmup_count += 1;

            if self.warmup_count < self.config.warmup_samples {
                return Reading {
                    magnitude,
                    delta: None,
                    ready: false,
                };
            }

            let mean = (self.warmup_sum / f64::from(self.warmup_count)) as f32;
            self.baseline = Some(mean);
            debug!(baseline = mean, samples = self.warmup_count, "filter warmup complete");
            return Reading {
                magnitude,
                delta: Some(magnitude - mean),
                ready: true,
            };
        };

        let rate = self.adaptation_rate((magnitude - baseline).abs());
        baseline += rate * (magnitude - baseline);
        self.baseline = Some(baseline);

        Reading {
            magnitude,
            delta: Some(magnitude - baseline),
            ready: true,
        }
    }

    /// Baseline drift rate for a given `|magnitude - baseline|` gap.
    ///
    /// Non-increasing in `gap`: idle rate, then elevated rate, then zero.
    pub fn adaptation_rate(&self, gap: f32) -> f32 {
        let threshold = self.config.spike_threshold;
        if gap >= self.config.frozen_band * threshold {
            0.0
        } else if gap >= self.config.elevated_band * threshold {
            self.config.baseline_rate_elevated
        } else {
            self.config.baseline_rate
        }
    }

    /// The smoothed vector, or zero before the first sample.
    pub fn smoothed(&self) -> Vec3 {
        self.smoothed.unwrap_or(Vec3::ZERO)
    }

    /// Magnitude of the most recent smoothed vector.
    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    /// The baseline once warmup has completed.
    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    pub fn is_ready(&self) -> bool {
        self.baseline.is_some()
    }

    /// Return to the cold-start state.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.magnitude = 0.0;
        self.baseline = None;
        self.warmup_sum = 0.0;
        self.warmup_count = 0;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
