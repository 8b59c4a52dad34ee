//! Shared value types for the magplane pipeline.
//!
//! Everything that crosses a crate boundary lives here: raw sensor events,
//! filter readings, pulse requests, the per-sample [`Drive`] value, projected
//! points and the workspace-wide [`MagplaneError`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 3-component sample vector (µT for the field channel, m/s² for the
/// orientation channel).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm.  Always `>= 0`.
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Move each axis toward `target` by `alpha` of the remaining gap.
    pub fn lerp_toward(&mut self, target: Vec3, alpha: f32) {
        self.x += alpha * (target.x - self.x);
        self.y += alpha * (target.y - self.y);
        self.z += alpha * (target.z - self.z);
    }
}

/// Which physical sensor produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorChannel {
    /// Magnetic field strength.
    Field,
    /// Gravity / accelerometer vector used for plane tilt.
    Orientation,
}

/// One sample delivered by a sample source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEvent {
    pub channel: SensorChannel,
    pub vector: Vec3,
    pub timestamp: DateTime<Utc>,
}

impl SensorEvent {
    /// A field-strength sample stamped with the current time.
    pub fn field(vector: Vec3) -> Self {
        Self {
            channel: SensorChannel::Field,
            vector,
            timestamp: Utc::now(),
        }
    }

    /// An orientation sample stamped with the current time.
    pub fn orientation(vector: Vec3) -> Self {
        Self {
            channel: SensorChannel::Orientation,
            vector,
            timestamp: Utc::now(),
        }
    }
}

/// Output of the sensor filter for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Norm of the smoothed vector.
    pub magnitude: f32,
    /// `magnitude - baseline`; `None` until the warmup window completes.
    pub delta: Option<f32>,
    /// `true` once the baseline has been established.
    pub ready: bool,
}

/// A Gaussian bump to inject into the heightfield, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseRequest {
    pub x: f32,
    pub z: f32,
    pub amplitude: f32,
    pub radius: f32,
}

/// Target values the animation chases.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationTargets {
    /// Lateral shift of the plane.
    pub sway: f32,
    /// Height change per unit of world X.
    pub tilt: f32,
    /// Height change across the depth of the plane.
    pub bend: f32,
}

/// Everything one sensor sample asks of the rest of the pipeline.
///
/// Produced by the planner and consumed by value: pulses go to the field
/// simulator, targets replace the animation targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drive {
    pub reading: Option<Reading>,
    pub pulses: Vec<PulseRequest>,
    pub targets: Option<AnimationTargets>,
}

/// World-space extent of the plane: X spans `[-half_width, half_width]`,
/// Z spans `[0, depth]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldExtent {
    pub half_width: f32,
    pub depth: f32,
}

impl Default for WorldExtent {
    fn default() -> Self {
        Self {
            half_width: 4.0,
            depth: 22.0,
        }
    }
}

/// A projected grid node in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
    /// Camera-relative depth (always greater than the projector epsilon).
    pub depth: f32,
}

/// Size of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1920.0,
        }
    }
}

/// Text readout of the latest filter state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readout {
    pub magnitude: f32,
    pub delta: Option<f32>,
}

impl Readout {
    /// Marker shown in place of delta during warmup.
    pub const UNAVAILABLE: &'static str = "—";

    pub fn magnitude_text(&self) -> String {
        format!("Mag: {:.1} µT", self.magnitude)
    }

    pub fn delta_text(&self) -> String {
        match self.delta {
            Some(d) => format!("Δ: {d:.1} µT"),
            None => format!("Δ: {}", Self::UNAVAILABLE),
        }
    }
}

impl From<Reading> for Readout {
    fn from(r: Reading) -> Self {
        Self {
            magnitude: r.magnitude,
            delta: r.delta,
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.magnitude_text(), self.delta_text())
    }
}

/// Workspace-wide error type.
///
/// The numeric core never fails once constructed; errors only arise from
/// configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MagplaneError {
    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl MagplaneError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Reject `value` unless it is finite and strictly positive.
pub fn ensure_positive(field: &'static str, value: f32) -> Result<(), MagplaneError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MagplaneError::invalid(field, format!("must be > 0, got {value}")))
    }
}

/// Reject `value` unless it lies in the closed unit interval.
pub fn ensure_unit(field: &'static str, value: f32) -> Result<(), MagplaneError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MagplaneError::invalid(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}
