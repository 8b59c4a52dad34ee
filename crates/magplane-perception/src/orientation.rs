//! Second-channel tilt source.
//!
//! When the host also delivers a gravity vector (accelerometer), the plane's
//! tilt follows how the device is rolled instead of the field's Y component.

use magplane_types::{MagplaneError, Vec3, ensure_positive, ensure_unit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Per-axis smoothing coefficient for the gravity vector.
    pub smoothing: f32,
    /// Tilt per radian of roll.
    pub tilt_gain: f32,
    /// Symmetric clamp on the tilt target.
    pub tilt_max: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.15,
            tilt_gain: 0.35,
            tilt_max: 0.25,
        }
    }
}

impl OrientationConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_positive("orientation.smoothing", self.smoothing)?;
        ensure_unit("orientation.smoothing", self.smoothing)?;
        ensure_positive("orientation.tilt_max", self.tilt_max)
    }
}

/// Smooths a gravity vector into a clamped tilt target.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    config: OrientationConfig,
    smoothed: Option<Vec3>,
}

impl OrientationTracker {
    pub fn new(config: OrientationConfig) -> Self {
        Self {
            config,
            smoothed: None,
        }
    }

    /// Feed one gravity sample and return the tilt target it implies.
    pub fn update(&mut self, gravity: Vec3) -> f32 {
        let g = match self.smoothed {
            Some(mut s) => {
                s.lerp_toward(gravity, self.config.smoothing);
                s
            }
            None => gravity,
        };
        self.smoothed = Some(g);
        self.tilt_for(g)
    }

    /// `true` once at least one orientation sample has arrived.
    pub fn is_active(&self) -> bool {
        self.smoothed.is_some()
    }

    /// Current tilt target, if the channel is active.
    pub fn tilt(&self) -> Option<f32> {
        self.smoothed.map(|g| self.tilt_for(g))
    }

    /// Forget the gravity history; the tilt target reverts to the field.
    pub fn reset(&mut self) {
        self.smoothed = None;
    }

    fn tilt_for(&self, g: Vec3) -> f32 {
        let roll = g.x.atan2((g.y * g.y + g.z * g.z).sqrt());
        let max = self.config.tilt_max;
        (roll * self.config.tilt_gain).clamp(-max, max)
    }
}
