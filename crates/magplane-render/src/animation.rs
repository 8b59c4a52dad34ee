//! Plane animation parameters.
//!
//! Targets may jump every sample; the on-screen values only ever move by a
//! fixed fraction of the remaining gap per tick.

use magplane_types::{AnimationTargets, MagplaneError, ensure_positive, ensure_unit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Fraction of the remaining gap closed per tick.
    pub blend: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { blend: 0.08 }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_positive("animation.blend", self.blend)?;
        ensure_unit("animation.blend", self.blend)
    }
}

/// Current sway, tilt and bend of the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    pub sway: f32,
    pub tilt: f32,
    pub bend: f32,
}

impl AnimationState {
    /// Move each parameter `blend` of the way toward its target.
    pub fn advance(&mut self, targets: AnimationTargets, blend: f32) {
        self.sway += blend * (targets.sway - self.sway);
        self.tilt += blend * (targets.tilt - self.tilt);
        self.bend += blend * (targets.bend - self.bend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGETS: AnimationTargets = AnimationTargets {
        sway: 1.0,
        tilt: -0.2,
        bend: 0.3,
    };

    #[test]
    fn advance_closes_fixed_fraction_of_gap() {
        let mut a = AnimationState::default();
        a.advance(TARGETS, 0.08);
        assert!((a.sway - 0.08).abs() < 1e-6);
        assert!((a.tilt + 0.016).abs() < 1e-6);
        assert!((a.bend - 0.024).abs() < 1e-6);
    }

    #[test]
    fn converges_without_overshoot() {
        let mut a = AnimationState::default();
        let mut prev_gap = f32::INFINITY;
        for _ in 0..300 {
            a.advance(TARGETS, 0.08);
            let gap = (TARGETS.sway - a.sway).abs();
            assert!(gap <= prev_gap);
            assert!(a.sway <= TARGETS.sway);
            prev_gap = gap;
        }
        assert!((a.sway - 1.0).abs() < 1e-4);
        assert!((a.tilt + 0.2).abs() < 1e-4);
    }

    #[test]
    fn stays_put_at_target() {
        let mut a = AnimationState {
            sway: 1.0,
            tilt: -0.2,
            bend: 0.3,
        };
        a.advance(TARGETS, 0.08);
        assert_eq!(a, AnimationState { sway: 1.0, tilt: -0.2, bend: 0.3 });
    }
}
