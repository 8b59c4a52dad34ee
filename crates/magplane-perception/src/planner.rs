//! Pulse planner: turns a filter [`Reading`] into a [`Drive`].
//!
//! Two kinds of pulse are planned per sample:
//!
//! - **Sustain** – while `delta > 0`, every sample injects a pulse whose
//!   amplitude grows and radius shrinks with `delta`, so a steady field
//!   builds a tall, narrow bump.
//! - **Transient** – when `|delta|` exceeds the spike threshold, one extra,
//!   larger pulse is injected.
//!
//! Pulses land at a world position derived from the smoothed lateral axis
//! (X) and the overall magnitude (Z).  Every sample that qualifies injects;
//! there is no cross-sample throttling.

use magplane_types::{
    AnimationTargets, Drive, MagplaneError, PulseRequest, Reading, Vec3, WorldExtent,
    ensure_positive,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub sustain_gain: f32,
    pub sustain_amp_max: f32,
    pub sustain_radius_base: f32,
    pub sustain_radius_shrink: f32,
    pub sustain_radius_min: f32,

    pub transient_amp_scale: f32,
    pub transient_amp_min: f32,
    pub transient_amp_max: f32,
    pub transient_radius_offset: f32,
    pub transient_radius_scale: f32,
    pub transient_radius_min: f32,
    pub transient_radius_max: f32,

    /// Lateral field component (µT) that maps to the plane's edge.
    pub lateral_norm: f32,
    /// Magnitude (µT) that maps to the far edge of the plane.
    pub intensity_norm: f32,
    /// Flip world X to match a mirrored display.
    pub mirror_x: bool,

    pub sway_gain: f32,
    pub sway_max: f32,
    pub tilt_gain: f32,
    pub tilt_max: f32,
    pub bend_gain: f32,
    pub bend_max: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            sustain_gain: 0.15,
            sustain_amp_max: 1.2,
            sustain_radius_base: 2.2,
            sustain_radius_shrink: 0.02,
            sustain_radius_min: 1.0,

            transient_amp_scale: 0.1,
            transient_amp_min: 0.8,
            transient_amp_max: 3.0,
            transient_radius_offset: 1.2,
            transient_radius_scale: 1.0 / 15.0,
            transient_radius_min: 1.0,
            transient_radius_max: 2.5,

            lateral_norm: 60.0,
            intensity_norm: 100.0,
            mirror_x: false,

            sway_gain: 0.02,
            sway_max: 1.2,
            tilt_gain: 0.006,
            tilt_max: 0.25,
            bend_gain: 0.003,
            bend_max: 0.35,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_positive("planner.sustain_amp_max", self.sustain_amp_max)?;
        ensure_positive("planner.sustain_radius_min", self.sustain_radius_min)?;
        ensure_positive("planner.transient_amp_min", self.transient_amp_min)?;
        ensure_positive("planner.transient_radius_min", self.transient_radius_min)?;
        if self.transient_amp_max < self.transient_amp_min {
            return Err(MagplaneError::invalid(
                "planner.transient_amp_max",
                "must be >= planner.transient_amp_min",
            ));
        }
        if self.transient_radius_max < self.transient_radius_min {
            return Err(MagplaneError::invalid(
                "planner.transient_radius_max",
                "must be >= planner.transient_radius_min",
            ));
        }
        ensure_positive("planner.lateral_norm", self.lateral_norm)?;
        ensure_positive("planner.intensity_norm", self.intensity_norm)?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PulsePlanner
// ────────────────────────────────────────────────────────────────────────────

/// Stateless mapping from filter output to pulses and animation targets.
#[derive(Debug, Clone)]
pub struct PulsePlanner {
    config: PlannerConfig,
    spike_threshold: f32,
    world: WorldExtent,
}

impl PulsePlanner {
    pub fn new(config: PlannerConfig, spike_threshold: f32, world: WorldExtent) -> Self {
        Self {
            config,
            spike_threshold,
            world,
        }
    }

    /// Build the [`Drive`] for one field sample.
    pub fn plan(&self, reading: Reading, smoothed: Vec3) -> Drive {
        let mut pulses = Vec::new();

        if let Some(delta) = reading.delta.filter(|_| reading.ready) {
            let (x, z) = self.place(smoothed, reading.magnitude);

            if let Some(p) = self.sustain_pulse(delta, x, z) {
                pulses.push(p);
            }
            if delta.abs() > self.spike_threshold {
                pulses.push(self.transient_pulse(delta.abs(), x, z));
            }
            if !pulses.is_empty() {
                trace!(delta, count = pulses.len(), x, z, "planned pulses");
            }
        }

        Drive {
            reading: Some(reading),
            pulses,
            targets: Some(self.targets(smoothed)),
        }
    }

    /// World `(x, z)` for a smoothed vector of the given magnitude.
    pub fn place(&self, smoothed: Vec3, magnitude: f32) -> (f32, f32) {
        let mut nx = (smoothed.x / self.config.lateral_norm).clamp(-1.0, 1.0);
        if self.config.mirror_x {
            nx = -nx;
        }
        let nz = (magnitude / self.config.intensity_norm).clamp(0.0, 1.0);
        (self.world.half_width * nx, self.world.depth * nz)
    }

    /// Sway/tilt/bend targets from the smoothed field components.
    pub fn targets(&self, smoothed: Vec3) -> AnimationTargets {
        let c = &self.config;
        AnimationTargets {
            sway: (smoothed.x * c.sway_gain).clamp(-c.sway_max, c.sway_max),
            tilt: (smoothed.y * c.tilt_gain).clamp(-c.tilt_max, c.tilt_max),
            bend: (smoothed.z * c.bend_gain).clamp(-c.bend_max, c.bend_max),
        }
    }

    fn sustain_pulse(&self, delta: f32, x: f32, z: f32) -> Option<PulseRequest> {
        if delta <= 0.0 {
            return None;
        }
        let c = &self.config;
        let amplitude = (delta * c.sustain_gain).clamp(0.0, c.sustain_amp_max);
        if amplitude <= 0.0 {
            return None;
        }
        let radius = (c.sustain_radius_base - delta * c.sustain_radius_shrink)
            .max(c.sustain_radius_min);
        Some(PulseRequest {
            x,
            z,
            amplitude,
            radius,
        })
    }

    fn transient_pulse(&self, abs_delta: f32, x: f32, z: f32) -> PulseRequest {
        let c = &self.config;
        PulseRequest {
            x,
            z,
            amplitude: (abs_delta * c.transient_amp_scale)
                .clamp(c.transient_amp_min, c.transient_amp_max),
            radius: (c.transient_radius_offset + abs_delta * c.transient_radius_scale)
                .clamp(c.transient_radius_min, c.transient_radius_max),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> PulsePlanner {
        PulsePlanner::new(PlannerConfig::default(), 6.0, WorldExtent::default())
    }

    fn ready(magnitude: f32, delta: f32) -> Reading {
        Reading {
            magnitude,
            delta: Some(delta),
            ready: true,
        }
    }

    #[test]
    fn no_pulses_during_warmup() {
        let reading = Reading {
            magnitude: 80.0,
            delta: None,
            ready: false,
        };
        let drive = planner().plan(reading, Vec3::new(80.0, 0.0, 0.0));
        assert!(drive.pulses.is_empty());
        // Targets still flow before the baseline is ready.
        assert!(drive.targets.is_some());
    }

    #[test]
    fn small_positive_delta_emits_one_sustain_pulse() {
        let drive = planner().plan(ready(50.0, 2.0), Vec3::new(30.0, 0.0, 40.0));
        assert_eq!(drive.pulses.len(), 1);
        let p = drive.pulses[0];
        assert!((p.amplitude - 0.3).abs() < 1e-6);
        assert!((p.radius - 2.16).abs() < 1e-6);
    }

    #[test]
    fn negative_delta_below_threshold_emits_nothing() {
        let drive = planner().plan(ready(50.0, -3.0), Vec3::new(30.0, 0.0, 40.0));
        assert!(drive.pulses.is_empty());
    }

    #[test]
    fn large_negative_delta_emits_transient_only() {
        let drive = planner().plan(ready(20.0, -12.0), Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(drive.pulses.len(), 1);
        let p = drive.pulses[0];
        assert!((p.amplitude - 1.2).abs() < 1e-5);
        assert!((p.radius - 2.0).abs() < 1e-5);
    }

    #[test]
    fn spike_emits_sustain_and_transient() {
        let drive = planner().plan(ready(70.0, 10.0), Vec3::new(40.0, 0.0, 0.0));
        assert_eq!(drive.pulses.len(), 2);
        assert!(drive.pulses.iter().all(|p| p.amplitude > 0.0 && p.radius > 0.0));
    }

    #[test]
    fn sustain_amplitude_and_radius_are_clamped() {
        let drive = planner().plan(ready(500.0, 400.0), Vec3::new(500.0, 0.0, 0.0));
        let sustain = drive.pulses[0];
        let transient = drive.pulses[1];
        assert!((sustain.amplitude - 1.2).abs() < 1e-6);
        assert!((sustain.radius - 1.0).abs() < 1e-6);
        assert!((transient.amplitude - 3.0).abs() < 1e-6);
        assert!((transient.radius - 2.5).abs() < 1e-6);
    }

    #[test]
    fn placement_clamps_into_world() {
        let p = planner();
        let (x, z) = p.place(Vec3::new(1000.0, 0.0, 0.0), 1000.0);
        assert!((x - 4.0).abs() < 1e-6);
        assert!((z - 22.0).abs() < 1e-6);
        let (x, z) = p.place(Vec3::new(-1000.0, 0.0, 0.0), 0.0);
        assert!((x + 4.0).abs() < 1e-6);
        assert_eq!(z, 0.0);
    }

    #[test]
    fn mirror_flips_lateral_axis() {
        let mirrored = PulsePlanner::new(
            PlannerConfig {
                mirror_x: true,
                ..PlannerConfig::default()
            },
            6.0,
            WorldExtent::default(),
        );
        let (x, _) = mirrored.place(Vec3::new(30.0, 0.0, 0.0), 30.0);
        assert!((x + 2.0).abs() < 1e-6);
    }

    #[test]
    fn targets_follow_components_and_clamp() {
        let t = planner().targets(Vec3::new(10.0, 20.0, 30.0));
        assert!((t.sway - 0.2).abs() < 1e-6);
        assert!((t.tilt - 0.12).abs() < 1e-6);
        assert!((t.bend - 0.09).abs() < 1e-6);

        let t = planner().targets(Vec3::new(-1e4, 1e4, -1e4));
        assert_eq!(t.sway, -1.2);
        assert_eq!(t.tilt, 0.25);
        assert_eq!(t.bend, -0.35);
    }
}
