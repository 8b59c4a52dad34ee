//! Pipeline state owner.
//!
//! A [`Session`] holds the filter, planner, heightfield, stabilizer,
//! animation and projector for one visualisation.  It is driven from two
//! directions:
//!
//! - **Samples** ([`Session::on_sample`]): field samples are filtered and
//!   planned into a [`Drive`], which is then applied: pulses into the
//!   heightfield, targets into the animation.  Orientation samples only move
//!   the tilt target.
//! - **Ticks** ([`Session::tick`]): heightfield step, stabilizer update,
//!   animation chase, projection into a [`RenderFrame`].
//!
//! All configuration is validated once in [`Session::new`]; afterwards no
//! operation fails.
//!
//! # Example
//!
//! ```rust
//! use magplane_runtime::session::{Session, SessionConfig};
//! use magplane_types::{SensorEvent, Vec3};
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! session.on_sample(&SensorEvent::field(Vec3::new(20.0, -30.0, -35.0)));
//! let frame = session.tick();
//! assert_eq!(frame.tick, 0);
//! assert_eq!(session.readout().delta_text(), "Δ: —");
//! ```

use magplane_field::{FieldConfig, FieldSimulator, HeightGrid, StabilizerConfig, VisualStabilizer};
use magplane_perception::{
    FilterConfig, OrientationConfig, OrientationTracker, PlannerConfig, PulsePlanner, SensorFilter,
};
use magplane_render::{
    AnimationConfig, AnimationState, CameraConfig, FrameBuilder, FrameConfig, PerspectiveProjector,
    RenderFrame,
};
use magplane_types::{
    AnimationTargets, Drive, MagplaneError, Readout, Reading, SensorChannel, SensorEvent, Vec3,
    Viewport,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Every tunable of the pipeline, grouped by stage.
///
/// Each section falls back to its defaults when missing from a TOML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub filter: FilterConfig,
    pub orientation: OrientationConfig,
    pub planner: PlannerConfig,
    pub field: FieldConfig,
    pub stabilizer: StabilizerConfig,
    pub animation: AnimationConfig,
    pub camera: CameraConfig,
    pub frame: FrameConfig,
    pub viewport: Viewport,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        self.filter.validate()?;
        self.orientation.validate()?;
        self.planner.validate()?;
        self.field.validate()?;
        self.stabilizer.validate()?;
        self.animation.validate()?;
        self.camera.validate()?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    filter: SensorFilter,
    orientation: OrientationTracker,
    planner: PulsePlanner,
    field: FieldSimulator,
    stabilizer: VisualStabilizer,
    animation: AnimationState,
    targets: AnimationTargets,
    blend: f32,
    projector: PerspectiveProjector,
    frames: FrameBuilder,
    readout: Readout,
    ticks: u64,
    samples: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, MagplaneError> {
        config.validate()?;

        let world = config.field.world;
        let (cols, rows) = (config.field.cols, config.field.rows);
        let planner = PulsePlanner::new(config.planner, config.filter.spike_threshold, world);
        let session = Self {
            id: Uuid::new_v4(),
            filter: SensorFilter::new(config.filter),
            orientation: OrientationTracker::new(config.orientation),
            planner,
            field: FieldSimulator::new(config.field),
            stabilizer: VisualStabilizer::new(config.stabilizer, cols, rows),
            animation: AnimationState::default(),
            targets: AnimationTargets::default(),
            blend: config.animation.blend,
            projector: PerspectiveProjector::new(config.camera, world, config.viewport),
            frames: FrameBuilder::new(config.frame),
            readout: Readout {
                magnitude: 0.0,
                delta: None,
            },
            ticks: 0,
            samples: 0,
        };
        info!(session = %session.id, cols, rows, "session created");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // ── samples ──────────────────────────────────────────────────────────

    /// Route one sensor sample.  Returns the filter reading for field
    /// samples, `None` for orientation samples and for dropped samples.
    pub fn on_sample(&mut self, event: &SensorEvent) -> Option<Reading> {
        if !event.vector.is_finite() {
            warn!(
                session = %self.id,
                channel = ?event.channel,
                "dropping non-finite sample"
            );
            return None;
        }
        match event.channel {
            SensorChannel::Field => {
                let drive = self.plan(event.vector);
                self.apply(drive)
            }
            SensorChannel::Orientation => {
                self.targets.tilt = self.orientation.update(event.vector);
                None
            }
        }
    }

    /// Filter one field sample and plan its pulses and targets.
    pub fn plan(&mut self, raw: Vec3) -> Drive {
        let reading = self.filter.update(raw);
        self.samples += 1;
        self.planner.plan(reading, self.filter.smoothed())
    }

    /// Apply a planned [`Drive`]: inject its pulses, replace the animation
    /// targets and refresh the readout.
    pub fn apply(&mut self, drive: Drive) -> Option<Reading> {
        for pulse in &drive.pulses {
            self.field.add_pulse(pulse);
        }
        if !drive.pulses.is_empty() {
            debug!(count = drive.pulses.len(), "pulses injected");
        }
        if let Some(mut targets) = drive.targets {
            if let Some(tilt) = self.orientation.tilt() {
                targets.tilt = tilt;
            }
            self.targets = targets;
        }
        if let Some(reading) = drive.reading {
            self.readout = reading.into();
        }
        drive.reading
    }

    // ── frames ───────────────────────────────────────────────────────────

    /// Advance one frame and return its geometry.
    pub fn tick(&mut self) -> RenderFrame {
        self.field.step();
        self.stabilizer.update(self.field.heights());
        self.animation.advance(self.targets, self.blend);
        let frame = self.frames.build(
            self.ticks,
            &self.field,
            self.stabilizer.display(),
            &self.projector,
            &self.animation,
        );
        self.ticks += 1;
        frame
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.projector.resize(viewport);
    }

    /// Return every stage to its cold-start state: a fresh warmup, flat
    /// grids, resting animation.  Frame and sample counters keep counting.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.orientation.reset();
        self.field.clear();
        self.stabilizer.reset();
        self.animation = AnimationState::default();
        self.targets = AnimationTargets::default();
        self.readout = Readout {
            magnitude: 0.0,
            delta: None,
        };
        info!(session = %self.id, "session reset");
    }

    // ── inspection ───────────────────────────────────────────────────────

    pub fn readout(&self) -> Readout {
        self.readout
    }

    pub fn filter(&self) -> &SensorFilter {
        &self.filter
    }

    pub fn planner(&self) -> &PulsePlanner {
        &self.planner
    }

    pub fn field(&self) -> &FieldSimulator {
        &self.field
    }

    pub fn display(&self) -> &HeightGrid {
        self.stabilizer.display()
    }

    pub fn animation(&self) -> AnimationState {
        self.animation
    }

    pub fn targets(&self) -> AnimationTargets {
        self.targets
    }

    pub fn projector(&self) -> &PerspectiveProjector {
        &self.projector
    }

    /// Frames produced so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Field samples accepted so far.
    pub fn sample_count(&self) -> u64 {
        self.samples
    }
}
