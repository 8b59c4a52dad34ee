//! `magplane-perception` – signal conditioning.
//!
//! Turns noisy field and orientation samples into the [`Drive`] values that
//! steer the heightfield and the plane animation.
//!
//! # Modules
//!
//! - [`filter`] – [`SensorFilter`][filter::SensorFilter]: per-axis smoothing,
//!   warmup baseline and three-band adaptive baseline tracking.
//! - [`orientation`] – [`OrientationTracker`][orientation::OrientationTracker]:
//!   optional gravity channel that overrides the tilt target.
//! - [`planner`] – [`PulsePlanner`][planner::PulsePlanner]: sustain and
//!   transient pulse planning plus animation targets.
//!
//! [`Drive`]: magplane_types::Drive

pub mod filter;
pub mod orientation;
pub mod planner;

pub use filter::{FilterConfig, SensorFilter};
pub use orientation::{OrientationConfig, OrientationTracker};
pub use planner::{PlannerConfig, PulsePlanner};
