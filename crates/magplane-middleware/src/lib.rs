//! `magplane-middleware` – sample delivery and frame pacing.
//!
//! Moves sensor samples from whatever produces them into the pipeline, and
//! decides when the pipeline renders, without caring what the samples mean.
//!
//! # Modules
//!
//! - [`source`] – the [`SampleSource`] trait and [`ChannelSource`], a
//!   broadcast-backed source the host pushes samples into.
//! - [`sim`] – [`SimSource`]: a synthetic magnetometer with a periodic
//!   anomaly for headless runs.
//! - [`clock`] – the [`FrameClock`] trait with a real-time
//!   [`IntervalClock`] and a deterministic [`CountedClock`].

pub mod clock;
pub mod sim;
pub mod source;

pub use clock::{CountedClock, FrameClock, IntervalClock};
pub use sim::{SimSamples, SimSignal, SimSource};
pub use source::{ChannelSource, SampleSource};
