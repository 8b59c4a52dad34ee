//! `magplane-render` – from heights to screen geometry.
//!
//! Nothing here draws.  The crate produces plain values an external renderer
//! can consume deterministically.
//!
//! # Modules
//!
//! - [`animation`] – [`AnimationState`][animation::AnimationState]: sway,
//!   tilt and bend chasing their targets with a first-order blend.
//! - [`projector`] – [`PerspectiveProjector`][projector::PerspectiveProjector]:
//!   animated perspective projection of grid nodes.
//! - [`frame`] – [`FrameBuilder`][frame::FrameBuilder]: assembles the
//!   per-tick [`RenderFrame`][frame::RenderFrame] (cells, grid lines, peaks).

pub mod animation;
pub mod frame;
pub mod projector;

pub use animation::{AnimationConfig, AnimationState};
pub use frame::{Cell, FrameBuilder, FrameConfig, Peak, RenderFrame};
pub use projector::{CameraConfig, PerspectiveProjector};
