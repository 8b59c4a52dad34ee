//! `magplane-field` – the heightfield.
//!
//! # Modules
//!
//! - [`heightfield`] – [`FieldSimulator`][heightfield::FieldSimulator]: owns
//!   the physical [`HeightGrid`][heightfield::HeightGrid], injects Gaussian
//!   pulses and advances one diffusion-decay step per tick.
//! - [`stabilizer`] – [`VisualStabilizer`][stabilizer::VisualStabilizer]:
//!   derives the display grid from the physical one with a dead zone,
//!   asymmetric rise/fall rates, quantization and a zero floor.

pub mod heightfield;
pub mod stabilizer;

pub use heightfield::{FieldConfig, FieldSimulator, HeightGrid};
pub use stabilizer::{StabilizerConfig, VisualStabilizer};
