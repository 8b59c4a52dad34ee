//! Display-side smoothing of the physical heightfield.
//!
//! The physical grid diffuses fast enough to flicker at display rates.  The
//! stabilizer keeps its own [`HeightGrid`] that chases the physical one:
//!
//! 1. `diff = physical - display`; inside the dead zone nothing changes.
//! 2. Rising nodes move by `diff · rate_up`, falling nodes by
//!    `diff · rate_down` (`rate_up > rate_down`, so peaks appear quickly and
//!    fade slowly).
//! 3. The move is quantized to a multiple of `quantum`, rounding toward the
//!    previous value whenever nearest-rounding would exceed the rate limit.
//! 4. Results with `|v| < floor` snap to exactly zero.

use magplane_types::{MagplaneError, ensure_positive, ensure_unit};
use serde::{Deserialize, Serialize};

use crate::heightfield::HeightGrid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    pub dead_zone: f32,
    pub rate_up: f32,
    pub rate_down: f32,
    pub quantum: f32,
    pub floor: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.01,
            rate_up: 0.35,
            rate_down: 0.08,
            quantum: 0.001,
            floor: 0.02,
        }
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_unit("stabilizer.rate_up", self.rate_up)?;
        ensure_unit("stabilizer.rate_down", self.rate_down)?;
        ensure_positive("stabilizer.rate_down", self.rate_down)?;
        if self.rate_up <= self.rate_down {
            return Err(MagplaneError::invalid(
                "stabilizer.rate_up",
                "must be greater than stabilizer.rate_down",
            ));
        }
        ensure_positive("stabilizer.quantum", self.quantum)?;
        if self.dead_zone < 0.0 || self.floor < 0.0 {
            return Err(MagplaneError::invalid(
                "stabilizer.dead_zone/floor",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Owner of the display grid.
#[derive(Debug, Clone)]
pub struct VisualStabilizer {
    config: StabilizerConfig,
    display: HeightGrid,
}

impl VisualStabilizer {
    /// Zeroed display grid for `cols × rows` cells.
    pub fn new(config: StabilizerConfig, cols: usize, rows: usize) -> Self {
        Self {
            config,
            display: HeightGrid::new(cols, rows),
        }
    }

    pub fn display(&self) -> &HeightGrid {
        &self.display
    }

    /// Move the display grid one tick toward `physical`.
    ///
    /// # Panics
    ///
    /// Panics if `physical` has different dimensions from the display grid.
    pub fn update(&mut self, physical: &HeightGrid) {
        assert_eq!(
            physical.dims(),
            self.display.dims(),
            "display and physical grids must share dimensions"
        );
        let c = &self.config;
        for (shown, &target) in self.display.values_mut().iter_mut().zip(physical.values()) {
            let diff = target - *shown;
            if diff.abs() < c.dead_zone {
                continue;
            }
            let rate = if diff > 0.0 { c.rate_up } else { c.rate_down };
            let moved = quantize_move(diff * rate, c.quantum);
            let next = *shown + moved;
            *shown = if next.abs() < c.floor { 0.0 } else { next };
        }
    }

    pub fn reset(&mut self) {
        self.display.fill(0.0);
    }
}

/// Round `step` to a multiple of `quantum` without exceeding `|step|`
/// beyond nearest-rounding.
fn quantize_move(step: f32, quantum: f32) -> f32 {
    let mut n = (step / quantum).round();
    if (n * quantum).abs() > step.abs() {
        n -= n.signum();
    }
    n * quantum
}
