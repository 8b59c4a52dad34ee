//! Physical heightfield: pulse injection and diffusion-decay.
//!
//! The grid has `(rows + 1) × (cols + 1)` nodes.  Node `(i, j)` sits at
//! world `x = -W + 2W·i/cols`, `z = D·j/rows`.
//!
//! Each [`FieldSimulator::step`] computes, for every node,
//!
//! ```text
//! lap  = (l + r + u + d - 4c) · laplacian_scale
//! next = (c + lap · diffusion) · decay
//! ```
//!
//! into a scratch grid and swaps it in at the end, so no node reads a
//! half-updated neighbour.  Edge nodes reuse themselves in place of the
//! missing neighbour (no wrap-around).  With `diffusion · laplacian_scale · 4
//! <= 1` the update is a convex combination of the neighbourhood, so together
//! with `decay < 1` the peak magnitude shrinks every step.
//!
//! # Example
//!
//! ```rust
//! use magplane_field::heightfield::{FieldConfig, FieldSimulator};
//! use magplane_types::PulseRequest;
//!
//! let mut field = FieldSimulator::new(FieldConfig::default());
//! field.add_pulse(&PulseRequest { x: 0.0, z: 11.0, amplitude: 1.0, radius: 2.0 });
//! let peak = field.max_abs();
//! field.step();
//! assert!(field.max_abs() < peak);
//! ```

use magplane_types::{MagplaneError, PulseRequest, WorldExtent, ensure_positive};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Cells along X (nodes = cols + 1).
    pub cols: usize,
    /// Cells along Z (nodes = rows + 1).
    pub rows: usize,
    pub world: WorldExtent,
    /// Weight of the Laplacian term per step.
    pub diffusion: f32,
    /// Normalisation applied to the 4-neighbour Laplacian.
    pub laplacian_scale: f32,
    /// Uniform attenuation per step, strictly inside `(0, 1)`.
    pub decay: f32,
    /// Largest amplitude a single pulse may add.
    pub max_amplitude: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            cols: 12,
            rows: 10,
            world: WorldExtent::default(),
            diffusion: 0.65,
            laplacian_scale: 0.25,
            decay: 0.98,
            max_amplitude: 3.0,
            min_radius: 0.5,
            max_radius: 4.0,
        }
    }
}

impl FieldConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(MagplaneError::invalid(
                "field.cols/rows",
                "grid needs at least one cell in each direction",
            ));
        }
        ensure_positive("field.world.half_width", self.world.half_width)?;
        ensure_positive("field.world.depth", self.world.depth)?;
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(MagplaneError::invalid(
                "field.decay",
                format!("must be within (0, 1), got {}", self.decay),
            ));
        }
        let weight = self.diffusion * self.laplacian_scale * 4.0;
        if !(0.0..=1.0).contains(&weight) {
            return Err(MagplaneError::invalid(
                "field.diffusion",
                "diffusion · laplacian_scale · 4 must be within [0, 1]",
            ));
        }
        ensure_positive("field.max_amplitude", self.max_amplitude)?;
        ensure_positive("field.min_radius", self.min_radius)?;
        if self.max_radius < self.min_radius {
            return Err(MagplaneError::invalid(
                "field.max_radius",
                "must be >= field.min_radius",
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HeightGrid
// ────────────────────────────────────────────────────────────────────────────

/// Row-major `(rows + 1) × (cols + 1)` matrix of node heights.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    cols: usize,
    rows: usize,
    values: Vec<f32>,
}

impl HeightGrid {
    /// Zero-initialised grid for `cols × rows` cells.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            values: vec![0.0; (cols + 1) * (rows + 1)],
        }
    }

    /// Number of cells `(cols, rows)`; node counts are one more each.
    pub fn dims(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        j * (self.cols + 1) + i
    }

    /// Height at column `i`, row `j`.
    ///
    /// # Panics
    ///
    /// Panics if `(i, j)` is outside the node range.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[self.idx(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: f32) {
        let idx = self.idx(i, j);
        self.values[idx] = v;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Largest absolute node value.
    pub fn max_abs(&self) -> f32 {
        self.values.iter().fold(0.0_f32, |m, v| m.max(v.abs()))
    }

    pub fn fill(&mut self, v: f32) {
        self.values.fill(v);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FieldSimulator
// ────────────────────────────────────────────────────────────────────────────

/// Owner of the physical heightfield.
#[derive(Debug, Clone)]
pub struct FieldSimulator {
    config: FieldConfig,
    heights: HeightGrid,
    scratch: HeightGrid,
    node_x: Vec<f32>,
    node_z: Vec<f32>,
}

impl FieldSimulator {
    pub fn new(config: FieldConfig) -> Self {
        let (cols, rows) = (config.cols, config.rows);
        let w = config.world.half_width;
        let d = config.world.depth;
        let node_x = (0..=cols)
            .map(|i| -w + 2.0 * w * (i as f32 / cols as f32))
            .collect();
        let node_z = (0..=rows).map(|j| d * (j as f32 / rows as f32)).collect();
        Self {
            heights: HeightGrid::new(cols, rows),
            scratch: HeightGrid::new(cols, rows),
            node_x,
            node_z,
            config,
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// The physical grid.
    pub fn heights(&self) -> &HeightGrid {
        &self.heights
    }

    pub fn dims(&self) -> (usize, usize) {
        self.heights.dims()
    }

    pub fn height(&self, i: usize, j: usize) -> f32 {
        self.heights.get(i, j)
    }

    /// World X of column `i`.
    pub fn node_x(&self, i: usize) -> f32 {
        self.node_x[i]
    }

    /// World Z of row `j`.
    pub fn node_z(&self, j: usize) -> f32 {
        self.node_z[j]
    }

    pub fn max_abs(&self) -> f32 {
        self.heights.max_abs()
    }

    /// Grid node `(i, j)` closest to world `(x, z)`.
    pub fn nearest_node(&self, x: f32, z: f32) -> (usize, usize) {
        let c = &self.config;
        let fi = (x + c.world.half_width) / (2.0 * c.world.half_width) * c.cols as f32;
        let fj = z / c.world.depth * c.rows as f32;
        let i = fi.round().clamp(0.0, c.cols as f32) as usize;
        let j = fj.round().clamp(0.0, c.rows as f32) as usize;
        (i, j)
    }

    /// Add a Gaussian bump `amplitude · exp(-dist² / radius²)` at every node.
    ///
    /// The request is clamped first: position into the world rectangle,
    /// amplitude to `max_amplitude`, radius to `[min_radius, max_radius]`.
    /// Requests with a non-positive or non-finite amplitude are ignored.
    pub fn add_pulse(&mut self, pulse: &PulseRequest) {
        let c = &self.config;
        if !(pulse.amplitude.is_finite() && pulse.amplitude > 0.0) {
            return;
        }
        let amplitude = pulse.amplitude.min(c.max_amplitude);
        let radius = if pulse.radius.is_finite() {
            pulse.radius.clamp(c.min_radius, c.max_radius)
        } else {
            c.max_radius
        };
        let x0 = finite_or(pulse.x, 0.0).clamp(-c.world.half_width, c.world.half_width);
        let z0 = finite_or(pulse.z, 0.0).clamp(0.0, c.world.depth);
        let inv_r2 = 1.0 / (radius * radius);

        for (j, &z) in self.node_z.iter().enumerate() {
            let dz = z - z0;
            for (i, &x) in self.node_x.iter().enumerate() {
                let dx = x - x0;
                let gain = (-(dx * dx + dz * dz) * inv_r2).exp();
                let v = self.heights.get(i, j) + amplitude * gain;
                self.heights.set(i, j, v);
            }
        }
        trace!(x = x0, z = z0, amplitude, radius, "pulse applied");
    }

    /// Advance one diffusion-decay step.
    pub fn step(&mut self) {
        let (cols, rows) = self.heights.dims();
        let k = self.config.laplacian_scale * self.config.diffusion;
        let decay = self.config.decay;
        let h = &self.heights;

        for j in 0..=rows {
            let up = j.saturating_sub(1);
            let down = (j + 1).min(rows);
            for i in 0..=cols {
                let left = i.saturating_sub(1);
                let right = (i + 1).min(cols);
                let c = h.get(i, j);
                let lap = h.get(left, j) + h.get(right, j) + h.get(i, up) + h.get(i, down)
                    - 4.0 * c;
                self.scratch.set(i, j, (c + lap * k) * decay);
            }
        }
        std::mem::swap(&mut self.heights, &mut self.scratch);
    }

    /// Zero every node.
    pub fn clear(&mut self) {
        self.heights.fill(0.0);
        self.scratch.fill(0.0);
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
