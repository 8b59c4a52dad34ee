//! Per-tick render geometry.
//!
//! A [`RenderFrame`] carries everything a drawing backend needs: filled cells
//! with a brightness value, grid polylines, and glow peaks.  Colour mapping is
//! left to the backend.

use magplane_field::{FieldSimulator, HeightGrid};
use magplane_types::Point2;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationState;
use crate::projector::PerspectiveProjector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// `brightness = clamp(base + gain · avg_height, 0, 1)`.
    pub brightness_base: f32,
    pub brightness_gain: f32,
    /// Display height at which an interior node glows.
    pub peak_threshold: f32,
    pub glow_max: f32,
    pub glow_min: f32,
    /// Glow radius lost per unit of camera depth.
    pub glow_depth_falloff: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            brightness_base: 0.5,
            brightness_gain: 0.7,
            peak_threshold: 0.25,
            glow_max: 6.0,
            glow_min: 2.0,
            glow_depth_falloff: 0.05,
        }
    }
}

/// One quad of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Column and row of the cell's near-left node.
    pub col: usize,
    pub row: usize,
    /// `(i, j)`, `(i+1, j)`, `(i+1, j+1)`, `(i, j+1)` in drawing order.
    pub corners: [Point2; 4],
    pub brightness: f32,
}

/// A highlighted interior node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub at: Point2,
    pub height: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderFrame {
    pub tick: u64,
    pub cells: Vec<Cell>,
    /// One polyline per grid row followed by one per grid column.
    pub polylines: Vec<Vec<Point2>>,
    pub peaks: Vec<Peak>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    config: FrameConfig,
}

impl FrameBuilder {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Brightness for a cell whose corners average `avg`.
    pub fn brightness(&self, avg: f32) -> f32 {
        (self.config.brightness_base + avg * self.config.brightness_gain).clamp(0.0, 1.0)
    }

    /// Project `display` (node positions from `field`) into a frame.
    pub fn build(
        &self,
        tick: u64,
        field: &FieldSimulator,
        display: &HeightGrid,
        projector: &PerspectiveProjector,
        anim: &AnimationState,
    ) -> RenderFrame {
        let (cols, rows) = display.dims();
        let project =
            |i: usize, j: usize| projector.project(field.node_x(i), display.get(i, j), field.node_z(j), anim);

        let mut cells = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            for i in 0..cols {
                let corners = match (
                    project(i, j),
                    project(i + 1, j),
                    project(i + 1, j + 1),
                    project(i, j + 1),
                ) {
                    (Some(a), Some(b), Some(c), Some(d)) => [a, b, c, d],
                    _ => continue,
                };
                let avg = (display.get(i, j)
                    + display.get(i + 1, j)
                    + display.get(i, j + 1)
                    + display.get(i + 1, j + 1))
                    * 0.25;
                cells.push(Cell {
                    col: i,
                    row: j,
                    corners,
                    brightness: self.brightness(avg),
                });
            }
        }

        let mut polylines = Vec::with_capacity(cols + rows + 2);
        for j in 0..=rows {
            let line: Vec<Point2> = (0..=cols).filter_map(|i| project(i, j)).collect();
            if line.len() >= 2 {
                polylines.push(line);
            }
        }
        for i in 0..=cols {
            let line: Vec<Point2> = (0..=rows).filter_map(|j| project(i, j)).collect();
            if line.len() >= 2 {
                polylines.push(line);
            }
        }

        let mut peaks = Vec::new();
        for j in 1..rows {
            for i in 1..cols {
                let height = display.get(i, j);
                if height < self.config.peak_threshold {
                    continue;
                }
                let Some(at) = project(i, j) else { continue };
                let radius = (self.config.glow_max - at.depth * self.config.glow_depth_falloff)
                    .max(self.config.glow_min);
                peaks.push(Peak { at, height, radius });
            }
        }

        RenderFrame {
            tick,
            cells,
            polylines,
            peaks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::CameraConfig;
    use magplane_field::FieldConfig;
    use magplane_types::{Viewport, WorldExtent};

    fn setup() -> (FieldSimulator, PerspectiveProjector) {
        let field = FieldSimulator::new(FieldConfig::default());
        let projector = PerspectiveProjector::new(
            CameraConfig::default(),
            WorldExtent::default(),
            Viewport {
                width: 1080.0,
                height: 1920.0,
            },
        );
        (field, projector)
    }

    #[test]
    fn flat_grid_produces_full_frame() {
        let (field, projector) = setup();
        let display = HeightGrid::new(12, 10);
        let frame = FrameBuilder::default().build(
            7,
            &field,
            &display,
            &projector,
            &AnimationState::default(),
        );
        assert_eq!(frame.tick, 7);
        assert_eq!(frame.cells.len(), 12 * 10);
        assert_eq!(frame.polylines.len(), 11 + 13);
        assert!(frame.peaks.is_empty());
        assert!(frame.cells.iter().all(|c| (c.brightness - 0.5).abs() < 1e-6));
    }

    #[test]
    fn brightness_is_clamped() {
        let b = FrameBuilder::new(FrameConfig::default());
        assert_eq!(b.brightness(10.0), 1.0);
        assert_eq!(b.brightness(-10.0), 0.0);
        assert!((b.brightness(0.5) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn raised_interior_node_glows() {
        let (field, projector) = setup();
        let mut display = HeightGrid::new(12, 10);
        display.set(6, 5, 1.0);
        display.set(0, 0, 5.0); // edge nodes never glow
        let frame = FrameBuilder::default().build(
            0,
            &field,
            &display,
            &projector,
            &AnimationState::default(),
        );
        assert_eq!(frame.peaks.len(), 1);
        let peak = frame.peaks[0];
        assert_eq!(peak.height, 1.0);
        assert!(peak.radius >= 2.0 && peak.radius <= 6.0);
    }

    #[test]
    fn invisible_nodes_drop_cells() {
        let field = FieldSimulator::new(FieldConfig::default());
        // Camera sits on the near edge: row 0 has zero depth.
        let projector = PerspectiveProjector::new(
            CameraConfig {
                camera_distance: 0.0,
                ..CameraConfig::default()
            },
            WorldExtent::default(),
            Viewport::default(),
        );
        let display = HeightGrid::new(12, 10);
        let frame = FrameBuilder::default().build(
            0,
            &field,
            &display,
            &projector,
            &AnimationState::default(),
        );
        assert_eq!(frame.cells.len(), 12 * 9);
        assert!(frame.cells.iter().all(|c| c.row > 0));
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"cells\""));
    }
}
