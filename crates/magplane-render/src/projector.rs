//! Animated perspective projection.
//!
//! ```text
//! x' = x + sway
//! y' = y + tilt·x + bend·(z - D/2)/D
//! zc = z + camera_distance                 (invisible when zc <= ε)
//! sx = cx + focal·x'/zc
//! sy = cy - focal·(y' - camera_height)/zc
//! ```
//!
//! `focal = viewport_height · focal_factor`, recomputed on every
//! [`PerspectiveProjector::resize`].
//!
//! # Example
//!
//! ```rust
//! use magplane_render::animation::AnimationState;
//! use magplane_render::projector::{CameraConfig, PerspectiveProjector};
//! use magplane_types::{Viewport, WorldExtent};
//!
//! let projector = PerspectiveProjector::new(
//!     CameraConfig::default(),
//!     WorldExtent::default(),
//!     Viewport { width: 800.0, height: 600.0 },
//! );
//! let anim = AnimationState::default();
//! assert!(projector.project(0.0, 0.0, 5.0, &anim).is_some());
//! assert!(projector.project(0.0, 0.0, -12.0, &anim).is_none());
//! ```

use magplane_types::{MagplaneError, Point2, Viewport, WorldExtent, ensure_positive};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::AnimationState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub camera_height: f32,
    /// Distance from the camera to the plane's near edge (`z = 0`).
    pub camera_distance: f32,
    /// Camera-relative depth at or below which a node is invisible.
    pub depth_epsilon: f32,
    /// `focal = viewport_height · focal_factor`.
    pub focal_factor: f32,
    /// Pixels the screen centre is pushed down from the viewport middle.
    pub center_offset_y: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_height: 3.0,
            camera_distance: 12.0,
            depth_epsilon: 0.01,
            focal_factor: 0.75,
            center_offset_y: 10.0,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_positive("camera.depth_epsilon", self.depth_epsilon)?;
        ensure_positive("camera.focal_factor", self.focal_factor)?;
        if !self.camera_height.is_finite() || !self.camera_distance.is_finite() {
            return Err(MagplaneError::invalid(
                "camera.camera_height/camera_distance",
                "must be finite",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PerspectiveProjector {
    config: CameraConfig,
    world: WorldExtent,
    focal: f32,
    center_x: f32,
    center_y: f32,
}

impl PerspectiveProjector {
    pub fn new(config: CameraConfig, world: WorldExtent, viewport: Viewport) -> Self {
        let mut p = Self {
            config,
            world,
            focal: 0.0,
            center_x: 0.0,
            center_y: 0.0,
        };
        p.resize(viewport);
        p
    }

    /// Recompute focal length and screen centre for a new viewport.
    pub fn resize(&mut self, viewport: Viewport) {
        let width = finite_non_negative(viewport.width);
        let height = finite_non_negative(viewport.height);
        self.focal = height * self.config.focal_factor;
        self.center_x = width * 0.5;
        self.center_y = height * 0.5 + self.config.center_offset_y;
        debug!(width, height, focal = self.focal, "projector resized");
    }

    pub fn focal(&self) -> f32 {
        self.focal
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Project world `(x, y, z)` under `anim`.  `None` exactly when the
    /// point is at or behind the camera (`depth <= depth_epsilon`).
    pub fn project(&self, x: f32, y: f32, z: f32, anim: &AnimationState) -> Option<Point2> {
        let depth = z + self.config.camera_distance;
        if !(depth > self.config.depth_epsilon) {
            return None;
        }
        let d = self.world.depth;
        let x2 = x + anim.sway;
        let y2 = y + anim.tilt * x + anim.bend * ((z - d * 0.5) / d);

        let sx = self.center_x + self.focal * x2 / depth;
        let sy = self.center_y - self.focal * (y2 - self.config.camera_height) / depth;
        debug_assert!(sx.is_finite() && sy.is_finite(), "non-finite projection");
        Some(Point2 { x: sx, y: sy, depth })
    }
}

fn finite_non_negative(v: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector() -> PerspectiveProjector {
        PerspectiveProjector::new(
            CameraConfig::default(),
            WorldExtent::default(),
            Viewport {
                width: 1000.0,
                height: 800.0,
            },
        )
    }

    #[test]
    fn focal_follows_viewport_height() {
        let mut p = projector();
        assert!((p.focal() - 600.0).abs() < 1e-4);
        p.resize(Viewport {
            width: 400.0,
            height: 2000.0,
        });
        assert!((p.focal() - 1500.0).abs() < 1e-3);
    }

    #[test]
    fn invisible_iff_depth_at_or_below_epsilon() {
        let p = projector();
        let anim = AnimationState::default();
        assert!(p.project(0.0, 0.0, -12.0, &anim).is_none());
        assert!(p.project(0.0, 0.0, -11.995, &anim).is_none());
        assert!(p.project(0.0, 0.0, -20.0, &anim).is_none());
        let visible = p.project(0.0, 0.0, -11.98, &anim).unwrap();
        assert!(visible.x.is_finite() && visible.y.is_finite());
        assert!(visible.depth > 0.01);
    }

    #[test]
    fn any_point_past_epsilon_is_visible() {
        let p = projector();
        let anim = AnimationState {
            sway: 1.2,
            tilt: 0.25,
            bend: -0.35,
        };
        for &(x, y) in &[(0.0, 0.0), (6.0, 3.0), (-6.0, -3.0)] {
            let pt = p.project(x, y, -11.989, &anim).unwrap();
            assert!(pt.x.is_finite() && pt.y.is_finite());
            assert!(pt.depth > 0.01);
        }
    }

    #[test]
    fn centre_line_projects_to_screen_centre_x() {
        let p = projector();
        let pt = p.project(0.0, 0.0, 10.0, &AnimationState::default()).unwrap();
        assert!((pt.x - 500.0).abs() < 1e-4);
        // Below the camera → below the centre on screen.
        assert!(pt.y > 410.0);
    }

    #[test]
    fn known_projection_values() {
        let p = projector();
        let anim = AnimationState {
            sway: 1.0,
            tilt: 0.1,
            bend: 0.2,
        };
        // x' = 2 + 1 = 3; y' = 0.5 + 0.2 + 0.2·((11 - 11)/22) = 0.7; zc = 23
        let pt = p.project(2.0, 0.5, 11.0, &anim).unwrap();
        assert!((pt.x - (500.0 + 600.0 * 3.0 / 23.0)).abs() < 1e-3);
        assert!((pt.y - (410.0 - 600.0 * (0.7 - 3.0) / 23.0)).abs() < 1e-3);
        assert!((pt.depth - 23.0).abs() < 1e-6);
    }

    #[test]
    fn sway_shifts_points_sideways() {
        let p = projector();
        let still = p.project(0.0, 0.0, 5.0, &AnimationState::default()).unwrap();
        let swayed = p
            .project(
                0.0,
                0.0,
                5.0,
                &AnimationState {
                    sway: 1.0,
                    ..AnimationState::default()
                },
            )
            .unwrap();
        assert!(swayed.x > still.x);
        assert_eq!(swayed.y, still.y);
    }

    #[test]
    fn non_finite_viewport_collapses_safely() {
        let mut p = projector();
        p.resize(Viewport {
            width: f32::NAN,
            height: f32::INFINITY,
        });
        let pt = p.project(1.0, 1.0, 1.0, &AnimationState::default()).unwrap();
        assert!(pt.x.is_finite() && pt.y.is_finite());
    }
}
