//! Pixel bounding boxes from a pinhole camera model

use nalgebra::{Isometry3, Point3};

use super::types::CameraPose;
use crate::config::CameraConfig;

/// Projects world points into image pixels.
///
/// The sensor width spans the larger image side; pixel y grows downwards.
#[derive(Debug, Clone)]
pub struct Projector {
    view: Isometry3<f64>,
    focal_px: f64,
    width: f64,
    height: f64,
}

impl Projector {
    pub fn new(camera: &CameraPose, config: &CameraConfig, width: u32, height: u32) -> Self {
        let (width, height) = (width as f64, height as f64);
        Self {
            view: camera.view(),
            focal_px: config.camera_lens / config.camera_sensor_width * width.max(height),
            width,
            height,
        }
    }

    /// `None` for points at or behind the camera plane.
    pub fn project(&self, point: &Point3<f64>) -> Option<(f64, f64)> {
        let p = self.view * point;
        let depth = -p.z;
        if depth <= f64::EPSILON {
            return None;
        }
        let u = self.width / 2.0 + self.focal_px * p.x / depth;
        let v = self.height / 2.0 - self.focal_px * p.y / depth;
        Some((u, v))
    }

    /// `[x, y, width, height]` of the projected points, clamped to the image.
    ///
    /// `None` when nothing projects or the box lies outside the image.
    pub fn bounding_box(&self, points: impl IntoIterator<Item = Point3<f64>>) -> Option<[f64; 4]> {
        let (mut min_u, mut min_v) = (f64::INFINITY, f64::INFINITY);
        let (mut max_u, mut max_v) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (u, v) in points.into_iter().filter_map(|p| self.project(&p)) {
            min_u = min_u.min(u);
            min_v = min_v.min(v);
            max_u = max_u.max(u);
            max_v = max_v.max(v);
        }
        if !min_u.is_finite() {
            return None;
        }

        let x0 = min_u.clamp(0.0, self.width);
        let y0 = min_v.clamp(0.0, self.height);
        let x1 = max_u.clamp(0.0, self.width);
        let y1 = max_v.clamp(0.0, self.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some([x0, y0, x1 - x0, y1 - y0])
    }
}
