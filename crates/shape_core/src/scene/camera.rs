//! Camera orbit placement

use nalgebra::{Isometry3, Point3, Vector3};
use rand::Rng;

use super::types::CameraPose;
use crate::config::CameraConfig;

/// Draws pitch and yaw (inclusive integer degrees) and places the camera on the
/// `camera_distance` sphere.
pub fn place_camera<R: Rng>(rng: &mut R, config: &CameraConfig) -> CameraPose {
    let pitch = rng.gen_range(config.min_camera_pitch..=config.max_camera_pitch);
    let yaw = rng.gen_range(config.min_camera_yaw..=config.max_camera_yaw);
    CameraPose { position: orbit_position(config.camera_distance, pitch, yaw), pitch, yaw }
}

/// Spherical to Cartesian; yaw 0 faces +Y, pitch 90 is straight above.
///
/// Pitch is the true elevation angle, unlike the `normalize([sin y, cos y, sin p]) * d`
/// placement of older Blender scripts, where elevation lags behind pitch.
pub fn orbit_position(distance: f64, pitch: i32, yaw: i32) -> [f64; 3] {
    let (pitch, yaw) = ((pitch as f64).to_radians(), (yaw as f64).to_radians());
    [
        distance * pitch.cos() * yaw.sin(),
        distance * pitch.cos() * yaw.cos(),
        distance * pitch.sin(),
    ]
}

impl CameraPose {
    /// World → camera transform, camera looking down its -Z at the origin.
    pub fn view(&self) -> Isometry3<f64> {
        let eye = Point3::from(self.position);
        let forward = -eye.coords;
        // straight above or below: Z is parallel to the view direction
        let up = if forward.cross(&Vector3::z()).norm() < 1e-9 { Vector3::y() } else { Vector3::z() };
        Isometry3::look_at_rh(&eye, &Point3::origin(), &up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_position_on_sphere() {
        let config = CameraConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let pose = place_camera(&mut rng, &config);
            assert!((30..=80).contains(&pose.pitch));
            assert_eq!(pose.yaw, 0);
            let radius = Vector3::from(pose.position).norm();
            assert!((radius - config.camera_distance).abs() < 1e-9);
        }
    }

    #[test]
    fn test_orbit_axes() {
        let p = orbit_position(2.0, 0, 0);
        assert!((p[1] - 2.0).abs() < 1e-9);
        let p = orbit_position(2.0, 90, 0);
        assert!((p[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_is_elevation() {
        for pitch in [10, 30, 45, 60] {
            let p = Vector3::from(orbit_position(4.0, pitch, 30));
            let elevation = (p.z / p.norm()).asin().to_degrees();
            assert!((elevation - pitch as f64).abs() < 1e-9, "pitch {pitch} gave {elevation}");
        }
    }

    #[test]
    fn test_view_looks_at_origin() {
        for pitch in [30, 90] {
            let pose = CameraPose { position: orbit_position(3.0, pitch, 45), pitch, yaw: 45 };
            let origin_in_view = pose.view() * Point3::origin();
            assert!(origin_in_view.x.abs() < 1e-9 && origin_in_view.y.abs() < 1e-9);
            assert!((origin_in_view.z + 3.0).abs() < 1e-9);
        }
    }
}
