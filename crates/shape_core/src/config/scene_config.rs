//! Scene Composition Configuration

use serde::{Deserialize, Serialize};

/// Working area, shape counts and retry bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Side of the square working area centred on the origin (기본: 3)
    pub area_size: f64,
    /// Minimum distance between a centroid and the area border (기본: 0.6)
    pub padding: f64,

    // === Counts (inclusive ranges) ===
    pub min_num_objects: u32,
    pub max_num_objects: u32,
    pub min_num_decoys: u32,
    pub max_num_decoys: u32,

    // === Bounds ===
    /// Position draws per shape before it is dropped (기본: 50)
    pub max_placement_attempts: u32,
    /// Face draws for auto-snap rotation (기본: 16)
    pub auto_snap_attempts: u32,

    /// RNG seed; `None` draws one from entropy
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            area_size: 3.0,
            padding: 0.6,
            min_num_objects: 2,
            max_num_objects: 6,
            min_num_decoys: 0,
            max_num_decoys: 2,
            max_placement_attempts: 50,
            auto_snap_attempts: 16,
            seed: None,
        }
    }
}

impl SceneConfig {
    /// `[padding - area/2, area/2 - padding]`
    pub fn placement_bounds(&self) -> (f64, f64) {
        let half = self.area_size / 2.0;
        (self.padding - half, half - self.padding)
    }
}

/// Camera orbit parameters. Angles are integer degrees, ranges inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// 원점으로부터 거리 (기본: 2.5)
    pub camera_distance: f64,
    pub min_camera_pitch: i32,
    pub max_camera_pitch: i32,
    pub min_camera_yaw: i32,
    pub max_camera_yaw: i32,
    /// Focal length in mm (기본: 20)
    pub camera_lens: f64,
    /// Sensor width in mm (기본: 36)
    pub camera_sensor_width: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_distance: 2.5,
            min_camera_pitch: 30,
            max_camera_pitch: 80,
            min_camera_yaw: 0,
            max_camera_yaw: 0,
            camera_lens: 20.0,
            camera_sensor_width: 36.0,
        }
    }
}

/// Point light placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub min_num_lights: u32,
    pub max_num_lights: u32,
    /// Random displacement factor (기본: 0.4)
    pub lights_jitter: f64,
    /// 광원 거리 (기본: 3)
    pub lights_distance: f64,
    /// Energy passed to the renderer (기본: 60)
    pub lights_intensity: f64,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            min_num_lights: 1,
            max_num_lights: 3,
            lights_jitter: 0.4,
            lights_distance: 3.0,
            lights_intensity: 60.0,
        }
    }
}
