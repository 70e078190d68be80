//! # Generator Configuration
//!
//! One flat JSON object whose keys are the command-line flag names. Internally the keys
//! are grouped into sub-structs that are flattened back on (de)serialization.
//!
//! Precedence: built-in defaults < configuration file < explicit overrides.
//!
//! ```rust,ignore
//! use shape_core::config::GeneratorConfig;
//!
//! let config = GeneratorConfig::from_json_file(Path::new("config.json"))?;
//! config.validate()?;
//! ```

mod input_config;
mod output_config;
mod render_config;
mod scene_config;

pub use input_config::InputConfig;
pub use output_config::OutputConfig;
pub use render_config::RenderConfig;
pub use scene_config::{CameraConfig, LightsConfig, SceneConfig};

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Full run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(flatten)]
    pub output: OutputConfig,
    #[serde(flatten)]
    pub input: InputConfig,
    #[serde(flatten)]
    pub scene: SceneConfig,
    #[serde(flatten)]
    pub camera: CameraConfig,
    #[serde(flatten)]
    pub lights: LightsConfig,
    #[serde(flatten)]
    pub render: RenderConfig,
}

impl GeneratorConfig {
    /// Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let value: Value = serde_json::from_str(&text)?;
        Self::from_value(value)
    }

    /// Applies `overrides` (flag name → value) on top of this configuration.
    pub fn merge_overrides(&self, overrides: &Map<String, Value>) -> Result<Self, ConfigError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            for (key, override_value) in overrides {
                object.insert(key.clone(), override_value.clone());
            }
        }
        Self::from_value(value)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes every key, creating parent directories.
    pub fn write_json_file(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_json_pretty()?).map_err(io_err)
    }

    /// Test mode renders a single image.
    pub fn normalized(mut self) -> Self {
        if self.render.test_mode && self.output.num_images != 1 {
            tracing::info!("Test mode: num_images {} -> 1", self.output.num_images);
            self.output.num_images = 1;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let render = &self.render;
        ensure(render.images_width > 0, "images_width", "must be positive")?;
        ensure(render.images_height > 0, "images_height", "must be positive")?;
        ensure(render.max_render_retries > 0, "max_render_retries", "must be at least 1")?;
        ensure(!self.output.split.is_empty(), "split", "must not be empty")?;

        let scene = &self.scene;
        ensure(scene.area_size > 0.0, "area_size", "must be positive")?;
        ensure(scene.padding >= 0.0, "padding", "must not be negative")?;
        ensure(
            scene.padding * 2.0 <= scene.area_size,
            "padding",
            format!("{} exceeds half of area_size {}", scene.padding, scene.area_size),
        )?;
        ensure_range("num_objects", scene.min_num_objects, scene.max_num_objects)?;
        ensure_range("num_decoys", scene.min_num_decoys, scene.max_num_decoys)?;
        ensure(scene.max_placement_attempts > 0, "max_placement_attempts", "must be at least 1")?;
        ensure(scene.auto_snap_attempts > 0, "auto_snap_attempts", "must be at least 1")?;

        let camera = &self.camera;
        ensure(camera.camera_distance > 0.0, "camera_distance", "must be positive")?;
        ensure(camera.camera_lens > 0.0, "camera_lens", "must be positive")?;
        ensure(camera.camera_sensor_width > 0.0, "camera_sensor_width", "must be positive")?;
        ensure_range("camera_pitch", camera.min_camera_pitch, camera.max_camera_pitch)?;
        ensure_range("camera_yaw", camera.min_camera_yaw, camera.max_camera_yaw)?;

        let lights = &self.lights;
        ensure_range("num_lights", lights.min_num_lights, lights.max_num_lights)?;
        ensure(lights.lights_distance >= 0.0, "lights_distance", "must not be negative")?;
        ensure(lights.lights_jitter >= 0.0, "lights_jitter", "must not be negative")?;

        Ok(())
    }
}

fn ensure(condition: bool, key: &str, reason: impl Into<String>) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { key: key.to_string(), reason: reason.into() })
    }
}

fn ensure_range<T: PartialOrd + std::fmt::Display>(name: &str, min: T, max: T) -> Result<(), ConfigError> {
    ensure(min <= max, &format!("min_{name}"), format!("min {min} is greater than max {max}"))
}

/// Booleans written either as JSON booleans or as `0` / `1`.
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Int(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bool(b) => Ok(b),
            Repr::Int(0) => Ok(false),
            Repr::Int(1) => Ok(true),
            Repr::Int(n) => Err(serde::de::Error::custom(format!("expected 0 or 1, found {n}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_match_flag_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.output.output_dir, PathBuf::from("./output"));
        assert_eq!(config.output.split, "train");
        assert_eq!(config.render.images_width, 640);
        assert!(config.render.use_gpu);
        assert_eq!(config.scene.area_size, 3.0);
        assert_eq!((config.scene.min_num_objects, config.scene.max_num_objects), (2, 6));
        assert_eq!((config.camera.min_camera_pitch, config.camera.max_camera_pitch), (30, 80));
        assert_eq!(config.lights.lights_intensity, 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flat_json_with_integer_flags() {
        let config = GeneratorConfig::from_value(json!({
            "num_images": 10,
            "use_gpu": 0,
            "create_depth": false,
            "area_size": 5,
            "max_camera_yaw": 360,
            "config": "ignored.json",
            "resume": null
        }))
        .unwrap();

        assert_eq!(config.output.num_images, 10);
        assert!(!config.render.use_gpu);
        assert!(!config.render.create_depth);
        assert!(config.render.create_segmentations);
        assert_eq!(config.scene.area_size, 5.0);
        assert_eq!(config.camera.max_camera_yaw, 360);

        assert!(GeneratorConfig::from_value(json!({"test_mode": 2})).is_err());
    }

    #[test]
    fn test_serialized_keys_are_flat() {
        let value = serde_json::to_value(GeneratorConfig::default()).unwrap();
        let object = value.as_object().unwrap();
        for key in ["output_dir", "rules", "area_size", "camera_distance", "lights_jitter", "test_mode", "seed"] {
            assert!(object.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_override_precedence() {
        let file = GeneratorConfig::from_value(json!({"num_images": 10, "split": "val"})).unwrap();
        let overrides = json!({"num_images": 3}).as_object().unwrap().clone();
        let merged = file.merge_overrides(&overrides).unwrap();
        assert_eq!(merged.output.num_images, 3);
        assert_eq!(merged.output.split, "val");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GeneratorConfig::default();
        config.scene.min_num_objects = 7;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "min_num_objects"
        ));

        let mut config = GeneratorConfig::default();
        config.scene.padding = 2.0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.render.images_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_test_mode_forces_single_image() {
        let mut config = GeneratorConfig::default();
        config.output.num_images = 50;
        config.render.test_mode = true;
        assert_eq!(config.normalized().output.num_images, 1);
    }

    #[test]
    fn test_output_paths() {
        let mut output = OutputConfig { output_dir: PathBuf::from("/data"), ..Default::default() };
        assert_eq!(output.image_file_name(42), "0000000042.png");
        assert_eq!(output.annotations_path(), PathBuf::from("/data/train/train_annotations.json"));

        output.filename_prefix = Some("gpu0".to_string());
        output.split = "val".to_string();
        assert_eq!(output.image_path(7), PathBuf::from("/data/val/images/gpu0_0000000007.png"));
        assert_eq!(output.checkpoint_path(), PathBuf::from("/data/val/gpu0_val_checkpoint.json"));
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs/run.json");

        let mut config = GeneratorConfig::default();
        config.scene.seed = Some(7);
        config.output.filename_prefix = Some("a".to_string());
        config.write_json_file(&path).unwrap();

        assert_eq!(GeneratorConfig::from_json_file(&path).unwrap(), config);
    }
}
