//! Script renderer
//!
//! Records the command stream of each image into `<image>.scene.json` next to the target
//! image. An external render process replays the file and produces the buffers.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{InstanceTransform, MaterialVariant, RenderOutput, RenderRequest, Renderer};
use crate::error::RenderError;
use crate::scene::{CameraPose, PointLight};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RenderCommand {
    SpawnShape { instance: String, asset: PathBuf, object: String },
    SetTransform { instance: String, transform: InstanceTransform },
    AttachMaterial { instance: String, material: String },
    AddLight { name: String, position: [f64; 3], intensity: f64 },
    SetCamera { position: [f64; 3], look_at: [f64; 3] },
}

/// Contents of one `.scene.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderScript {
    pub request: RenderRequest,
    pub materials: Vec<MaterialVariant>,
    pub commands: Vec<RenderCommand>,
}

#[derive(Debug, Default)]
pub struct ScriptRenderer {
    materials: Vec<MaterialVariant>,
    commands: Vec<RenderCommand>,
    written: Vec<PathBuf>,
}

impl ScriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<image>.scene.json`
    pub fn script_path(image: &Path) -> PathBuf {
        let mut name = image.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".scene.json");
        image.with_file_name(name)
    }

    /// Commands staged since the last clear.
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn materials(&self) -> &[MaterialVariant] {
        &self.materials
    }

    /// Scripts written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn push(&mut self, command: RenderCommand) -> Result<(), RenderError> {
        self.commands.push(command);
        Ok(())
    }
}

impl Renderer for ScriptRenderer {
    fn register_material(&mut self, variant: &MaterialVariant) -> Result<(), RenderError> {
        if let Some(existing) = self.materials.iter_mut().find(|m| m.name == variant.name) {
            *existing = variant.clone();
        } else {
            self.materials.push(variant.clone());
        }
        Ok(())
    }

    fn spawn_shape(&mut self, instance: &str, asset: &Path, object: &str) -> Result<(), RenderError> {
        self.push(RenderCommand::SpawnShape {
            instance: instance.to_string(),
            asset: asset.to_path_buf(),
            object: object.to_string(),
        })
    }

    fn set_transform(&mut self, instance: &str, transform: &InstanceTransform) -> Result<(), RenderError> {
        self.push(RenderCommand::SetTransform { instance: instance.to_string(), transform: *transform })
    }

    fn attach_material(&mut self, instance: &str, variant: &str) -> Result<(), RenderError> {
        if !self.materials.iter().any(|m| m.name == variant) {
            return Err(RenderError::Backend(format!("material variant '{variant}' was never registered")));
        }
        self.push(RenderCommand::AttachMaterial { instance: instance.to_string(), material: variant.to_string() })
    }

    fn add_light(&mut self, name: &str, light: &PointLight) -> Result<(), RenderError> {
        self.push(RenderCommand::AddLight {
            name: name.to_string(),
            position: light.position,
            intensity: light.intensity,
        })
    }

    fn set_camera(&mut self, camera: &CameraPose) -> Result<(), RenderError> {
        self.push(RenderCommand::SetCamera { position: camera.position, look_at: [0.0; 3] })
    }

    fn render(&mut self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let script = RenderScript {
            request: request.clone(),
            materials: self.materials.clone(),
            commands: self.commands.clone(),
        };
        let path = Self::script_path(&request.image_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(&script)?;
        let mut file = File::create(&path)?;
        file.write_all(&data)?;
        file.flush()?;

        debug!("Wrote {} render commands to {}", script.commands.len(), path.display());
        self.written.push(path);

        Ok(RenderOutput {
            image: request.image_path.clone(),
            segmentation: request.segmentation_path.clone(),
            depth: request.depth_path.clone(),
        })
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.commands.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use tempfile::TempDir;

    fn variant(name: &str) -> MaterialVariant {
        MaterialVariant { name: name.to_string(), material: None, material_file: None, color: None, rgba: None }
    }

    #[test]
    fn test_script_path() {
        let path = ScriptRenderer::script_path(Path::new("out/train/images/0000000001.png"));
        assert_eq!(path, PathBuf::from("out/train/images/0000000001.png.scene.json"));
    }

    #[test]
    fn test_render_writes_script() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = GeneratorConfig::default();
        config.output.output_dir = temp_dir.path().to_path_buf();
        let request = RenderRequest::for_image(&config, 7);

        let mut renderer = ScriptRenderer::new();
        renderer.register_material(&variant("plastic_red")).unwrap();
        renderer.set_camera(&CameraPose { position: [0.0, -10.0, 5.0], pitch: 30, yaw: 0 }).unwrap();
        renderer.spawn_shape("OBJECT_cube_0", Path::new("objects/cube.glb"), "cube").unwrap();
        renderer.attach_material("OBJECT_cube_0", "plastic_red").unwrap();

        let output = renderer.render(&request).unwrap();
        assert_eq!(output.image, request.image_path);

        let written = std::fs::read_to_string(ScriptRenderer::script_path(&request.image_path)).unwrap();
        let script: RenderScript = serde_json::from_str(&written).unwrap();
        assert_eq!(script.commands.len(), 3);
        assert_eq!(script.materials.len(), 1);
        assert!(written.contains("\"command\": \"attach_material\""));
    }

    #[test]
    fn test_clear_keeps_materials() {
        let mut renderer = ScriptRenderer::new();
        renderer.register_material(&variant("metal")).unwrap();
        renderer.add_light("Light_0", &PointLight { position: [1.0, 2.0, 3.0], intensity: 100.0 }).unwrap();
        renderer.clear().unwrap();
        assert!(renderer.commands().is_empty());
        assert_eq!(renderer.materials().len(), 1);
    }

    #[test]
    fn test_unregistered_material_rejected() {
        let mut renderer = ScriptRenderer::new();
        let err = renderer.attach_material("OBJECT_cube_0", "gold").unwrap_err();
        assert!(matches!(err, RenderError::Backend(_)));
    }
}
