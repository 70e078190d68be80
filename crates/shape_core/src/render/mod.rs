//! # Renderer Interface
//!
//! The 3-D renderer is an external collaborator. The generator drives it through the
//! [`Renderer`] command set: materials once per run, then per image the camera, lights
//! and shape instances, one render call, and a clear.

pub mod script;

pub use script::{RenderCommand, RenderScript, ScriptRenderer};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{GeneratorConfig, InputConfig};
use crate::error::{RenderError, RuleError};
use crate::rules::{RuleStore, ShapeKind};
use crate::scene::{material_variant_name, mirror_signs, CameraPose, ComposedScene, PointLight};

/// A material/color combination registered with the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialVariant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Scene-linear RGBA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgba: Option<[f64; 4]>,
}

/// Every variant a composed scene can reference.
///
/// A bare `<material>` for every material (used when a shape and its material share no
/// color), one `<material>_<color>` per allowed color, and `color_<color>` for the
/// colors of shapes that allow no material.
pub fn material_variants(rules: &RuleStore, materials_dir: &Path) -> Result<Vec<MaterialVariant>, RuleError> {
    let mut variants = Vec::new();

    for material in rules.materials.iter() {
        let material_file = Some(materials_dir.join(&material.file));
        variants.push(MaterialVariant {
            name: material.name.clone(),
            material: Some(material.name.clone()),
            material_file: material_file.clone(),
            color: None,
            rgba: None,
        });
        for color_name in material.allowed_colors.resolve(rules.colors.names()) {
            let color = rules.color(&color_name)?;
            let name = material_variant_name(Some(material.name.as_str()), Some(color.name.as_str()));
            variants.push(MaterialVariant {
                name: name.unwrap_or_default(),
                material: Some(material.name.clone()),
                material_file: material_file.clone(),
                color: Some(color.name.clone()),
                rgba: Some(color.linear_rgba()?),
            });
        }
    }

    let mut color_only: Vec<String> = Vec::new();
    for kind in [ShapeKind::Object, ShapeKind::Decoy] {
        for shape in rules.shapes(kind) {
            if !rules.allowed_materials_for(shape).is_empty() {
                continue;
            }
            for color in rules.composite_colors_for(shape, None) {
                if !color_only.contains(&color) {
                    color_only.push(color);
                }
            }
        }
    }
    for color_name in color_only {
        let color = rules.color(&color_name)?;
        variants.push(MaterialVariant {
            name: material_variant_name(None, Some(color.name.as_str())).unwrap_or_default(),
            material: None,
            material_file: None,
            color: Some(color.name.clone()),
            rgba: Some(color.linear_rgba()?),
        });
    }

    Ok(variants)
}

/// Location, XYZ euler degrees, and scale with mirror flags folded in as negative factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceTransform {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

/// Output targets of one render call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub image_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub use_gpu: bool,
    pub min_pixels_per_object: u32,
}

impl RenderRequest {
    pub fn for_image(config: &GeneratorConfig, index: u64) -> Self {
        let output = &config.output;
        let render = &config.render;
        Self {
            image_path: output.image_path(index),
            segmentation_path: render.create_segmentations.then(|| output.segmentation_path(index)),
            depth_path: render.create_depth.then(|| output.depth_path(index)),
            width: render.images_width,
            height: render.images_height,
            use_gpu: render.use_gpu,
            min_pixels_per_object: render.min_pixels_per_object,
        }
    }
}

/// Files produced by a render call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub image: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<PathBuf>,
}

pub trait Renderer {
    fn register_material(&mut self, variant: &MaterialVariant) -> Result<(), RenderError>;

    /// Creates instance `instance` from object `object` of `asset`.
    fn spawn_shape(&mut self, instance: &str, asset: &Path, object: &str) -> Result<(), RenderError>;

    fn set_transform(&mut self, instance: &str, transform: &InstanceTransform) -> Result<(), RenderError>;

    fn attach_material(&mut self, instance: &str, variant: &str) -> Result<(), RenderError>;

    fn add_light(&mut self, name: &str, light: &PointLight) -> Result<(), RenderError>;

    /// Places the camera, looking at the origin.
    fn set_camera(&mut self, camera: &CameraPose) -> Result<(), RenderError>;

    /// Synchronous render of the staged scene.
    fn render(&mut self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;

    /// Removes every shape instance and light.
    fn clear(&mut self) -> Result<(), RenderError>;
}

/// Issues the commands for a composed scene.
pub fn stage_scene<R: Renderer + ?Sized>(
    renderer: &mut R,
    scene: &ComposedScene,
    input: &InputConfig,
) -> Result<(), RenderError> {
    renderer.set_camera(&scene.camera)?;
    for (i, light) in scene.lights.iter().enumerate() {
        renderer.add_light(&format!("Light_{i}"), light)?;
    }

    for instance in scene.instances() {
        let dir = match instance.kind {
            ShapeKind::Object => &input.objects_dir,
            ShapeKind::Decoy => &input.decoys_dir,
        };
        let name = instance.instance_name();
        renderer.spawn_shape(&name, &dir.join(&instance.shape.file), &instance.shape.name)?;

        let mirror = mirror_signs(&instance.flip);
        let transform = InstanceTransform {
            location: instance.position,
            rotation: instance.rotation,
            scale: [0, 1, 2].map(|axis| instance.scale[axis] * mirror[axis]),
        };
        renderer.set_transform(&name, &transform)?;

        if let Some(variant) = instance.material_variant() {
            renderer.attach_material(&name, &variant)?;
        }
    }
    Ok(())
}

/// Calls [`Renderer::render`] up to `max_attempts` times.
pub fn render_with_retry<R: Renderer + ?Sized>(
    renderer: &mut R,
    request: &RenderRequest,
    max_attempts: u32,
) -> Result<RenderOutput, RenderError> {
    let max_attempts = max_attempts.max(1);
    let mut last = String::new();
    for attempt in 1..=max_attempts {
        match renderer.render(request) {
            Ok(output) => return Ok(output),
            Err(e) => {
                warn!(
                    "Render of {} failed (attempt {}/{}): {}",
                    request.image_path.display(),
                    attempt,
                    max_attempts,
                    e
                );
                last = e.to_string();
            }
        }
    }
    Err(RenderError::RetriesExhausted { target: request.image_path.clone(), attempts: max_attempts, last })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::store::tests::sample_store;

    /// Fails the first `failures` render calls.
    struct Flaky {
        failures: u32,
        calls: u32,
    }

    impl Renderer for Flaky {
        fn register_material(&mut self, _: &MaterialVariant) -> Result<(), RenderError> {
            Ok(())
        }
        fn spawn_shape(&mut self, _: &str, _: &Path, _: &str) -> Result<(), RenderError> {
            Ok(())
        }
        fn set_transform(&mut self, _: &str, _: &InstanceTransform) -> Result<(), RenderError> {
            Ok(())
        }
        fn attach_material(&mut self, _: &str, _: &str) -> Result<(), RenderError> {
            Ok(())
        }
        fn add_light(&mut self, _: &str, _: &PointLight) -> Result<(), RenderError> {
            Ok(())
        }
        fn set_camera(&mut self, _: &CameraPose) -> Result<(), RenderError> {
            Ok(())
        }
        fn render(&mut self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
            self.calls += 1;
            if self.calls <= self.failures {
                return Err(RenderError::Backend("device lost".to_string()));
            }
            Ok(RenderOutput { image: request.image_path.clone(), segmentation: None, depth: None })
        }
        fn clear(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn request() -> RenderRequest {
        RenderRequest::for_image(&GeneratorConfig::default(), 0)
    }

    #[test]
    fn test_retry_recovers() {
        let mut renderer = Flaky { failures: 2, calls: 0 };
        let output = render_with_retry(&mut renderer, &request(), 5).unwrap();
        assert_eq!(renderer.calls, 3);
        assert!(output.image.ends_with("0000000000.png"));
    }

    #[test]
    fn test_retry_is_bounded() {
        let mut renderer = Flaky { failures: 10, calls: 0 };
        let err = render_with_retry(&mut renderer, &request(), 3).unwrap_err();
        assert_eq!(renderer.calls, 3);
        assert!(matches!(err, RenderError::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn test_request_buffers_follow_flags() {
        let mut config = GeneratorConfig::default();
        config.render.create_depth = false;
        let request = RenderRequest::for_image(&config, 3);
        assert!(request.segmentation_path.is_some());
        assert!(request.depth_path.is_none());
    }

    #[test]
    fn test_material_variants() {
        let store = sample_store();
        let variants = material_variants(&store, Path::new("materials")).unwrap();
        let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "plastic",
                "plastic_red",
                "plastic_green",
                "plastic_blue",
                "metal",
                "metal_blue",
                "metal_green",
                "color_red",
                "color_green",
                "color_blue"
            ]
        );
        let metal_blue = &variants[5];
        assert_eq!(metal_blue.material_file.as_deref(), Some(Path::new("materials/metal.blend")));
        assert_eq!(metal_blue.rgba, Some([0.0, 0.0, 1.0, 1.0]));
    }
}
