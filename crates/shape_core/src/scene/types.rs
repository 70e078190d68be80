//! Scene records, shared by the composer, the renderer hand-off and the annotations

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::rules::{ColorRule, MaterialRule, ShapeKind, ShapeRule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRef {
    pub id: i64,
    pub name: String,
    pub file: String,
    pub min_distance: f64,
}

impl From<&ShapeRule> for ShapeRef {
    fn from(rule: &ShapeRule) -> Self {
        Self { id: rule.id, name: rule.name.clone(), file: rule.file.clone(), min_distance: rule.min_distance }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRef {
    pub id: i64,
    pub name: String,
    pub file: String,
}

impl From<&MaterialRule> for MaterialRef {
    fn from(rule: &MaterialRule) -> Self {
        Self { id: rule.id, name: rule.name.clone(), file: rule.file.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRef {
    pub id: i64,
    pub name: String,
    pub hex: String,
}

impl From<&ColorRule> for ColorRef {
    fn from(rule: &ColorRule) -> Self {
        Self { id: rule.id, name: rule.name.clone(), hex: rule.hex.clone() }
    }
}

/// Camera on its orbit, looking at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    #[serde(rename = "camera_position")]
    pub position: [f64; 3],
    /// degrees
    #[serde(rename = "camera_pitch")]
    pub pitch: i32,
    /// degrees
    #[serde(rename = "camera_yaw")]
    pub yaw: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: [f64; 3],
    pub intensity: f64,
}

/// Name the renderer gives a material/color combination.
///
/// `None` when the instance has neither, the renderer keeps the asset's own material.
pub fn material_variant_name(material: Option<&str>, color: Option<&str>) -> Option<String> {
    match (material, color) {
        (Some(m), Some(c)) => Some(format!("{m}_{c}")),
        (Some(m), None) => Some(m.to_string()),
        (None, Some(c)) => Some(format!("color_{c}")),
        (None, None) => None,
    }
}

/// One placed object or decoy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedShape {
    /// Run-wide shape index
    pub id: u64,
    pub kind: ShapeKind,
    pub shape: ShapeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorRef>,
    pub scale: [f64; 3],
    /// Random plus fixed rotation, XYZ euler degrees
    pub rotation: [f64; 3],
    /// Mirror flags in `[xy, xz, yz]` order
    pub flip: [bool; 3],
    pub position: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<usize>,
    /// `[x, y, width, height]` in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl PlacedShape {
    /// `min_distance` scaled by the largest scale component.
    pub fn clearance(&self) -> f64 {
        clearance(self.shape.min_distance, &self.scale)
    }

    pub fn material_variant(&self) -> Option<String> {
        material_variant_name(
            self.material.as_ref().map(|m| m.name.as_str()),
            self.color.as_ref().map(|c| c.name.as_str()),
        )
    }

    /// Scene node name, `OBJECT_<shape>_<id>`.
    pub fn instance_name(&self) -> String {
        format!("OBJECT_{}_{}", self.shape.name, self.id)
    }

    /// Rotation, scale and mirror without the translation.
    pub fn linear_transform(&self) -> Matrix3<f64> {
        linear_transform(&self.scale, &self.rotation, &self.flip)
    }

    pub fn to_world(&self, local: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear_transform() * local.coords + Vector3::from(self.position))
    }
}

pub(crate) fn clearance(min_distance: f64, scale: &[f64; 3]) -> f64 {
    min_distance * scale.iter().copied().fold(f64::MIN, f64::max)
}

/// XYZ euler rotation (degrees) as used by the renderer: `Rz * Ry * Rx`.
pub fn rotation_from_degrees(rotation: &[f64; 3]) -> Rotation3<f64> {
    Rotation3::from_euler_angles(
        rotation[0].to_radians(),
        rotation[1].to_radians(),
        rotation[2].to_radians(),
    )
}

/// Per-axis mirror signs for `[xy, xz, yz]` flags: xy mirrors z, xz mirrors y, yz mirrors x.
pub fn mirror_signs(flip: &[bool; 3]) -> [f64; 3] {
    let sign = |f: bool| if f { -1.0 } else { 1.0 };
    [sign(flip[2]), sign(flip[1]), sign(flip[0])]
}

/// `R * diag(scale * mirror)`
pub fn linear_transform(scale: &[f64; 3], rotation: &[f64; 3], flip: &[bool; 3]) -> Matrix3<f64> {
    let mirror = mirror_signs(flip);
    let diagonal = Vector3::new(scale[0] * mirror[0], scale[1] * mirror[1], scale[2] * mirror[2]);
    rotation_from_degrees(rotation).matrix() * Matrix3::from_diagonal(&diagonal)
}

/// Everything composed for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedScene {
    pub image_id: u64,
    #[serde(flatten)]
    pub camera: CameraPose,
    pub lights: Vec<PointLight>,
    pub objects: Vec<PlacedShape>,
    pub decoys: Vec<PlacedShape>,
}

impl ComposedScene {
    pub fn instances(&self) -> impl Iterator<Item = &PlacedShape> {
        self.objects.iter().chain(self.decoys.iter())
    }

    pub fn len(&self) -> usize {
        self.objects.len() + self.decoys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.decoys.is_empty()
    }
}
