//! # Scene Composition
//!
//! Per image: camera → lights → objects → decoys. Every random draw goes through the
//! caller's RNG, so a seeded RNG reproduces the scene exactly.

pub mod appearance;
pub mod bbox;
pub mod camera;
pub mod composer;
pub mod lights;
pub mod placement;
pub mod transform;
pub mod types;

pub use appearance::{choose_random_appearance, Appearance};
pub use bbox::Projector;
pub use camera::place_camera;
pub use composer::{ComposerState, SceneComposer};
pub use lights::place_lights;
pub use placement::{check_min_distance, try_shape_placement, Footprint};
pub use transform::{random_flip, random_rotation, random_scale, stepped_values};
pub use types::{
    linear_transform, material_variant_name, mirror_signs, CameraPose, ColorRef, ComposedScene, MaterialRef,
    PlacedShape, PointLight, ShapeRef,
};
