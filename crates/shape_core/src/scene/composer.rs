//! Scene composition for one image
//!
//! Objects first, then decoys, sharing one collision set. A shape that cannot be
//! placed is dropped from the scene entirely: it gets no shape index, no annotation and
//! is never sent to the renderer.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::appearance::choose_random_appearance;
use super::bbox::Projector;
use super::camera::place_camera;
use super::lights::place_lights;
use super::placement::{try_shape_placement, Footprint};
use super::transform::{random_flip, random_rotation, random_scale};
use super::types::{clearance, linear_transform, ComposedScene, PlacedShape};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::mesh::MeshLibrary;
use crate::rules::{RuleStore, ShapeKind, ShapeRule};
use crate::taxonomy::CategoryTaxonomy;

/// Resume unit: the next image index and the next shape index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerState {
    pub img_index: u64,
    pub shape_index: u64,
}

pub struct SceneComposer<'a> {
    rules: &'a RuleStore,
    taxonomy: &'a CategoryTaxonomy,
    meshes: &'a MeshLibrary,
    config: &'a GeneratorConfig,
    state: ComposerState,
}

impl<'a> SceneComposer<'a> {
    pub fn new(
        rules: &'a RuleStore,
        taxonomy: &'a CategoryTaxonomy,
        meshes: &'a MeshLibrary,
        config: &'a GeneratorConfig,
        state: ComposerState,
    ) -> Self {
        Self { rules, taxonomy, meshes, config, state }
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    /// Composes the scene for the current image index and advances the state.
    pub fn compose<R: Rng>(&mut self, rng: &mut R) -> Result<ComposedScene> {
        let scene_config = &self.config.scene;
        let camera = place_camera(rng, &self.config.camera);
        let lights = place_lights(rng, &self.config.lights);

        let render = &self.config.render;
        let projector = render
            .create_bounding_boxes
            .then(|| Projector::new(&camera, &self.config.camera, render.images_width, render.images_height));

        let num_objects = rng.gen_range(scene_config.min_num_objects..=scene_config.max_num_objects);
        let num_decoys = rng.gen_range(scene_config.min_num_decoys..=scene_config.max_num_decoys);

        let mut footprints: Vec<Footprint> = Vec::new();
        let objects = self.place_kind(rng, ShapeKind::Object, num_objects, &mut footprints, projector.as_ref())?;
        let decoys = self.place_kind(rng, ShapeKind::Decoy, num_decoys, &mut footprints, None)?;

        let scene = ComposedScene { image_id: self.state.img_index, camera, lights, objects, decoys };
        debug!(
            "Image {}: {} objects ({} requested), {} decoys ({} requested)",
            scene.image_id,
            scene.objects.len(),
            num_objects,
            scene.decoys.len(),
            num_decoys
        );

        self.state.img_index += 1;
        Ok(scene)
    }

    fn place_kind<R: Rng>(
        &mut self,
        rng: &mut R,
        kind: ShapeKind,
        count: u32,
        footprints: &mut Vec<Footprint>,
        projector: Option<&Projector>,
    ) -> Result<Vec<PlacedShape>> {
        let pool = self.rules.shapes(kind).as_slice();
        if pool.is_empty() {
            if count > 0 {
                warn!("No {} rules defined, skipping {} {}s", kind, count, kind);
            }
            return Ok(Vec::new());
        }

        let mut placed = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let Some(shape) = pool.choose(rng) else { break };
            if let Some(instance) = self.place_shape(rng, kind, shape, footprints, projector)? {
                footprints.push(Footprint { position: instance.position, clearance: instance.clearance() });
                placed.push(instance);
            }
        }
        Ok(placed)
    }

    fn place_shape<R: Rng>(
        &mut self,
        rng: &mut R,
        kind: ShapeKind,
        shape: &ShapeRule,
        footprints: &[Footprint],
        projector: Option<&Projector>,
    ) -> Result<Option<PlacedShape>> {
        let mesh = self.meshes.get(kind, &shape.name)?;
        let appearance = choose_random_appearance(rng, self.rules, shape)?;

        let scale = random_scale(rng, shape.scaling.as_ref())?;
        let random = match &shape.random_rotation {
            Some(rule) => random_rotation(rng, rule, &mesh, self.config.scene.auto_snap_attempts)?,
            None => [0.0; 3],
        };
        let rotation = [0, 1, 2].map(|axis| random[axis] + shape.fixed_rotation[axis]);
        let flip = random_flip(rng, shape.flip.as_ref());

        let local = mesh.transformed(&linear_transform(&scale, &rotation, &flip));
        let snap_height = shape.snap_to_plane.then(|| local.raycast_down().unwrap_or(0.0));
        let own_clearance = clearance(shape.min_distance, &scale);

        let Some(position) = try_shape_placement(
            rng,
            self.config.scene.placement_bounds(),
            own_clearance,
            snap_height,
            footprints,
            self.config.scene.max_placement_attempts,
        ) else {
            warn!(
                "Could not place {} '{}' in image {} after {} attempts, dropping it",
                kind, shape.name, self.state.img_index, self.config.scene.max_placement_attempts
            );
            return Ok(None);
        };

        let material_name = appearance.material.map(|m| m.name.as_str());
        let color_name = appearance.color.map(|c| c.name.as_str());

        let category_id = match kind {
            ShapeKind::Object => {
                let id = self.taxonomy.category_id(&shape.name, material_name, color_name);
                if id.is_none() {
                    warn!(
                        "No category for '{}'",
                        self.taxonomy.label_for(&shape.name, material_name, color_name)
                    );
                }
                id
            }
            ShapeKind::Decoy => None,
        };

        let mut instance = PlacedShape {
            id: self.state.shape_index,
            kind,
            shape: shape.into(),
            material: appearance.material.map(Into::into),
            color: appearance.color.map(Into::into),
            scale,
            rotation,
            flip,
            position,
            category_id,
            bbox: None,
        };
        self.state.shape_index += 1;

        if let Some(projector) = projector {
            instance.bbox = projector.bounding_box(local.vertices().iter().map(|v| {
                nalgebra::Point3::new(v.x + position[0], v.y + position[1], v.z + position[2])
            }));
        }

        debug!(
            "Placed {} #{} '{}' at {:?} (scale {:?}, rotation {:?})",
            kind, instance.id, shape.name, position, scale, rotation
        );
        Ok(Some(instance))
    }
}
