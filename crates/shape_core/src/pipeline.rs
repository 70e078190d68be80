//! # Dataset Generation Pipeline
//!
//! `INIT → (COMPOSE → RENDER → CLEAR) × N → FINALIZE`
//!
//! Each image draws from its own RNG, seeded from the run seed and the image index, so a
//! resumed run reproduces the images an uninterrupted run would have produced.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::annotations::{AnnotationDocument, ImageRecord};
use crate::checkpoint::Checkpoint;
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::mesh::MeshLibrary;
use crate::render::{material_variants, render_with_retry, stage_scene, RenderRequest, Renderer};
use crate::rules::{RuleDefaults, RuleStore};
use crate::scene::{ComposerState, SceneComposer};
use crate::taxonomy::CategoryTaxonomy;

/// Cooperative stop request, checked between images.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reported after every finished image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProgress {
    pub image_id: u64,
    /// Images finished in this run, resumed images included
    pub done: u64,
    pub total: u64,
    pub objects: usize,
    pub decoys: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub images: u64,
    pub objects: u64,
    pub decoys: u64,
    pub annotations: usize,
    pub stopped: bool,
    pub annotations_path: PathBuf,
}

/// RNG seed of one image
pub fn image_seed(run_seed: u64, image_index: u64) -> u64 {
    run_seed ^ image_index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct DatasetGenerator<R: Renderer> {
    config: GeneratorConfig,
    rules: RuleStore,
    taxonomy: CategoryTaxonomy,
    meshes: MeshLibrary,
    renderer: R,
    state: ComposerState,
    annotations: AnnotationDocument,
    stop: StopHandle,
}

impl<R: Renderer> DatasetGenerator<R> {
    /// A fresh run starting at `start_index`.
    pub fn new(config: GeneratorConfig, rules: RuleStore, meshes: MeshLibrary, renderer: R) -> Result<Self> {
        let mut config = config.normalized();
        config.validate()?;
        if config.scene.seed.is_none() {
            config.scene.seed = Some(rand::thread_rng().gen());
        }

        let taxonomy = CategoryTaxonomy::build(&rules)?;
        info!("Category taxonomy: {} categories", taxonomy.len());
        let annotations = AnnotationDocument::new(&taxonomy, &rules);
        let state = ComposerState { img_index: config.output.start_index, shape_index: 0 };

        Ok(Self { config, rules, taxonomy, meshes, renderer, state, annotations, stop: StopHandle::new() })
    }

    /// Continues the run recorded in `checkpoint`.
    pub fn resume(
        checkpoint: Checkpoint,
        defaults: &RuleDefaults,
        meshes: MeshLibrary,
        renderer: R,
    ) -> Result<Self> {
        let rules = checkpoint.rule_store(defaults)?;
        let mut generator = Self::new(checkpoint.config, rules, meshes, renderer)?;
        generator.state = checkpoint.state;
        generator.annotations = checkpoint.annotations;
        info!(
            "Resuming at image {} (shape index {}, {} images recorded)",
            generator.state.img_index,
            generator.state.shape_index,
            generator.annotations.images.len()
        );
        Ok(generator)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn taxonomy(&self) -> &CategoryTaxonomy {
        &self.taxonomy
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn annotations(&self) -> &AnnotationDocument {
        &self.annotations
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn end_index(&self) -> u64 {
        self.config.output.start_index + self.config.output.num_images
    }

    fn checkpoint(&self, state: ComposerState) -> Result<()> {
        Checkpoint::new(&self.config, &self.rules, state, &self.annotations)
            .save(&self.config.output.checkpoint_path())
    }

    /// Generates the remaining images, then writes the annotation file.
    pub fn run<F: FnMut(&ImageProgress)>(&mut self, mut on_image: F) -> Result<RunSummary> {
        let output = self.config.output.clone();
        output.create_directory_tree().map_err(|e| GeneratorError::io(output.images_dir(), e))?;

        let test_mode = self.config.render.test_mode;
        if !test_mode {
            let variants = material_variants(&self.rules, &self.config.input.materials_dir)?;
            for variant in &variants {
                self.renderer.register_material(variant)?;
            }
            info!("Registered {} material variants", variants.len());
        }

        let run_seed = self.config.scene.seed.unwrap_or_default();
        let end = self.end_index();
        let total = self.config.output.num_images;
        let mut stopped = false;
        info!("Generating images {}..{} into {}", self.state.img_index, end, output.split_dir().display());

        while self.state.img_index < end {
            if self.stop.is_stop_requested() {
                stopped = true;
                break;
            }

            let before = self.state;
            let image_id = before.img_index;
            let mut rng = ChaCha8Rng::seed_from_u64(image_seed(run_seed, image_id));

            let scene = {
                let mut composer =
                    SceneComposer::new(&self.rules, &self.taxonomy, &self.meshes, &self.config, self.state);
                let scene = composer.compose(&mut rng)?;
                self.state = composer.state();
                scene
            };

            let render = &self.config.render;
            let mut record = ImageRecord::new(
                image_id,
                output.image_file_name(image_id),
                render.images_width,
                render.images_height,
                Local::now(),
            );

            if !test_mode {
                let request = RenderRequest::for_image(&self.config, image_id);
                let rendered = stage_scene(&mut self.renderer, &scene, &self.config.input)
                    .and_then(|()| render_with_retry(&mut self.renderer, &request, render.max_render_retries));
                match rendered {
                    Ok(result) => record = record.with_render_output(&result),
                    Err(e) => {
                        warn!("Aborting at image {}, writing checkpoint", image_id);
                        self.checkpoint(before)?;
                        return Err(e.into());
                    }
                }
                self.renderer.clear()?;
            }

            let progress = ImageProgress {
                image_id,
                done: image_id + 1 - output.start_index,
                total,
                objects: scene.objects.len(),
                decoys: scene.decoys.len(),
            };
            self.annotations.record(record, scene);
            on_image(&progress);

            let every = output.checkpoint_every;
            if every > 0 && progress.done % every == 0 && self.state.img_index < end {
                self.checkpoint(self.state)?;
            }
        }

        if stopped {
            info!("Stop requested, flushing after image {}", self.state.img_index);
            self.checkpoint(self.state)?;
        }

        let annotations_path = output.annotations_path();
        self.annotations.save(&annotations_path)?;

        let summary = RunSummary {
            images: self.annotations.images.len() as u64,
            objects: self.annotations.scenes.iter().map(|s| s.objects.len() as u64).sum(),
            decoys: self.annotations.scenes.iter().map(|s| s.decoys.len() as u64).sum(),
            annotations: self.annotations.annotations.len(),
            stopped,
            annotations_path,
        };
        info!(
            "Run finished: {} images, {} objects, {} decoys, {} annotations",
            summary.images,
            summary.objects,
            summary.decoys,
            summary.annotations
        );
        Ok(summary)
    }
}
