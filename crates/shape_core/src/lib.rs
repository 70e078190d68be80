//! # shape_core - Synthetic Shape Dataset Generator
//!
//! Rule-driven scene composition for fully synthetic computer-vision datasets.
//!
//! ## Features
//! - Rules file validation with macros, computed defaults and uniqueness checks
//! - Deterministic category taxonomy from the appearance rules
//! - Collision-free shape placement, camera and light placement
//! - Renderer hand-off through the [`render::Renderer`] command set
//! - COCO-style annotations, checkpoint and resume
//! - Throughput-proportional work partition for multi-process runs
//!
//! Same seed = same dataset.

// Doc formatting lints - purely cosmetic, fix incrementally
#![allow(clippy::doc_lazy_continuation)]
// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Per-axis loops over [f64; 3] read better indexed
#![allow(clippy::needless_range_loop)]

pub mod annotations;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod mesh;
pub mod persist;
pub mod pipeline;
pub mod render;
pub mod rules;
pub mod scene;
pub mod shards;
pub mod taxonomy;

pub use annotations::{AnnotationDocument, ImageRecord, ObjectAnnotation};
pub use checkpoint::Checkpoint;
pub use config::GeneratorConfig;
pub use error::{ConfigError, GeneratorError, MeshError, RenderError, Result, RuleError};
pub use mesh::{Mesh, MeshLibrary};
pub use pipeline::{DatasetGenerator, ImageProgress, RunSummary, StopHandle};
pub use render::{Renderer, ScriptRenderer};
pub use rules::{load_rules_file, Identifier, RuleDefaults, RuleStore};
pub use scene::{ComposedScene, ComposerState, SceneComposer};
pub use shards::{divide_workload, WorkShard};
pub use taxonomy::{CategoryEntry, CategoryTaxonomy};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
