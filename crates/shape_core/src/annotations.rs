//! # Annotation Document
//!
//! COCO-style output written once per split:
//! `{info, licenses, images, annotations, scenes, categories, rules}`.
//!
//! Only objects that received a bounding box produce an `annotations[]` entry; decoys
//! appear in `scenes[]` only.

use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::persist::{read_json, write_json_atomic};
use crate::render::RenderOutput;
use crate::rules::RuleStore;
use crate::scene::ComposedScene;
use crate::taxonomy::{CategoryEntry, CategoryTaxonomy};

pub const DATASET_DESCRIPTION: &str = "SSHAPE Dataset, a fully synthetic dataset for computer vision";
pub const DATASET_VERSION: &str = "pre-release";

/// `license` value of images without a license entry
pub const NO_LICENSE: i64 = -1;

/// Rule sections copied into the `rules` block.
const RULE_SECTIONS: [&str; 4] = ["materials", "colors", "objects", "decoys"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub description: String,
    pub url: String,
    pub version: String,
    pub contributor: String,
    /// `YYYY-MM-DD`
    pub date_created: String,
}

impl DatasetInfo {
    pub fn new(created: DateTime<Local>) -> Self {
        Self {
            description: DATASET_DESCRIPTION.to_string(),
            url: String::new(),
            version: DATASET_VERSION.to_string(),
            contributor: String::new(),
            date_created: created.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    /// `YYYY-MM-DD HH:MM:SS`
    pub date_captured: String,
    pub license: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_file: Option<String>,
}

impl ImageRecord {
    pub fn new(id: u64, file_name: impl Into<String>, width: u32, height: u32, captured: DateTime<Local>) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            height,
            width,
            date_captured: captured.format("%Y-%m-%d %H:%M:%S").to_string(),
            license: NO_LICENSE,
            segmentation_file: None,
            depth_file: None,
        }
    }

    /// Records the auxiliary buffers the renderer produced.
    pub fn with_render_output(mut self, output: &RenderOutput) -> Self {
        self.segmentation_file = output.segmentation.as_deref().map(file_name_of);
        self.depth_file = output.depth.as_deref().map(file_name_of);
        self
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// One detection annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    /// The object's run-wide shape index
    pub id: u64,
    pub category_id: usize,
    pub iscrowd: u8,
    pub image_id: u64,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub info: DatasetInfo,
    pub licenses: Vec<License>,
    pub images: Vec<ImageRecord>,
    pub annotations: Vec<ObjectAnnotation>,
    pub scenes: Vec<ComposedScene>,
    pub categories: Vec<CategoryEntry>,
    pub rules: Value,
}

impl AnnotationDocument {
    pub fn new(taxonomy: &CategoryTaxonomy, rules: &RuleStore) -> Self {
        Self::created_at(taxonomy, rules, Local::now())
    }

    pub fn created_at(taxonomy: &CategoryTaxonomy, rules: &RuleStore, created: DateTime<Local>) -> Self {
        let mut sections = Map::new();
        for section in RULE_SECTIONS {
            if let Some(value) = rules.raw().get(section) {
                sections.insert(section.to_string(), value.clone());
            }
        }

        Self {
            info: DatasetInfo::new(created),
            licenses: Vec::new(),
            images: Vec::new(),
            annotations: Vec::new(),
            scenes: Vec::new(),
            categories: taxonomy.entries().to_vec(),
            rules: Value::Object(sections),
        }
    }

    /// Appends the image, its scene, and one annotation per boxed object.
    pub fn record(&mut self, image: ImageRecord, scene: ComposedScene) {
        for object in &scene.objects {
            let (Some(category_id), Some(bbox)) = (object.category_id, object.bbox) else {
                continue;
            };
            self.annotations.push(ObjectAnnotation {
                id: object.id,
                category_id,
                iscrowd: 0,
                image_id: scene.image_id,
                bbox,
                area: bbox[2] * bbox[3],
            });
        }
        self.images.push(image);
        self.scenes.push(scene);
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        tracing::info!(
            "Saved {} images / {} annotations to {}",
            self.images.len(),
            self.annotations.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::store::tests::sample_store;
    use crate::rules::ShapeKind;
    use crate::scene::{CameraPose, PlacedShape, ShapeRef};
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn placed(id: u64, kind: ShapeKind, category_id: Option<usize>, bbox: Option<[f64; 4]>) -> PlacedShape {
        PlacedShape {
            id,
            kind,
            shape: ShapeRef { id: 0, name: "cube".to_string(), file: "cube.glb".to_string(), min_distance: 0.5 },
            material: None,
            color: None,
            scale: [1.0; 3],
            rotation: [0.0; 3],
            flip: [false; 3],
            position: [0.0; 3],
            category_id,
            bbox,
        }
    }

    fn scene() -> ComposedScene {
        ComposedScene {
            image_id: 4,
            camera: CameraPose { position: [0.0, 2.5, 1.0], pitch: 30, yaw: 0 },
            lights: Vec::new(),
            objects: vec![
                placed(10, ShapeKind::Object, Some(2), Some([5.0, 6.0, 10.0, 20.0])),
                placed(11, ShapeKind::Object, Some(1), None),
            ],
            decoys: vec![placed(12, ShapeKind::Decoy, None, None)],
        }
    }

    fn document() -> AnnotationDocument {
        let store = sample_store();
        let taxonomy = CategoryTaxonomy::build(&store).unwrap();
        let created = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        AnnotationDocument::created_at(&taxonomy, &store, created)
    }

    #[test]
    fn test_info_and_rules_block() {
        let doc = document();
        assert_eq!(doc.info.date_created, "2024-03-09");
        assert_eq!(doc.info.version, "pre-release");
        assert!(doc.licenses.is_empty());
        let keys: Vec<&String> = doc.rules.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["materials", "colors", "objects", "decoys"]);
        assert_eq!(doc.categories[0].id, 0);
    }

    #[test]
    fn test_only_boxed_objects_are_annotated() {
        let mut doc = document();
        let captured = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        doc.record(ImageRecord::new(4, "0000000004.png", 640, 480, captured), scene());

        assert_eq!(doc.annotations.len(), 1);
        let annotation = &doc.annotations[0];
        assert_eq!(annotation.id, 10);
        assert_eq!(annotation.image_id, 4);
        assert_eq!(annotation.category_id, 2);
        assert_eq!(annotation.area, 200.0);
        assert_eq!(doc.images[0].date_captured, "2024-03-09 14:05:07");
        assert_eq!(doc.images[0].license, -1);
        assert_eq!(doc.scenes[0].decoys.len(), 1);
    }

    #[test]
    fn test_render_output_file_names() {
        let output = RenderOutput {
            image: PathBuf::from("out/train/images/0000000001.png"),
            segmentation: Some(PathBuf::from("out/train/segmentations/0000000001.png")),
            depth: None,
        };
        let record = ImageRecord::new(1, "0000000001.png", 64, 64, Local::now()).with_render_output(&output);
        assert_eq!(record.segmentation_file.as_deref(), Some("0000000001.png"));
        assert!(record.depth_file.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("train").join("train_annotations.json");

        let mut doc = document();
        doc.record(ImageRecord::new(4, "0000000004.png", 640, 480, Local::now()), scene());
        doc.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"camera_position\""));
        assert!(text.contains("\"iscrowd\": 0"));

        let loaded = AnnotationDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);
    }
}
