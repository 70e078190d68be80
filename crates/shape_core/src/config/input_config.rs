//! Input Configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Asset directories and the rules file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Material assets (기본: ./materials)
    pub materials_dir: PathBuf,
    /// Object meshes (기본: ./objects)
    pub objects_dir: PathBuf,
    /// Decoy meshes (기본: ./decoys)
    pub decoys_dir: PathBuf,
    /// Rules file (기본: ./rules.json)
    pub rules: PathBuf,
    /// Base scene handed to the renderer; the working area is centred on its origin
    pub base_scene: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            materials_dir: PathBuf::from("./materials"),
            objects_dir: PathBuf::from("./objects"),
            decoys_dir: PathBuf::from("./decoys"),
            rules: PathBuf::from("./rules.json"),
            base_scene: None,
        }
    }
}
