//! Output Configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where and how many images are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 데이터셋 루트 (기본: ./output)
    pub output_dir: PathBuf,
    /// Prefix for every generated file (기본: none)
    pub filename_prefix: Option<String>,
    /// Dataset split, also the sub-directory name (기본: train)
    pub split: String,
    /// 렌더링할 이미지 수 (기본: 1)
    pub num_images: u64,
    /// Index of the first image (기본: 0)
    pub start_index: u64,
    /// Images between checkpoint writes, 0 disables periodic checkpoints (기본: 1)
    pub checkpoint_every: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            filename_prefix: None,
            split: "train".to_string(),
            num_images: 1,
            start_index: 0,
            checkpoint_every: 1,
        }
    }
}

impl OutputConfig {
    fn prefixed(&self, name: &str) -> String {
        match &self.filename_prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_string(),
        }
    }

    /// `<output_dir>/<split>`
    pub fn split_dir(&self) -> PathBuf {
        self.output_dir.join(&self.split)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.split_dir().join("images")
    }

    /// `[prefix_]0000000042.png`
    pub fn image_file_name(&self, index: u64) -> String {
        self.prefixed(&format!("{index:010}.png"))
    }

    pub fn image_path(&self, index: u64) -> PathBuf {
        self.images_dir().join(self.image_file_name(index))
    }

    /// Instance-id buffer, `<split>/segmentations/<image name>`
    pub fn segmentation_path(&self, index: u64) -> PathBuf {
        self.split_dir().join("segmentations").join(self.image_file_name(index))
    }

    /// Depth buffer, `<split>/depth/<image stem>.exr`
    pub fn depth_path(&self, index: u64) -> PathBuf {
        self.split_dir().join("depth").join(self.prefixed(&format!("{index:010}.exr")))
    }

    pub fn annotations_path(&self) -> PathBuf {
        self.split_dir().join(self.prefixed(&format!("{}_annotations.json", self.split)))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.split_dir().join(self.prefixed(&format!("{}_checkpoint.json", self.split)))
    }

    /// Creates `<output_dir>/<split>/images`.
    pub fn create_directory_tree(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.images_dir())
    }
}
