//! Render Configuration

use serde::{Deserialize, Serialize};

use super::flag;

/// Options forwarded to the renderer, plus the retry bound.
///
/// Boolean keys also accept `0` / `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub images_width: u32,
    pub images_height: u32,
    #[serde(deserialize_with = "flag::deserialize")]
    pub use_gpu: bool,
    #[serde(deserialize_with = "flag::deserialize")]
    pub create_segmentations: bool,
    #[serde(deserialize_with = "flag::deserialize")]
    pub create_depth: bool,
    #[serde(deserialize_with = "flag::deserialize")]
    pub create_bounding_boxes: bool,
    /// Visibility threshold, interpreted by the renderer (기본: 200)
    pub min_pixels_per_object: u32,
    /// Attempts per image before the run aborts (기본: 5)
    pub max_render_retries: u32,
    /// Single image, render call skipped
    #[serde(deserialize_with = "flag::deserialize")]
    pub test_mode: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            images_width: 640,
            images_height: 640,
            use_gpu: true,
            create_segmentations: true,
            create_depth: true,
            create_bounding_boxes: true,
            min_pixels_per_object: 200,
            max_render_retries: 5,
            test_mode: false,
        }
    }
}
