//! JSON files written by a run (annotations, checkpoints)

use std::fs::{rename, File};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{GeneratorError, Result};

/// Atomic save: the value is written to `<path>.tmp`, synced, then renamed over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GeneratorError::io(parent, e))?;
    }

    let data = serde_json::to_vec_pretty(value)?;
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path).map_err(|e| GeneratorError::io(&temp_path, e))?;
        file.write_all(&data).map_err(|e| GeneratorError::io(&temp_path, e))?;
        file.flush().map_err(|e| GeneratorError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| GeneratorError::io(&temp_path, e))?;
    }
    rename(&temp_path, path).map_err(|e| GeneratorError::io(path, e))?;

    debug!("Saved {} bytes to {:?}", data.len(), path);
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| GeneratorError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}
