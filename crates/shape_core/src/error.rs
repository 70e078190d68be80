use std::path::PathBuf;

use thiserror::Error;

/// Rule-correctness errors. All of them are fatal: they point at a malformed rules file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Attribute '{attribute}' is required for '{rule}'")]
    RequiredAttributeNotFound { attribute: String, rule: String },

    #[error("Attribute '{attribute}' must be unique but a duplicate value was found in '{rule}'")]
    DuplicateValue { attribute: String, rule: String },

    #[error("Trying to access undefined macro: '{0}'")]
    UndefinedMacro(String),

    #[error("Invalid value: '{value}' for attribute: '{attribute}'")]
    InvalidValue { attribute: String, value: String },

    #[error("Trying to apply undefined material: '{0}'")]
    UndefinedMaterial(String),

    #[error("Trying to apply undefined color: '{0}'")]
    UndefinedColor(String),

    #[error("Could not find shape matching this identification: {0}")]
    ShapeNotFound(String),

    #[error("Rules file is missing the '{0}' section")]
    MissingSection(String),

    #[error("Malformed rule #{index} in '{rule}': {reason}")]
    Malformed { rule: String, index: usize, reason: String },
}

impl RuleError {
    pub fn invalid(attribute: impl Into<String>, value: impl std::fmt::Display) -> Self {
        RuleError::InvalidValue { attribute: attribute.into(), value: value.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Failed to import mesh {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("Mesh {0} contains no triangles")]
    Empty(PathBuf),

    #[error("Face {face} references vertex {vertex} but the mesh has {count} vertices")]
    BadIndex { face: usize, vertex: usize, count: usize },

    #[error("No mesh loaded for {kind} '{name}'")]
    NotLoaded { kind: String, name: String },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Renderer backend error: {0}")]
    Backend(String),

    #[error("Renderer IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render script serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Rendering {target} failed after {attempts} attempts: {last}")]
    RetriesExhausted { target: PathBuf, attempts: u32, last: String },
}

/// Umbrella error for a generation run.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeneratorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GeneratorError::Io { path: path.into(), source }
    }

    /// Rule and configuration errors mean the inputs must be fixed before rerunning.
    pub fn is_input_error(&self) -> bool {
        matches!(self, GeneratorError::Rules(_) | GeneratorError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_attribute_and_rule() {
        let err = RuleError::RequiredAttributeNotFound {
            attribute: "hex".to_string(),
            rule: "colors".to_string(),
        };
        assert_eq!(err.to_string(), "Attribute 'hex' is required for 'colors'");

        let err = RuleError::DuplicateValue { attribute: "name".to_string(), rule: "objects".to_string() };
        assert!(err.to_string().contains("'name'"));
        assert!(err.to_string().contains("'objects'"));
    }

    #[test]
    fn test_input_error_classification() {
        let err: GeneratorError = RuleError::UndefinedMacro("size".to_string()).into();
        assert!(err.is_input_error());

        let err: GeneratorError = RenderError::Backend("gpu lost".to_string()).into();
        assert!(!err.is_input_error());
    }
}
