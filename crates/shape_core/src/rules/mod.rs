//! # Rules
//!
//! Loading pipeline: raw JSON → [`validate_document`] (macros, defaults, uniqueness)
//! → [`RuleStore`] (typed, read-only).
//!
//! ```rust,ignore
//! use shape_core::rules::{RuleDefaults, RuleStore};
//!
//! let document = serde_json::from_str(&text)?;
//! let store = RuleStore::from_document(document, RuleDefaults::builtin())?;
//! ```

pub mod defaults;
pub mod macros;
pub mod model;
pub mod store;
pub mod validator;

pub use defaults::{ComputedDefault, DefaultKind, DefaultSpec, RuleDefaults};
pub use macros::MacroTable;
pub use model::{
    AllowList, CategorySettings, ColorRule, FlipRule, FlipSetting, MaterialRule, RandomRotation,
    ScaleConsistency, ScalingRule, ShapeKind, ShapeRule,
};
pub use store::{Identifier, RuleEntry, RuleSection, RuleStore};
pub use validator::{validate_document, RuleValidator};

use std::path::Path;

use serde_json::Value;

use crate::error::{GeneratorError, Result};

/// Reads a rules file and returns the validated store.
pub fn load_rules_file(path: &Path, defaults: &RuleDefaults) -> Result<RuleStore> {
    let text = std::fs::read_to_string(path).map_err(|e| GeneratorError::io(path, e))?;
    let document: Value = serde_json::from_str(&text)?;
    let store = RuleStore::from_document(document, defaults)?;
    tracing::info!("Rules loaded from {}", path.display());
    Ok(store)
}
