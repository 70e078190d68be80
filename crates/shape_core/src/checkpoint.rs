//! Checkpoint / resume
//!
//! Everything needed to continue an interrupted run: the configuration, the validated
//! rules, the composer state and the annotations recorded so far.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::annotations::AnnotationDocument;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::persist::{read_json, write_json_atomic};
use crate::rules::{RuleDefaults, RuleStore};
use crate::scene::ComposerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Crate version that wrote the file
    pub version: String,
    pub config: GeneratorConfig,
    /// Validated rules document
    pub rules: Value,
    pub state: ComposerState,
    pub annotations: AnnotationDocument,
}

impl Checkpoint {
    pub fn new(
        config: &GeneratorConfig,
        rules: &RuleStore,
        state: ComposerState,
        annotations: &AnnotationDocument,
    ) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            config: config.clone(),
            rules: rules.raw().clone(),
            state,
            annotations: annotations.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        info!(
            "Checkpoint at image {} (shape index {}) written to {}",
            self.state.img_index,
            self.state.shape_index,
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let checkpoint: Checkpoint = read_json(path)?;
        if checkpoint.version != crate::VERSION {
            tracing::warn!("Checkpoint written by version {}, running {}", checkpoint.version, crate::VERSION);
        }
        Ok(checkpoint)
    }

    /// Re-validates the stored rules; validation of an already validated document is a no-op.
    pub fn rule_store(&self, defaults: &RuleDefaults) -> Result<RuleStore> {
        Ok(RuleStore::from_document(self.rules.clone(), defaults)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::store::tests::sample_store;
    use crate::taxonomy::CategoryTaxonomy;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_and_rebuild_rules() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("train_checkpoint.json");

        let store = sample_store();
        let taxonomy = CategoryTaxonomy::build(&store).unwrap();
        let annotations = AnnotationDocument::new(&taxonomy, &store);
        let state = ComposerState { img_index: 12, shape_index: 40 };
        let checkpoint = Checkpoint::new(&GeneratorConfig::default(), &store, state, &annotations);

        checkpoint.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.config, GeneratorConfig::default());

        let rebuilt = loaded.rule_store(RuleDefaults::builtin()).unwrap();
        assert_eq!(rebuilt.raw(), store.raw());
        assert_eq!(CategoryTaxonomy::build(&rebuilt).unwrap().entries(), taxonomy.entries());
    }
}
