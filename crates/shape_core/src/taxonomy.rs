//! Category taxonomy
//!
//! The closed label set derived once per run from the object rules and the
//! `ignore_material` / `ignore_color` flags. Position in the list is the category id
//! written to annotations, so the order is fixed for the lifetime of a run.
//!
//! Policy:
//! - only `objects` are categorized, decoys never are
//! - a label is `"[color ][material ]shape"`, dropping ignored or empty dimensions
//! - a shape with no allowed materials enumerates its own allowed colors

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::rules::{CategorySettings, RuleStore};

/// One taxonomy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: usize,
    pub name: String,
    /// shape name
    pub supercategory: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTaxonomy {
    entries: Vec<CategoryEntry>,
    index: HashMap<String, usize>,
    settings: CategorySettings,
}

impl CategoryTaxonomy {
    pub fn build(rules: &RuleStore) -> Result<Self, RuleError> {
        let settings = rules.categories;
        let mut taxonomy = CategoryTaxonomy { settings, ..Default::default() };

        for shape in rules.objects.iter() {
            let materials = rules.allowed_materials_for(shape);

            if materials.is_empty() {
                let colors = rules.composite_colors_for(shape, None);
                taxonomy.insert_branch(&shape.name, None, &colors);
                continue;
            }

            for material_name in &materials {
                let material = rules.material(material_name)?;
                let colors = rules.composite_colors_for(shape, Some(material));
                taxonomy.insert_branch(&shape.name, Some(material_name.as_str()), &colors);
            }
        }

        tracing::info!("Category taxonomy: {} labels", taxonomy.len());
        Ok(taxonomy)
    }

    fn insert_branch(&mut self, shape: &str, material: Option<&str>, colors: &[String]) {
        if colors.is_empty() {
            self.insert(shape, material, None);
        }
        for color in colors {
            self.insert(shape, material, Some(color.as_str()));
        }
    }

    fn insert(&mut self, shape: &str, material: Option<&str>, color: Option<&str>) {
        let name = self.label_for(shape, material, color);
        if self.index.contains_key(&name) {
            return;
        }
        let id = self.entries.len();
        self.index.insert(name.clone(), id);
        self.entries.push(CategoryEntry { id, name, supercategory: shape.to_string() });
    }

    /// Label for a concrete instance, masked by the ignore flags.
    pub fn label_for(&self, shape: &str, material: Option<&str>, color: Option<&str>) -> String {
        category_name(
            shape,
            material.filter(|_| !self.settings.ignore_material),
            color.filter(|_| !self.settings.ignore_color),
        )
    }

    pub fn id_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Category id of a placed instance; `None` if the label is not in the taxonomy.
    pub fn category_id(&self, shape: &str, material: Option<&str>, color: Option<&str>) -> Option<usize> {
        self.id_of(&self.label_for(shape, material, color))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn settings(&self) -> CategorySettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `"[color ][material ]shape"`
pub fn category_name(shape: &str, material: Option<&str>, color: Option<&str>) -> String {
    let mut name = String::new();
    for part in [color, material].into_iter().flatten() {
        name.push_str(part);
        name.push(' ');
    }
    name.push_str(shape);
    name
}
