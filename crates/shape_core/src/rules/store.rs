//! Validated, read-only view over a rules document

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::defaults::RuleDefaults;
use super::model::{
    check_shape_enumerations, CategorySettings, ColorRule, MaterialRule, ShapeKind, ShapeRule,
};
use super::validator::validate_document;
use crate::error::RuleError;

/// Lookup key: numeric id or name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Id(i64),
    Name(String),
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Id(id)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "id {id}"),
            Identifier::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

pub trait RuleEntry {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

impl RuleEntry for ShapeRule {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl RuleEntry for MaterialRule {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl RuleEntry for ColorRule {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// One category of rules in declaration order.
///
/// Iteration borrows the section, so independent iterations never interfere.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSection<T> {
    entries: Vec<T>,
}

impl<T> Default for RuleSection<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: RuleEntry> RuleSection<T> {
    pub fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    /// Direct lookup; `None` when nothing matches.
    pub fn get(&self, identifier: &Identifier) -> Option<&T> {
        match identifier {
            Identifier::Id(id) => self.by_id(*id),
            Identifier::Name(name) => self.by_name(name),
        }
    }

    pub fn by_id(&self, id: i64) -> Option<&T> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Lookup of several identifiers; unmatched ones are skipped.
    pub fn lookup_many<'a>(&'a self, identifiers: &'a [Identifier]) -> impl Iterator<Item = &'a T> + 'a {
        identifiers.iter().filter_map(move |i| self.get(i))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }
}

impl<'a, T> IntoIterator for &'a RuleSection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Validated rules with allow-list queries.
#[derive(Debug, Clone)]
pub struct RuleStore {
    pub objects: RuleSection<ShapeRule>,
    pub decoys: RuleSection<ShapeRule>,
    pub materials: RuleSection<MaterialRule>,
    pub colors: RuleSection<ColorRule>,
    pub categories: CategorySettings,
    /// Validated document, kept for annotations and checkpoints.
    raw: Value,
}

impl RuleStore {
    /// Validates `document` (macros, defaults, uniqueness) and builds the typed view.
    pub fn from_document(mut document: Value, defaults: &RuleDefaults) -> Result<Self, RuleError> {
        validate_document(&mut document, defaults)?;

        let objects = typed_section::<ShapeRule>(&document, ShapeKind::Object.section())?;
        let decoys = typed_section::<ShapeRule>(&document, ShapeKind::Decoy.section())?;
        let materials = typed_section::<MaterialRule>(&document, "materials")?;
        let colors = typed_section::<ColorRule>(&document, "colors")?;

        let categories = match document.get("categories") {
            None | Some(Value::Null) => CategorySettings::default(),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| RuleError::invalid("categories", e))?,
        };

        tracing::debug!(
            "Rules loaded: {} objects, {} decoys, {} materials, {} colors",
            objects.len(),
            decoys.len(),
            materials.len(),
            colors.len()
        );

        Ok(Self { objects, decoys, materials, colors, categories, raw: document })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn shapes(&self, kind: ShapeKind) -> &RuleSection<ShapeRule> {
        match kind {
            ShapeKind::Object => &self.objects,
            ShapeKind::Decoy => &self.decoys,
        }
    }

    /// Objects first, then decoys.
    pub fn get_shape(&self, identifier: &Identifier) -> Result<&ShapeRule, RuleError> {
        self.objects
            .get(identifier)
            .or_else(|| self.decoys.get(identifier))
            .ok_or_else(|| RuleError::ShapeNotFound(identifier.to_string()))
    }

    pub fn get_shape_allowed_materials(&self, shape: &Identifier) -> Result<Vec<String>, RuleError> {
        Ok(self.allowed_materials_for(self.get_shape(shape)?))
    }

    pub fn get_shape_allowed_colors(&self, shape: &Identifier) -> Result<Vec<String>, RuleError> {
        let shape = self.get_shape(shape)?;
        Ok(shape.allowed_colors.resolve(self.colors.names()))
    }

    pub fn get_material_allowed_colors(&self, material: &Identifier) -> Result<Vec<String>, RuleError> {
        let material = self
            .materials
            .get(material)
            .ok_or_else(|| RuleError::UndefinedMaterial(identifier_label(material)))?;
        Ok(material.allowed_colors.resolve(self.colors.names()))
    }

    /// Shape colors intersected with the material colors, in shape order.
    pub fn get_composite_allowed_colors(
        &self,
        shape: &Identifier,
        material: Option<&Identifier>,
    ) -> Result<Vec<String>, RuleError> {
        let shape = self.get_shape(shape)?;
        let material = match material {
            Some(m) => Some(
                self.materials
                    .get(m)
                    .ok_or_else(|| RuleError::UndefinedMaterial(identifier_label(m)))?,
            ),
            None => None,
        };
        Ok(self.composite_colors_for(shape, material))
    }

    pub fn allowed_materials_for(&self, shape: &ShapeRule) -> Vec<String> {
        shape.allowed_materials.resolve(self.materials.names())
    }

    pub fn composite_colors_for(&self, shape: &ShapeRule, material: Option<&MaterialRule>) -> Vec<String> {
        let shape_colors = shape.allowed_colors.resolve(self.colors.names());
        match material {
            None => shape_colors,
            Some(material) => {
                let material_colors = material.allowed_colors.resolve(self.colors.names());
                shape_colors.into_iter().filter(|c| material_colors.contains(c)).collect()
            }
        }
    }

    pub fn material(&self, name: &str) -> Result<&MaterialRule, RuleError> {
        self.materials.by_name(name).ok_or_else(|| RuleError::UndefinedMaterial(name.to_string()))
    }

    pub fn color(&self, name: &str) -> Result<&ColorRule, RuleError> {
        self.colors.by_name(name).ok_or_else(|| RuleError::UndefinedColor(name.to_string()))
    }
}

fn identifier_label(identifier: &Identifier) -> String {
    match identifier {
        Identifier::Id(id) => id.to_string(),
        Identifier::Name(name) => name.clone(),
    }
}

fn typed_section<T: DeserializeOwned + RuleEntry>(
    document: &Value,
    section: &str,
) -> Result<RuleSection<T>, RuleError> {
    let raw = document
        .get(section)
        .and_then(Value::as_array)
        .ok_or_else(|| RuleError::MissingSection(section.to_string()))?;

    let is_shape = section == ShapeKind::Object.section() || section == ShapeKind::Decoy.section();
    let mut entries = Vec::with_capacity(raw.len());
    for (index, element) in raw.iter().enumerate() {
        if is_shape {
            check_shape_enumerations(element, section)?;
        }
        let entry = serde_json::from_value::<T>(element.clone()).map_err(|e| RuleError::Malformed {
            rule: section.to_string(),
            index,
            reason: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(RuleSection::new(entries))
}
