//! Rule validation and default filling
//!
//! Walks the raw JSON rule entries of one category in schema order, resolving macros,
//! enforcing required attributes, filling static and computed defaults, recursing into
//! nested sub-rules and checking `UNIQUE` attributes across siblings.

use serde_json::{Map, Value};

use super::defaults::{CategoryDefaults, DefaultKind, RuleDefaults};
use super::macros::MacroTable;
use crate::error::RuleError;

/// Rules document sections and the defaults schema each one is validated against.
pub const SHAPE_SECTIONS: [&str; 2] = ["objects", "decoys"];
pub const SECTION_SCHEMAS: [(&str, &str); 4] =
    [("objects", "shape"), ("decoys", "shape"), ("materials", "material"), ("colors", "color")];

pub struct RuleValidator<'a> {
    defaults: &'a RuleDefaults,
    macros: &'a MacroTable,
}

impl<'a> RuleValidator<'a> {
    pub fn new(defaults: &'a RuleDefaults, macros: &'a MacroTable) -> Self {
        Self { defaults, macros }
    }

    /// Validates `elements` in place against the `schema` category of the defaults.
    ///
    /// `rule` is the name used in error messages (e.g. `objects`).
    pub fn validate(&self, elements: &mut [Value], schema: &str, rule: &str) -> Result<(), RuleError> {
        let defaults = self
            .defaults
            .category(schema)
            .ok_or_else(|| RuleError::invalid("rules defaults", format!("no schema for '{schema}'")))?;

        let mut accepted: Vec<Vec<(&str, Value)>> = Vec::with_capacity(elements.len());

        for (index, element) in elements.iter_mut().enumerate() {
            let object = element.as_object_mut().ok_or_else(|| RuleError::Malformed {
                rule: rule.to_string(),
                index,
                reason: "expected a JSON object".to_string(),
            })?;

            let uniques = self.validate_element(object, index, defaults, rule)?;

            // Each unique attribute is checked on its own, not as a compound key
            for (attribute, value) in &uniques {
                let clash = accepted
                    .iter()
                    .any(|prev| prev.iter().any(|(a, v)| a == attribute && v == value));
                if clash {
                    return Err(RuleError::DuplicateValue {
                        attribute: attribute.to_string(),
                        rule: rule.to_string(),
                    });
                }
            }
            accepted.push(uniques);
        }

        Ok(())
    }

    fn validate_element<'d>(
        &self,
        object: &mut Map<String, Value>,
        index: usize,
        defaults: &'d CategoryDefaults,
        rule: &str,
    ) -> Result<Vec<(&'d str, Value)>, RuleError> {
        let mut processed: Vec<&str> = Vec::with_capacity(defaults.len());
        let mut uniques = Vec::new();

        for (attribute, spec) in defaults.iter() {
            if let Some(raw) = object.get(attribute) {
                if let Some(resolved) = self.macros.resolve(raw)? {
                    object.insert(attribute.to_string(), resolved);
                }
            }

            let present = object.get(attribute).is_some_and(|v| !v.is_null());
            if !present {
                let value = match &spec.kind {
                    DefaultKind::Required => {
                        return Err(RuleError::RequiredAttributeNotFound {
                            attribute: attribute.to_string(),
                            rule: rule.to_string(),
                        })
                    }
                    DefaultKind::Computed(computed) => computed.evaluate(object, index, &processed, rule)?,
                    DefaultKind::Literal(literal) => literal.clone(),
                };
                object.insert(attribute.to_string(), value);
            } else if self.defaults.category(attribute).is_some() {
                if let Some(value) = object.get_mut(attribute) {
                    if value.is_object() {
                        let nested_rule = format!("{rule}.{attribute}");
                        self.validate(std::slice::from_mut(value), attribute, &nested_rule)?;
                    }
                }
            }

            if spec.unique {
                uniques.push((attribute, object.get(attribute).cloned().unwrap_or(Value::Null)));
            }
            processed.push(attribute);
        }

        Ok(uniques)
    }
}

/// Validates every section of a rules document in place.
///
/// `decoys` is optional and is inserted as an empty list when absent.
pub fn validate_document(document: &mut Value, defaults: &RuleDefaults) -> Result<(), RuleError> {
    let macros = MacroTable::from_document(document)?;
    let root = document
        .as_object_mut()
        .ok_or_else(|| RuleError::invalid("rules", "expected a JSON object"))?;

    if !root.contains_key("decoys") {
        root.insert("decoys".to_string(), Value::Array(Vec::new()));
    }

    let validator = RuleValidator::new(defaults, &macros);
    for (section, schema) in SECTION_SCHEMAS {
        let elements = root
            .get_mut(section)
            .ok_or_else(|| RuleError::MissingSection(section.to_string()))?
            .as_array_mut()
            .ok_or_else(|| RuleError::invalid(section, "expected a list of rules"))?;
        validator.validate(elements, schema, section)?;
    }

    Ok(())
}
