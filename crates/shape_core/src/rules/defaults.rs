//! Rule defaults schema
//!
//! Per rule category, an ordered mapping `attribute -> default spec`. The order is the
//! declaration order of the JSON file and drives validation order, so computed defaults
//! can read attributes declared before them.
//!
//! Spec grammar (string values only, anything else is a literal default):
//! - `"REQUIRED"` - validation fails if the attribute is absent
//! - `"=<fn>"` - computed default, see [`ComputedDefault`]
//! - any of the above (or a literal string) suffixed with `";UNIQUE"`

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::error::{ConfigError, RuleError};

/// Sidecar file name, looked up relative to the working directory.
pub const DEFAULTS_FILE_NAME: &str = "rules_defaults.json";

/// Built-in schema, used when no sidecar file is present.
pub const BUILTIN_DEFAULTS_JSON: &str = include_str!("../../data/rules_defaults.json");

static BUILTIN_DEFAULTS: OnceLock<RuleDefaults> = OnceLock::new();

const REQUIRED_MARKER: &str = "REQUIRED";
const UNIQUE_SUFFIX: &str = ";UNIQUE";

/// Registry of pure default generators, replacing expression strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedDefault {
    /// `=index` - position of the element inside its category
    Index,
    /// `=copy:<attr>` - value of another attribute
    Copy(String),
    /// `=stem:<attr>` - file stem of a path-valued attribute
    Stem(String),
    /// `=<template>` - `{attr}` placeholders replaced by attribute values, e.g. `={name}.glb`
    Format(String),
}

impl ComputedDefault {
    pub fn parse(expr: &str) -> Result<Self, RuleError> {
        let expr = expr.trim();
        if expr == "index" {
            return Ok(ComputedDefault::Index);
        }
        if let Some(attr) = expr.strip_prefix("copy:") {
            return Ok(ComputedDefault::Copy(attr.to_string()));
        }
        if let Some(attr) = expr.strip_prefix("stem:") {
            return Ok(ComputedDefault::Stem(attr.to_string()));
        }
        if expr.contains('{') {
            return Ok(ComputedDefault::Format(expr.to_string()));
        }
        Err(RuleError::invalid("computed default", format!("={expr}")))
    }

    /// Evaluates against a partially filled element.
    ///
    /// `processed` lists the attributes already handled for this element; reading any
    /// other attribute is rejected.
    pub fn evaluate(
        &self,
        element: &Map<String, Value>,
        index: usize,
        processed: &[&str],
        rule: &str,
    ) -> Result<Value, RuleError> {
        match self {
            ComputedDefault::Index => Ok(Value::from(index)),
            ComputedDefault::Copy(attr) => read_processed(element, attr, processed, rule).cloned(),
            ComputedDefault::Stem(attr) => {
                let value = read_processed(element, attr, processed, rule)?;
                let path = value.as_str().ok_or_else(|| RuleError::invalid(attr.as_str(), value))?;
                let stem = Path::new(path)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .ok_or_else(|| RuleError::invalid(attr.as_str(), path))?;
                Ok(Value::String(stem.to_string()))
            }
            ComputedDefault::Format(template) => {
                let mut out = String::with_capacity(template.len());
                let mut rest = template.as_str();
                while let Some(start) = rest.find('{') {
                    out.push_str(&rest[..start]);
                    let end = rest[start..]
                        .find('}')
                        .ok_or_else(|| RuleError::invalid("computed default", template))?;
                    let attr = &rest[start + 1..start + end];
                    match read_processed(element, attr, processed, rule)? {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                    rest = &rest[start + end + 1..];
                }
                out.push_str(rest);
                Ok(Value::String(out))
            }
        }
    }
}

fn read_processed<'a>(
    element: &'a Map<String, Value>,
    attr: &str,
    processed: &[&str],
    rule: &str,
) -> Result<&'a Value, RuleError> {
    if !processed.contains(&attr) {
        return Err(RuleError::invalid(
            format!("{rule}.{attr}"),
            "computed default reads an attribute that is not processed yet",
        ));
    }
    element
        .get(attr)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RuleError::RequiredAttributeNotFound {
            attribute: attr.to_string(),
            rule: rule.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultKind {
    Required,
    Computed(ComputedDefault),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultSpec {
    pub kind: DefaultKind,
    pub unique: bool,
}

impl DefaultSpec {
    pub fn parse(raw: &Value) -> Result<Self, RuleError> {
        let Value::String(text) = raw else {
            return Ok(DefaultSpec { kind: DefaultKind::Literal(raw.clone()), unique: false });
        };

        let (body, unique) = match text.strip_suffix(UNIQUE_SUFFIX) {
            Some(body) => (body, true),
            None => (text.as_str(), false),
        };

        let kind = if body == REQUIRED_MARKER {
            DefaultKind::Required
        } else if let Some(expr) = body.strip_prefix('=') {
            DefaultKind::Computed(ComputedDefault::parse(expr)?)
        } else {
            DefaultKind::Literal(Value::String(body.to_string()))
        };

        Ok(DefaultSpec { kind, unique })
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, DefaultKind::Required)
    }
}

/// Ordered schema for one rule category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDefaults {
    attributes: Vec<(String, DefaultSpec)>,
}

impl CategoryDefaults {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DefaultSpec)> {
        self.attributes.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn get(&self, attribute: &str) -> Option<&DefaultSpec> {
        self.attributes.iter().find(|(name, _)| name == attribute).map(|(_, spec)| spec)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// The whole defaults schema, keyed by category (`shape`, `material`, `color`, and the
/// nested sub-rule names such as `scaling`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleDefaults {
    categories: HashMap<String, CategoryDefaults>,
}

impl RuleDefaults {
    pub fn from_value(value: &Value) -> Result<Self, RuleError> {
        let root = value
            .as_object()
            .ok_or_else(|| RuleError::invalid("rules defaults", "expected a JSON object"))?;

        let mut categories = HashMap::with_capacity(root.len());
        for (category, schema) in root {
            let schema = schema.as_object().ok_or_else(|| {
                RuleError::invalid(format!("rules defaults.{category}"), "expected a JSON object")
            })?;
            let attributes = schema
                .iter()
                .map(|(attr, raw)| Ok((attr.clone(), DefaultSpec::parse(raw)?)))
                .collect::<Result<Vec<_>, RuleError>>()?;
            categories.insert(category.clone(), CategoryDefaults { attributes });
        }

        Ok(Self { categories })
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
            .map_err(|e| ConfigError::InvalidValue { key: DEFAULTS_FILE_NAME.to_string(), reason: e.to_string() })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }

    /// Schema compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded JSON is malformed (cannot happen in a normal build).
    pub fn builtin() -> &'static RuleDefaults {
        BUILTIN_DEFAULTS.get_or_init(|| {
            RuleDefaults::from_json_str(BUILTIN_DEFAULTS_JSON)
                .expect("embedded rules_defaults.json must be valid")
        })
    }

    /// Loads `rules_defaults.json` from `dir` when present, otherwise the built-in schema.
    pub fn sidecar_or_builtin(dir: &Path) -> Result<RuleDefaults, ConfigError> {
        let path = dir.join(DEFAULTS_FILE_NAME);
        if path.is_file() {
            tracing::info!("Using rules defaults from {}", path.display());
            Self::from_path(&path)
        } else {
            Ok(Self::builtin().clone())
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryDefaults> {
        self.categories.get(name)
    }
}
