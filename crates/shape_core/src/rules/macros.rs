//! `$name` macro substitution for rule attribute values.

use serde_json::{Map, Value};

use crate::error::RuleError;

pub const MACRO_PREFIX: char = '$';

/// Flat table of named literals or substructures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroTable {
    entries: Map<String, Value>,
}

impl MacroTable {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Reads the optional `macros` object of a rules document.
    pub fn from_document(document: &Value) -> Result<Self, RuleError> {
        match document.get("macros") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(entries)) => Ok(Self::new(entries.clone())),
            Some(other) => Err(RuleError::invalid("macros", other)),
        }
    }

    pub fn is_macro_reference(value: &Value) -> bool {
        matches!(value, Value::String(s) if s.starts_with(MACRO_PREFIX))
    }

    /// Resolves `value` when it is a `$name` reference.
    ///
    /// Returns `Ok(None)` for values that are not references. A macro bound to `null`
    /// counts as undefined.
    pub fn resolve(&self, value: &Value) -> Result<Option<Value>, RuleError> {
        let Value::String(text) = value else {
            return Ok(None);
        };
        let Some(name) = text.strip_prefix(MACRO_PREFIX) else {
            return Ok(None);
        };

        match self.entries.get(name) {
            Some(found) if !found.is_null() => Ok(Some(found.clone())),
            _ => Err(RuleError::UndefinedMacro(name.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> MacroTable {
        MacroTable::from_document(&json!({
            "macros": {
                "foo": 42,
                "upright": {"min_bounds": [0, 0, 0], "max_bounds": [0, 0, 360], "snap": [0, 0, 15]},
                "nothing": null
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolves_literal_and_structure() {
        let macros = table();
        assert_eq!(macros.resolve(&json!("$foo")).unwrap(), Some(json!(42)));
        let upright = macros.resolve(&json!("$upright")).unwrap().unwrap();
        assert_eq!(upright["snap"], json!([0, 0, 15]));
    }

    #[test]
    fn test_plain_values_pass_through() {
        let macros = table();
        assert_eq!(macros.resolve(&json!("all")).unwrap(), None);
        assert_eq!(macros.resolve(&json!(1.5)).unwrap(), None);
    }

    #[test]
    fn test_undefined_and_null_macros() {
        let macros = table();
        assert_eq!(macros.resolve(&json!("$bar")), Err(RuleError::UndefinedMacro("bar".to_string())));
        assert_eq!(
            macros.resolve(&json!("$nothing")),
            Err(RuleError::UndefinedMacro("nothing".to_string()))
        );
    }

    #[test]
    fn test_missing_macros_section() {
        let macros = MacroTable::from_document(&json!({"objects": []})).unwrap();
        assert!(macros.is_empty());
        assert!(MacroTable::from_document(&json!({"macros": [1]})).is_err());
    }
}
