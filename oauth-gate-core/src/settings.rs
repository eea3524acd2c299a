//! Key/value settings store
//!
//! Provider options are read through the [`Settings`] capability on every
//! flow invocation. Administrators may change values at any time, so callers
//! must not cache anything derived from them.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

/// Read-only view over an external settings store
pub trait Settings: Send + Sync {
    /// Raw string value of `key`, or `None` when unset
    fn get_string(&self, key: &str) -> Option<String>;

    /// Boolean value of `key`; anything but a case-insensitive `true` is false
    fn get_bool(&self, key: &str) -> bool {
        self.get_string(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// Value type of a property, used by hosts rendering an admin form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "options")]
pub enum PropertyType {
    Boolean,
    String,
    Password,
    SingleSelect(Vec<String>),
}

/// Declaration of one configurable option and its default
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDefinition {
    pub key: String,
    pub name: &'static str,
    pub description: String,
    pub property_type: PropertyType,
    pub default_value: Option<String>,
}

/// In-process mutable settings store
///
/// Unset keys fall back to the default of their [`PropertyDefinition`], if any.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
    defaults: HashMap<String, String>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose unset keys resolve to the definitions' defaults
    #[must_use]
    pub fn with_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = PropertyDefinition>,
    {
        let defaults = definitions
            .into_iter()
            .filter_map(|def| def.default_value.map(|value| (def.key, value)))
            .collect();

        Self {
            values: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn set_bool(&self, key: impl Into<String>, value: bool) {
        self.set(key, value.to_string());
    }

    /// Unset `key`; reads fall back to its default again
    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }

    /// Bulk-load values, e.g. from the application config file
    pub fn extend<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = self.values.write();
        for (key, value) in entries {
            values.insert(key.into(), value.into());
        }
    }
}

impl Settings for MemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .get(key)
            .cloned()
            .or_else(|| self.defaults.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(key: &str, default_value: Option<&str>) -> PropertyDefinition {
        PropertyDefinition {
            key: key.to_string(),
            name: "test",
            description: String::new(),
            property_type: PropertyType::String,
            default_value: default_value.map(str::to_string),
        }
    }

    #[test]
    fn test_default_applies_until_set() {
        let settings = MemorySettings::with_definitions([definition("a.b", Some("x"))]);
        assert_eq!(settings.get_string("a.b").as_deref(), Some("x"));

        settings.set("a.b", "y");
        assert_eq!(settings.get_string("a.b").as_deref(), Some("y"));

        settings.remove("a.b");
        assert_eq!(settings.get_string("a.b").as_deref(), Some("x"));
    }

    #[test]
    fn test_get_bool() {
        let settings = MemorySettings::new();
        assert!(!settings.get_bool("flag"));

        settings.set_bool("flag", true);
        assert!(settings.get_bool("flag"));

        settings.set("flag", " TRUE ");
        assert!(settings.get_bool("flag"));

        settings.set("flag", "yes");
        assert!(!settings.get_bool("flag"));
    }

    #[test]
    fn test_extend() {
        let settings = MemorySettings::new();
        settings.extend([("k1", "v1"), ("k2", "v2")]);
        assert_eq!(settings.get_string("k1").as_deref(), Some("v1"));
        assert_eq!(settings.get_string("k2").as_deref(), Some("v2"));
        assert!(settings.get_string("k3").is_none());
    }
}
