use crate::core::{AccessError, Result};
use crate::overrides::AccessorKind;
use serde::Deserialize;
use std::path::Path;

/// Accessor layer configuration
///
/// Controls conventional method naming and whether default-path collection
/// mutation mirrors the change onto the inverse side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessorConfig {
    /// Prefix of the conventional getter (`get_` + property)
    pub get_prefix: String,

    /// Prefix of the conventional setter
    pub set_prefix: String,

    /// Prefix of the conventional collection adder
    pub add_prefix: String,

    /// Prefix of the conventional collection remover
    pub remove_prefix: String,

    /// Update the associated entity's back-reference on default-path add/remove
    pub sync_inverse_side: bool,
}

impl AccessorConfig {
    pub fn new() -> Self {
        Self {
            get_prefix: "get_".to_string(),
            set_prefix: "set_".to_string(),
            add_prefix: "add_".to_string(),
            remove_prefix: "remove_".to_string(),
            sync_inverse_side: true,
        }
    }

    /// Set all four prefixes at once, e.g. `("get", "set", "add", "remove")`
    /// for camel-case style names without separator.
    pub fn prefixes(mut self, get: &str, set: &str, add: &str, remove: &str) -> Self {
        self.get_prefix = get.to_string();
        self.set_prefix = set.to_string();
        self.add_prefix = add.to_string();
        self.remove_prefix = remove.to_string();
        self
    }

    pub fn sync_inverse_side(mut self, enabled: bool) -> Self {
        self.sync_inverse_side = enabled;
        self
    }

    /// Conventional method name for `property`; the property is appended verbatim.
    pub fn conventional_method(&self, kind: AccessorKind, property: &str) -> String {
        let prefix = match kind {
            AccessorKind::Get => &self.get_prefix,
            AccessorKind::Set => &self.set_prefix,
            AccessorKind::Add => &self.add_prefix,
            AccessorKind::Remove => &self.remove_prefix,
        };
        format!("{}{}", prefix, property)
    }

    /// Parse from a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Empty prefixes would make every property name a method name.
    pub fn validate(&self) -> Result<()> {
        let prefixes = [
            ("get_prefix", &self.get_prefix),
            ("set_prefix", &self.set_prefix),
            ("add_prefix", &self.add_prefix),
            ("remove_prefix", &self.remove_prefix),
        ];
        for (name, value) in prefixes {
            if value.is_empty() {
                return Err(AccessError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self::new()
    }
}
