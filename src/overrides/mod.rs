//! Accessor overrides: custom method names configured per (class, property).

mod cache;
mod sources;

pub use cache::AccessorOverrideCache;
pub use sources::{AttributeSource, ChainedSource, OverrideTable};

use crate::entity::Entity;
use serde::{Deserialize, Serialize};

/// The four manipulations an override can redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
    Add,
    Remove,
}

impl AccessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

/// Custom method names for one property. A `None` slot falls back to the
/// conventional method, then to raw field access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessorOverride {
    pub add: Option<String>,
    pub remove: Option<String>,
    pub set: Option<String>,
    pub get: Option<String>,
}

impl AccessorOverride {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(mut self, method: impl Into<String>) -> Self {
        self.get = Some(method.into());
        self
    }

    pub fn set(mut self, method: impl Into<String>) -> Self {
        self.set = Some(method.into());
        self
    }

    pub fn add(mut self, method: impl Into<String>) -> Self {
        self.add = Some(method.into());
        self
    }

    pub fn remove(mut self, method: impl Into<String>) -> Self {
        self.remove = Some(method.into());
        self
    }

    pub fn method(&self, kind: AccessorKind) -> Option<&str> {
        match kind {
            AccessorKind::Get => self.get.as_deref(),
            AccessorKind::Set => self.set.as_deref(),
            AccessorKind::Add => self.add.as_deref(),
            AccessorKind::Remove => self.remove.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.remove.is_none() && self.set.is_none() && self.get.is_none()
    }
}

/// Declarative source of accessor overrides (attributes, side tables, ...).
///
/// Only consulted for properties the entity class actually declares.
pub trait AnnotationSource {
    fn override_for(&self, entity: &dyn Entity, property: &str) -> Option<AccessorOverride>;
}
