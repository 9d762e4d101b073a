use crate::core::Result;
use crate::entity::Entity;
use crate::overrides::{AccessorOverride, AnnotationSource};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Reads overrides declared with `#[accessor(...)]` on entity fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeSource;

impl AnnotationSource for AttributeSource {
    fn override_for(&self, entity: &dyn Entity, property: &str) -> Option<AccessorOverride> {
        entity.declared_override(property)
    }
}

/// Explicit side table: class name -> property -> override.
///
/// JSON form: `{ "Order": { "items": { "add": "attach_item" } } }`.
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: RefCell<HashMap<String, HashMap<String, AccessorOverride>>>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, HashMap<String, AccessorOverride>> =
            serde_json::from_str(json)?;
        Ok(Self {
            entries: RefCell::new(entries),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with(self, class: &str, property: &str, accessor: AccessorOverride) -> Self {
        self.insert(class, property, accessor);
        self
    }

    /// Adds or replaces an entry. Caches that already resolved the
    /// (class, property) pair keep their answer.
    pub fn insert(&self, class: &str, property: &str, accessor: AccessorOverride) {
        self.entries
            .borrow_mut()
            .entry(class.to_string())
            .or_default()
            .insert(property.to_string(), accessor);
    }

    pub fn remove(&self, class: &str, property: &str) -> Option<AccessorOverride> {
        self.entries.borrow_mut().get_mut(class)?.remove(property)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnnotationSource for OverrideTable {
    fn override_for(&self, entity: &dyn Entity, property: &str) -> Option<AccessorOverride> {
        self.entries
            .borrow()
            .get(entity.class_name())?
            .get(property)
            .cloned()
    }
}

/// Consults several sources in order; the first declaration wins.
#[derive(Default)]
pub struct ChainedSource {
    sources: Vec<Rc<dyn AnnotationSource>>,
}

impl ChainedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, source: Rc<dyn AnnotationSource>) -> Self {
        self.sources.push(source);
        self
    }
}

impl AnnotationSource for ChainedSource {
    fn override_for(&self, entity: &dyn Entity, property: &str) -> Option<AccessorOverride> {
        self.sources
            .iter()
            .find_map(|source| source.override_for(entity, property))
    }
}
