use crate::core::{AccessError, Result, Value};
use crate::entity::EntityRef;
use crate::metadata::{EntityMetadata, MetadataProvider};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Level, event};

/// In-memory metadata provider over explicitly registered classes.
///
/// Registered metadata is immutable; `Arc` makes handing it to every
/// wrapper of the class cheap.
#[derive(Default)]
pub struct MetadataRegistry {
    classes: HashMap<String, Arc<EntityMetadata>>,
    unknown: RefCell<HashMap<String, Arc<EntityMetadata>>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class; returns the registry for chaining.
    pub fn with_class(mut self, metadata: EntityMetadata) -> Self {
        self.register(metadata);
        self
    }

    /// Registers or replaces the metadata for `metadata.class_name()`.
    pub fn register(&mut self, metadata: EntityMetadata) {
        let class = metadata.class_name().to_string();
        self.unknown.borrow_mut().remove(&class);
        self.classes.insert(class, Arc::new(metadata));
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn list_classes(&self) -> Vec<&str> {
        self.classes.keys().map(|s| s.as_str()).collect()
    }

    fn mapped_metadata(&self, entity: &EntityRef, field: &str) -> Result<Arc<EntityMetadata>> {
        let metadata = self.class_metadata(entity.class_name());
        if !metadata.has_field(field) {
            return Err(AccessError::field_not_exist(entity.class_name(), field));
        }
        Ok(metadata)
    }
}

impl MetadataProvider for MetadataRegistry {
    fn class_metadata(&self, class: &str) -> Arc<EntityMetadata> {
        if let Some(metadata) = self.classes.get(class) {
            return metadata.clone();
        }

        self.unknown
            .borrow_mut()
            .entry(class.to_string())
            .or_insert_with(|| {
                event!(Level::WARN, class, "metadata requested for unregistered class");
                Arc::new(EntityMetadata::empty(class))
            })
            .clone()
    }

    fn field_value(&self, entity: &EntityRef, field: &str) -> Result<Value> {
        self.mapped_metadata(entity, field)?;
        let guard = entity.borrow()?;
        guard
            .read_field(field)
            .ok_or_else(|| AccessError::field_not_exist(entity.class_name(), field))
    }

    fn set_field_value(&self, entity: &EntityRef, field: &str, value: Value) -> Result<()> {
        self.mapped_metadata(entity, field)?;
        let mut guard = entity.borrow_mut()?;
        guard
            .write_field(field, value)
            .unwrap_or_else(|| Err(AccessError::field_not_exist(entity.class_name(), field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Cardinality;

    fn order_metadata() -> EntityMetadata {
        EntityMetadata::builder("Order")
            .identifier("id")
            .field("total")
            .to_many("items", "Item")
            .build()
    }

    #[test]
    fn test_builder_registers_identifier_and_association_fields() {
        let metadata = order_metadata();
        assert_eq!(metadata.field_names(), ["id", "total", "items"]);
        assert_eq!(metadata.identifier_fields(), ["id"]);
        assert_eq!(
            metadata.association("items").map(|a| a.cardinality),
            Some(Cardinality::ToMany)
        );
        assert!(!metadata.has_association("total"));
    }

    #[test]
    fn test_unknown_association_descriptor_fails() {
        let registry = MetadataRegistry::new().with_class(order_metadata());
        let err = registry.association_descriptor("Order", "customer").unwrap_err();
        assert_eq!(err.to_string(), "Class Order has no association customer");
    }

    #[test]
    fn test_unregistered_class_yields_stable_empty_metadata() {
        let registry = MetadataRegistry::new();
        let first = registry.class_metadata("Ghost");
        let second = registry.class_metadata("Ghost");
        assert!(first.field_names().is_empty());
        assert!(Arc::ptr_eq(&first, &second));
    }
}
