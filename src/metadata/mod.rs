//! Per-class schema descriptors and the provider contract the accessor
//! layer reads them through.

mod registry;

pub use registry::MetadataRegistry;

use crate::core::{AccessError, Result, Value};
use crate::entity::EntityRef;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Which side of a bidirectional association this descriptor sits on,
/// naming the mirroring field on the target class.
///
/// One enum rather than two options: a descriptor can never carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InverseSide {
    /// This side is the inverse; the target owns the relation through the named field.
    MappedBy(String),
    /// This side owns the relation; the target mirrors it through the named field.
    InversedBy(String),
}

impl InverseSide {
    pub fn field(&self) -> &str {
        match self {
            Self::MappedBy(field) | Self::InversedBy(field) => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
    pub target_class: String,
    pub inverse: Option<InverseSide>,
}

impl AssociationDescriptor {
    pub fn new(
        name: impl Into<String>,
        cardinality: Cardinality,
        target_class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cardinality,
            target_class: target_class.into(),
            inverse: None,
        }
    }

    pub fn to_one(name: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self::new(name, Cardinality::ToOne, target_class)
    }

    pub fn to_many(name: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self::new(name, Cardinality::ToMany, target_class)
    }

    pub fn mapped_by(mut self, field: impl Into<String>) -> Self {
        self.inverse = Some(InverseSide::MappedBy(field.into()));
        self
    }

    pub fn inversed_by(mut self, field: impl Into<String>) -> Self {
        self.inverse = Some(InverseSide::InversedBy(field.into()));
        self
    }

    pub fn is_to_one(&self) -> bool {
        self.cardinality == Cardinality::ToOne
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }

    /// Field on the target class mirroring this association, if bidirectional.
    pub fn inverse_field(&self) -> Option<&str> {
        self.inverse.as_ref().map(InverseSide::field)
    }
}

/// Immutable schema of one entity class.
///
/// `fields` holds every mapped property, association fields included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    class: String,
    fields: Vec<String>,
    identifier: Vec<String>,
    associations: Vec<AssociationDescriptor>,
}

impl EntityMetadata {
    pub fn builder(class: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            metadata: EntityMetadata {
                class: class.into(),
                fields: Vec::new(),
                identifier: Vec::new(),
                associations: Vec::new(),
            },
        }
    }

    /// Metadata with no fields, used for classes nobody registered.
    pub fn empty(class: impl Into<String>) -> Self {
        Self::builder(class).build()
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn identifier_fields(&self) -> &[String] {
        &self.identifier
    }

    pub fn associations(&self) -> &[AssociationDescriptor] {
        &self.associations
    }

    pub fn has_association(&self, name: &str) -> bool {
        self.association(name).is_some()
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDescriptor> {
        self.associations.iter().find(|a| a.name == name)
    }
}

pub struct EntityMetadataBuilder {
    metadata: EntityMetadata,
}

impl EntityMetadataBuilder {
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.push_field(name.into());
        self
    }

    /// Declares an identifier field (also registered as a plain field).
    pub fn identifier(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.push_field(name.clone());
        if !self.metadata.identifier.contains(&name) {
            self.metadata.identifier.push(name);
        }
        self
    }

    pub fn association(mut self, descriptor: AssociationDescriptor) -> Self {
        self.push_field(descriptor.name.clone());
        self.metadata
            .associations
            .retain(|existing| existing.name != descriptor.name);
        self.metadata.associations.push(descriptor);
        self
    }

    pub fn to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.association(AssociationDescriptor::to_one(name, target))
    }

    pub fn to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.association(AssociationDescriptor::to_many(name, target))
    }

    pub fn build(self) -> EntityMetadata {
        self.metadata
    }

    fn push_field(&mut self, name: String) {
        if !self.metadata.fields.contains(&name) {
            self.metadata.fields.push(name);
        }
    }
}

/// Schema source consulted by the accessor layer.
///
/// Field access goes through the provider so the provider decides what a
/// mapped field is; entities only supply the storage.
pub trait MetadataProvider {
    fn class_metadata(&self, class: &str) -> Arc<EntityMetadata>;

    fn field_value(&self, entity: &EntityRef, field: &str) -> Result<Value>;

    fn set_field_value(&self, entity: &EntityRef, field: &str, value: Value) -> Result<()>;

    /// Fails with a not-declared association error for unknown names.
    fn association_descriptor(&self, class: &str, name: &str) -> Result<AssociationDescriptor> {
        self.class_metadata(class)
            .association(name)
            .cloned()
            .ok_or_else(|| AccessError::association_not_exist(class, name))
    }
}
