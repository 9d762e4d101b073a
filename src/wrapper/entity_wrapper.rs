use super::resolution::{AccessRequest, RawField, ResolutionChain};
use super::{Services, WrapperRegistry};
use crate::core::{AccessError, Identifier, Result, Value};
use crate::entity::{CollectionRef, EntityRef};
use crate::metadata::{AssociationDescriptor, EntityMetadata};
use crate::overrides::AccessorKind;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq)]
enum IdentifierState {
    Unresolved,
    Resolved(Identifier),
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionOp {
    Add,
    Remove,
}

impl CollectionOp {
    fn kind(self) -> AccessorKind {
        match self {
            Self::Add => AccessorKind::Add,
            Self::Remove => AccessorKind::Remove,
        }
    }
}

/// Per-entity accessor: override-aware get/set, collection mutation with
/// inverse-side sync, identifier resolution and lazy materialization.
///
/// Obtained from [`super::WrapperCache::wrap`]; the cached identifier and
/// initialization flags assume calls on one wrapper come from one logical
/// sequence.
pub struct EntityWrapper {
    entity: EntityRef,
    metadata: Arc<EntityMetadata>,
    services: Rc<Services>,
    registry: Weak<WrapperRegistry>,
    initialized: Cell<bool>,
    identifier: RefCell<IdentifierState>,
}

impl EntityWrapper {
    pub(crate) fn new(
        entity: EntityRef,
        services: Rc<Services>,
        registry: Weak<WrapperRegistry>,
    ) -> Self {
        let metadata = services.metadata.class_metadata(entity.class_name());
        Self {
            entity,
            metadata,
            services,
            registry,
            initialized: Cell::new(false),
            identifier: RefCell::new(IdentifierState::Unresolved),
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    // ========================================
    // Identifier
    // ========================================

    pub fn has_valid_identifier(&self) -> Result<bool> {
        Ok(self.identifier()?.is_some())
    }

    /// Complete identifier, or `None` if any component is still null.
    pub fn identifier(&self) -> Result<Option<Identifier>> {
        self.initialize_identifier()?;
        match &*self.identifier.borrow() {
            IdentifierState::Resolved(identifier) => Ok(Some(identifier.clone())),
            _ => Ok(None),
        }
    }

    /// First identifier component in declared order.
    pub fn single_identifier(&self) -> Result<Option<Value>> {
        Ok(self
            .identifier()?
            .and_then(|identifier| identifier.first().cloned()))
    }

    fn initialize_identifier(&self) -> Result<()> {
        if *self.identifier.borrow() != IdentifierState::Unresolved {
            return Ok(());
        }

        if let Some(known) = self.known_identifier() {
            *self.identifier.borrow_mut() = IdentifierState::Resolved(known);
            return Ok(());
        }

        self.initialize_entity()?;
        if self.metadata.identifier_fields().is_empty() {
            *self.identifier.borrow_mut() = IdentifierState::Absent;
            return Ok(());
        }
        let mut identifier = Identifier::new();
        for field in self.metadata.identifier_fields() {
            let value = self.raw_value(field)?;
            if value.is_null() {
                *self.identifier.borrow_mut() = IdentifierState::Absent;
                return Ok(());
            }
            identifier.push(field.as_str(), value);
        }
        *self.identifier.borrow_mut() = IdentifierState::Resolved(identifier);
        Ok(())
    }

    /// Identifier a lazy reference was created with, rebuilt in declared
    /// field order. `None` unless every identifier field is known and non-null.
    fn known_identifier(&self) -> Option<Identifier> {
        let persistence = &self.services.persistence;
        if !persistence.is_lazy_reference(&self.entity) {
            return None;
        }
        let known = persistence.known_identifier_of(&self.entity)?;
        let fields = self.metadata.identifier_fields();
        if fields.is_empty() {
            return None;
        }

        let mut identifier = Identifier::new();
        for field in fields {
            let value = known.get(field).filter(|value| !value.is_null())?;
            identifier.push(field.as_str(), value.clone());
        }
        Some(identifier)
    }

    fn initialize_entity(&self) -> Result<()> {
        if self.initialized.get() {
            return Ok(());
        }
        if self.entity.is_pending() {
            event!(Level::DEBUG, class = self.entity.class_name(), "materializing lazy entity");
            self.services.persistence.force_load(&self.entity)?;
        }
        self.initialized.set(true);
        Ok(())
    }

    // ========================================
    // Associations
    // ========================================

    pub fn is_to_one_association(&self, association: &str) -> Result<bool> {
        Ok(self.association_mapping(association)?.is_to_one())
    }

    pub fn is_to_many_association(&self, association: &str) -> Result<bool> {
        Ok(self.association_mapping(association)?.is_to_many())
    }

    fn association_mapping(&self, association: &str) -> Result<AssociationDescriptor> {
        self.services
            .metadata
            .association_descriptor(self.entity.class_name(), association)
    }

    // ========================================
    // Field access
    // ========================================

    /// Raw writes of every pair in iteration order. Not atomic: pairs applied
    /// before a failing one stay applied.
    pub fn populate<K, V, I>(&self, data: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (field, value) in data {
            self.set_raw_value(field.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Reads `property` through its override getter, the conventional getter,
    /// or the mapped field, in that order.
    pub fn get_value(&self, property: &str) -> Result<Value> {
        self.initialize_entity()?;
        let chain = ResolutionChain::standard(
            &self.services.overrides,
            &self.services.config,
            RawField::new(|request| self.raw_value(request.property)),
        );
        let request = AccessRequest::new(&self.entity, AccessorKind::Get, property, Vec::new());
        Ok(chain.run(&request)?.value)
    }

    /// Like [`Self::get_value`], but an undeclared field yields `Ok(None)`.
    pub fn try_get_value(&self, property: &str) -> Result<Option<Value>> {
        match self.get_value(property) {
            Ok(value) => Ok(Some(value)),
            Err(AccessError::InvalidField { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn raw_value(&self, field: &str) -> Result<Value> {
        self.initialize_entity()?;
        if !self.metadata.has_field(field) {
            return Err(AccessError::field_not_exist(self.entity.class_name(), field));
        }
        self.services.metadata.field_value(&self.entity, field)
    }

    /// Writes `field` through its override setter, the conventional setter,
    /// or the mapped field.
    ///
    /// For association fields a falsy value becomes `NULL` and a scalar is
    /// treated as the target's primary key and looked up first. Cardinality
    /// is not checked: a to-many field accepts a whole collection here.
    pub fn set_value(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.initialize_entity()?;
        let mut value = value.into();
        if let Some(association) = self.metadata.association(field) {
            value = self.coerce_association_value(association, value)?;
        }

        let chain = ResolutionChain::standard(
            &self.services.overrides,
            &self.services.config,
            RawField::new(|request| {
                let value = request.args.first().cloned().unwrap_or(Value::Null);
                self.set_raw_value(request.property, value).map(|_| Value::Null)
            }),
        );
        let request = AccessRequest::new(&self.entity, AccessorKind::Set, field, vec![value]);
        chain.run(&request).map(|_| ())
    }

    pub fn set_raw_value(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.initialize_entity()?;
        if !self.metadata.has_field(field) {
            return Err(AccessError::field_not_exist(self.entity.class_name(), field));
        }
        self.services
            .metadata
            .set_field_value(&self.entity, field, value.into())
    }

    /// Like [`Self::set_value`], but an undeclared field yields `Ok(false)`.
    pub fn try_set_value(&self, field: &str, value: impl Into<Value>) -> Result<bool> {
        match self.set_value(field, value) {
            Ok(()) => Ok(true),
            Err(AccessError::InvalidField { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn coerce_association_value(
        &self,
        association: &AssociationDescriptor,
        value: Value,
    ) -> Result<Value> {
        if !value.is_truthy() {
            return Ok(Value::Null);
        }
        match value {
            Value::Entity(_) | Value::Collection(_) => Ok(value),
            key => {
                let found = self
                    .services
                    .persistence
                    .find_by_identifier(&association.target_class, &key)?;
                event!(
                    Level::DEBUG,
                    target = %association.target_class,
                    key = %key,
                    found = found.is_some(),
                    "association value looked up by identifier"
                );
                Ok(found.map(Value::Entity).unwrap_or(Value::Null))
            }
        }
    }

    // ========================================
    // Collections
    // ========================================

    pub fn add_to_collection(&self, association: &str, associated: &EntityRef) -> Result<()> {
        self.mutate_collection(CollectionOp::Add, association, associated)
    }

    pub fn remove_from_collection(&self, association: &str, associated: &EntityRef) -> Result<()> {
        self.mutate_collection(CollectionOp::Remove, association, associated)
    }

    fn mutate_collection(
        &self,
        op: CollectionOp,
        association: &str,
        associated: &EntityRef,
    ) -> Result<()> {
        self.initialize_entity()?;
        let mapping = self.association_mapping(association)?;
        if !mapping.is_to_many() {
            return Err(AccessError::not_to_many_association(
                self.entity.class_name(),
                association,
            ));
        }
        if associated.class_name() != mapping.target_class {
            return Err(AccessError::invalid_target_entity(
                self.entity.class_name(),
                association,
                &mapping.target_class,
                associated.class_name(),
            ));
        }

        // Override and conventional methods own the whole operation,
        // inverse side included; only the default path syncs.
        let chain = ResolutionChain::standard(
            &self.services.overrides,
            &self.services.config,
            RawField::new(|_| {
                self.apply_default_collection_op(op, &mapping, associated)
                    .map(|_| Value::Null)
            }),
        );
        let request = AccessRequest::new(
            &self.entity,
            op.kind(),
            association,
            vec![Value::Entity(associated.clone())],
        );
        chain.run(&request).map(|_| ())
    }

    fn apply_default_collection_op(
        &self,
        op: CollectionOp,
        mapping: &AssociationDescriptor,
        associated: &EntityRef,
    ) -> Result<()> {
        let collection = self.collection_from_association(&mapping.name)?;
        match op {
            CollectionOp::Add => {
                if !collection.contains(associated) {
                    collection.add(associated.clone());
                }
            }
            CollectionOp::Remove => {
                collection.remove_element(associated);
            }
        }
        self.set_raw_value(&mapping.name, Value::Collection(collection))?;

        let Some(inverse) = mapping.inverse_field() else {
            return Ok(());
        };
        if !self.services.config.sync_inverse_side {
            return Ok(());
        }
        self.sync_inverse_side(op, inverse, associated)
    }

    fn collection_from_association(&self, association: &str) -> Result<CollectionRef> {
        match self.raw_value(association)? {
            Value::Collection(collection) => Ok(collection),
            _ => Err(AccessError::not_a_collection(
                self.entity.class_name(),
                association,
            )),
        }
    }

    fn sync_inverse_side(&self, op: CollectionOp, inverse: &str, associated: &EntityRef) -> Result<()> {
        let other = match self.registry.upgrade() {
            Some(registry) => registry.wrap(associated),
            None => Rc::new(EntityWrapper::new(
                associated.clone(),
                self.services.clone(),
                Weak::new(),
            )),
        };

        event!(
            Level::DEBUG,
            class = self.entity.class_name(),
            target = associated.class_name(),
            inverse,
            op = ?op,
            "syncing inverse side"
        );

        // Many-to-many: the inverse is itself a collection, mirror membership.
        let inverse_is_collection = other
            .metadata
            .association(inverse)
            .is_some_and(AssociationDescriptor::is_to_many);
        if inverse_is_collection {
            let collection = other.collection_from_association(inverse)?;
            match op {
                CollectionOp::Add if !collection.contains(&self.entity) => {
                    collection.add(self.entity.clone())
                }
                CollectionOp::Remove => {
                    collection.remove_element(&self.entity);
                }
                CollectionOp::Add => {}
            }
            return other.set_raw_value(inverse, Value::Collection(collection));
        }

        match op {
            CollectionOp::Add => other.set_raw_value(inverse, Value::Entity(self.entity.clone())),
            CollectionOp::Remove => other.set_raw_value(inverse, Value::Null),
        }
    }
}

impl std::fmt::Debug for EntityWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityWrapper")
            .field("entity", &self.entity)
            .field("initialized", &self.initialized.get())
            .field("identifier", &*self.identifier.borrow())
            .finish()
    }
}
