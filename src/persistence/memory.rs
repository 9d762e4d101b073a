use crate::core::{AccessError, Identifier, Result, Value};
use crate::entity::{Entity, EntityKey, EntityRef, LazyHandle};
use crate::persistence::PersistenceManager;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{Level, event};

/// Builds the loaded state of one class from its primary key.
pub type Hydrator = Box<dyn Fn(&Value) -> Result<Option<Box<dyn Entity>>>>;

/// Identity-map persistence manager kept entirely in memory.
///
/// Entities are indexed per class by the first component of their
/// identifier. Classes with a registered [`Hydrator`] can also be found or
/// referenced before anything was persisted for them.
#[derive(Default)]
pub struct InMemoryPersistence {
    identity_map: RefCell<HashMap<String, Vec<(Value, EntityRef)>>>,
    references: RefCell<HashMap<EntityKey, Identifier>>,
    hydrators: HashMap<String, Hydrator>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hydrator(
        mut self,
        class: impl Into<String>,
        hydrator: impl Fn(&Value) -> Result<Option<Box<dyn Entity>>> + 'static,
    ) -> Self {
        self.hydrators.insert(class.into(), Box::new(hydrator));
        self
    }

    /// Puts a loaded entity into the identity map under `key`.
    pub fn persist(&self, entity: &EntityRef, key: impl Into<Value>) {
        let key = key.into();
        let mut map = self.identity_map.borrow_mut();
        let entries = map.entry(entity.class_name().to_string()).or_default();
        entries.retain(|(existing, _)| *existing != key);
        event!(Level::DEBUG, class = entity.class_name(), key = %key, "entity persisted");
        entries.push((key, entity.clone()));
    }

    /// Returns the managed entity for `identifier`, or a pending reference
    /// that records the identifier without loading anything.
    pub fn get_reference(&self, class: &str, identifier: Identifier) -> EntityRef {
        if let Some(key) = identifier.first() {
            if let Some(entity) = self.lookup(class, key) {
                return entity;
            }
        }

        let reference = EntityRef::lazy(class, LazyHandle::new(identifier.clone()));
        if let Some(key) = identifier.first() {
            self.persist(&reference, key.clone());
        }
        self.references
            .borrow_mut()
            .insert(reference.key(), identifier);
        reference
    }

    pub fn contains(&self, class: &str, key: &Value) -> bool {
        self.lookup(class, key).is_some()
    }

    fn lookup(&self, class: &str, key: &Value) -> Option<EntityRef> {
        self.identity_map
            .borrow()
            .get(class)?
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, entity)| entity.clone())
    }

    fn hydrate(&self, class: &str, key: &Value) -> Result<Option<Box<dyn Entity>>> {
        let hydrator = self.hydrators.get(class).ok_or_else(|| {
            AccessError::Persistence(format!("no hydrator registered for class {}", class))
        })?;
        hydrator(key)
    }
}

impl PersistenceManager for InMemoryPersistence {
    fn find_by_identifier(&self, target_class: &str, key: &Value) -> Result<Option<EntityRef>> {
        if let Some(entity) = self.lookup(target_class, key) {
            return Ok(Some(entity));
        }
        if !self.hydrators.contains_key(target_class) {
            return Ok(None);
        }

        match self.hydrate(target_class, key)? {
            Some(state) => {
                let entity = EntityRef::new_boxed(state);
                self.persist(&entity, key.clone());
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    fn is_lazy_reference(&self, entity: &EntityRef) -> bool {
        self.references.borrow().contains_key(&entity.key())
    }

    fn force_load(&self, entity: &EntityRef) -> Result<()> {
        let Some(handle) = entity.lazy_handle() else {
            return Ok(());
        };

        event!(
            Level::DEBUG,
            class = entity.class_name(),
            identifier = %handle.identifier,
            "loading lazy reference"
        );
        let key = handle.identifier.first().cloned().unwrap_or(Value::Null);
        let state = self.hydrate(entity.class_name(), &key)?.ok_or_else(|| {
            AccessError::Persistence(format!(
                "entity {} {} not found",
                entity.class_name(),
                handle.identifier
            ))
        })?;
        entity.materialize(state)
    }

    fn known_identifier_of(&self, entity: &EntityRef) -> Option<Identifier> {
        self.references.borrow().get(&entity.key()).cloned()
    }
}
