//! Identity-scoped wrapper cache: at most one [`EntityWrapper`] per entity.

mod entity_wrapper;
pub mod resolution;

pub use entity_wrapper::EntityWrapper;

use crate::config::AccessorConfig;
use crate::entity::{EntityKey, EntityRef};
use crate::metadata::MetadataProvider;
use crate::overrides::{AccessorOverrideCache, AnnotationSource, AttributeSource};
use crate::persistence::PersistenceManager;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{Level, event};

/// Collaborators shared by every wrapper of one cache.
pub(crate) struct Services {
    pub(crate) metadata: Rc<dyn MetadataProvider>,
    pub(crate) persistence: Rc<dyn PersistenceManager>,
    pub(crate) overrides: AccessorOverrideCache,
    pub(crate) config: AccessorConfig,
}

pub(crate) struct WrapperRegistry {
    services: Rc<Services>,
    wrappers: RefCell<HashMap<EntityKey, Rc<EntityWrapper>>>,
}

impl WrapperRegistry {
    pub(crate) fn wrap(self: &Rc<Self>, entity: &EntityRef) -> Rc<EntityWrapper> {
        let key = entity.key();
        if let Some(wrapper) = self.wrappers.borrow().get(&key) {
            return wrapper.clone();
        }

        // The wrapper keeps a clone of `entity`, so `key` cannot be reused by
        // another allocation while the entry exists.
        let wrapper = Rc::new(EntityWrapper::new(
            entity.clone(),
            self.services.clone(),
            Rc::downgrade(self),
        ));
        event!(
            Level::DEBUG,
            class = entity.class_name(),
            key = key.as_usize(),
            "entity wrapped"
        );
        self.wrappers.borrow_mut().insert(key, wrapper.clone());
        wrapper
    }
}

/// Entry point of the accessor layer, scoped like a unit of work.
///
/// Wrappers are created on first [`WrapperCache::wrap`] and live as long as
/// the cache; wrappers only hold a weak reference back to it.
/// Not meant to be shared across threads.
pub struct WrapperCache {
    registry: Rc<WrapperRegistry>,
}

impl WrapperCache {
    /// Cache using attribute-declared overrides and the default configuration.
    pub fn new(
        metadata: Rc<dyn MetadataProvider>,
        persistence: Rc<dyn PersistenceManager>,
    ) -> Self {
        Self::builder(metadata, persistence).build()
    }

    pub fn builder(
        metadata: Rc<dyn MetadataProvider>,
        persistence: Rc<dyn PersistenceManager>,
    ) -> WrapperCacheBuilder {
        WrapperCacheBuilder {
            metadata,
            persistence,
            source: Rc::new(AttributeSource),
            config: AccessorConfig::default(),
        }
    }

    /// Returns the wrapper for `entity`, creating it on first use.
    /// Identity is the handle's allocation, never field equality.
    pub fn wrap(&self, entity: &EntityRef) -> Rc<EntityWrapper> {
        self.registry.wrap(entity)
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.registry.wrappers.borrow().contains_key(&entity.key())
    }

    pub fn len(&self) -> usize {
        self.registry.wrappers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overrides(&self) -> &AccessorOverrideCache {
        &self.registry.services.overrides
    }

    pub fn config(&self) -> &AccessorConfig {
        &self.registry.services.config
    }
}

pub struct WrapperCacheBuilder {
    metadata: Rc<dyn MetadataProvider>,
    persistence: Rc<dyn PersistenceManager>,
    source: Rc<dyn AnnotationSource>,
    config: AccessorConfig,
}

impl WrapperCacheBuilder {
    pub fn annotation_source(mut self, source: Rc<dyn AnnotationSource>) -> Self {
        self.source = source;
        self
    }

    pub fn config(mut self, config: AccessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> WrapperCache {
        let services = Rc::new(Services {
            metadata: self.metadata,
            persistence: self.persistence,
            overrides: AccessorOverrideCache::new(self.source),
            config: self.config,
        });
        WrapperCache {
            registry: Rc::new(WrapperRegistry {
                services,
                wrappers: RefCell::new(HashMap::new()),
            }),
        }
    }
}
