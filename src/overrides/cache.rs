use crate::entity::Entity;
use crate::overrides::{AccessorOverride, AnnotationSource};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{Level, event};

/// Memoizes override resolution per (class, property) for the cache's lifetime.
///
/// "No override" answers are cached too, so later changes to the source are
/// never observed for a pair that was already resolved.
pub struct AccessorOverrideCache {
    source: Rc<dyn AnnotationSource>,
    resolved: RefCell<HashMap<(String, String), Rc<AccessorOverride>>>,
}

impl AccessorOverrideCache {
    pub fn new(source: Rc<dyn AnnotationSource>) -> Self {
        Self {
            source,
            resolved: RefCell::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, entity: &dyn Entity, property: &str) -> Rc<AccessorOverride> {
        let key = (entity.class_name().to_string(), property.to_string());
        if let Some(accessor) = self.resolved.borrow().get(&key) {
            return accessor.clone();
        }

        let accessor = Rc::new(self.read(entity, property));
        event!(
            Level::DEBUG,
            class = %key.0,
            property,
            custom = !accessor.is_empty(),
            "accessor override resolved"
        );
        self.resolved.borrow_mut().insert(key, accessor.clone());
        accessor
    }

    pub fn len(&self) -> usize {
        self.resolved.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.borrow().is_empty()
    }

    fn read(&self, entity: &dyn Entity, property: &str) -> AccessorOverride {
        if !entity.declares_property(property) {
            return AccessorOverride::none();
        }
        self.source
            .override_for(entity, property)
            .unwrap_or_default()
    }
}

impl Default for AccessorOverrideCache {
    fn default() -> Self {
        Self::new(Rc::new(super::AttributeSource))
    }
}
