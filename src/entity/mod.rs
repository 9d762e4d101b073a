//! Entity contracts and the shared handle the accessor layer passes around.
//!
//! Entities are reference-identity objects: two structurally equal entities
//! held in different [`EntityRef`]s are different entities.

mod collection;

pub use collection::{ArrayCollection, Collection, CollectionRef};

use crate::core::{AccessError, Identifier, Result, Value};
use crate::overrides::AccessorOverride;
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Core trait for objects the accessor layer can manipulate.
///
/// Usually implemented with `#[derive(Entity)]`; the raw field hooks play the
/// part of reflection and are only reached through metadata-driven access.
pub trait Entity: Any {
    /// Runtime class name, matched against metadata and association targets.
    fn class_name(&self) -> &str;

    /// Properties declared on the class, whether or not they are mapped.
    fn declared_properties(&self) -> &'static [&'static str];

    fn declares_property(&self, name: &str) -> bool {
        self.declared_properties().contains(&name)
    }

    /// Reads a declared property. `None` means no such property.
    fn read_field(&self, field: &str) -> Option<Value>;

    /// Writes a declared property. `None` means no such property, `Some(Err)`
    /// means the value did not fit the property's type.
    fn write_field(&mut self, field: &str, value: Value) -> Option<Result<()>>;

    /// Accessor override declared on the property itself, if any.
    fn declared_override(&self, _property: &str) -> Option<AccessorOverride> {
        None
    }

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    /// Invokes a dynamically dispatched method. `None` means no such method.
    ///
    /// `this` is the handle the entity is being accessed through, so methods
    /// can link the other side of an association back to it. The handle is
    /// mutably borrowed for the duration of the call.
    fn call_method(
        &mut self,
        _this: &EntityRef,
        _name: &str,
        _args: Vec<Value>,
    ) -> Option<Result<Value>> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Placeholder data for an entity whose state has not been loaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyHandle {
    pub identifier: Identifier,
}

impl LazyHandle {
    pub fn new(identifier: Identifier) -> Self {
        Self { identifier }
    }
}

enum Slot {
    Pending(LazyHandle),
    Loaded(Box<dyn Entity>),
}

struct EntityCell {
    class: String,
    slot: RefCell<Slot>,
}

/// Stable identity of an [`EntityRef`], valid while any clone of it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(usize);

impl EntityKey {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Shared, identity-compared handle to an entity or a lazy reference to one.
///
/// Handles are strong references. Entities that point at each other, as both
/// sides of a synced bidirectional association do, form `Rc` cycles and are
/// not freed until one side drops its reference.
///
/// The entity is borrowed dynamically: accessors that find it already
/// borrowed (for instance from inside one of its own dispatched methods)
/// fail with [`AccessError::EntityBusy`] instead of panicking.
#[derive(Clone)]
pub struct EntityRef(Rc<EntityCell>);

impl EntityRef {
    pub fn new<E: Entity>(entity: E) -> Self {
        let class = entity.class_name().to_string();
        Self(Rc::new(EntityCell {
            class,
            slot: RefCell::new(Slot::Loaded(Box::new(entity))),
        }))
    }

    pub fn new_boxed(entity: Box<dyn Entity>) -> Self {
        let class = entity.class_name().to_string();
        Self(Rc::new(EntityCell {
            class,
            slot: RefCell::new(Slot::Loaded(entity)),
        }))
    }

    /// Creates a pending reference; field access fails until [`Self::materialize`].
    pub fn lazy(class: impl Into<String>, handle: LazyHandle) -> Self {
        Self(Rc::new(EntityCell {
            class: class.into(),
            slot: RefCell::new(Slot::Pending(handle)),
        }))
    }

    pub fn class_name(&self) -> &str {
        &self.0.class
    }

    pub fn key(&self) -> EntityKey {
        EntityKey(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A borrowed slot always holds loaded state, so a busy entity is not pending.
    pub fn is_pending(&self) -> bool {
        self.0
            .slot
            .try_borrow()
            .is_ok_and(|slot| matches!(&*slot, Slot::Pending(_)))
    }

    pub fn lazy_handle(&self) -> Option<LazyHandle> {
        match &*self.0.slot.try_borrow().ok()? {
            Slot::Pending(handle) => Some(handle.clone()),
            Slot::Loaded(_) => None,
        }
    }

    /// Replaces a pending slot with loaded state. A no-op for loaded entities.
    pub fn materialize(&self, entity: Box<dyn Entity>) -> Result<()> {
        if entity.class_name() != self.0.class {
            return Err(AccessError::Persistence(format!(
                "cannot materialize {} reference with {} state",
                self.0.class,
                entity.class_name()
            )));
        }
        // Only loaded slots are ever held borrowed.
        let Ok(mut slot) = self.0.slot.try_borrow_mut() else {
            return Ok(());
        };
        if let Slot::Pending(_) = &*slot {
            *slot = Slot::Loaded(entity);
        }
        Ok(())
    }

    pub fn borrow(&self) -> Result<Ref<'_, dyn Entity + 'static>> {
        let slot = self.0.slot.try_borrow().map_err(|_| self.busy())?;
        Ref::filter_map(slot, |slot| match slot {
            Slot::Loaded(entity) => Some(&**entity),
            Slot::Pending(_) => None,
        })
        .map_err(|_| AccessError::NotMaterialized(self.0.class.clone()))
    }

    pub fn borrow_mut(&self) -> Result<RefMut<'_, dyn Entity + 'static>> {
        let slot = self.0.slot.try_borrow_mut().map_err(|_| self.busy())?;
        RefMut::filter_map(slot, |slot| match slot {
            Slot::Loaded(entity) => Some(&mut **entity),
            Slot::Pending(_) => None,
        })
        .map_err(|_| AccessError::NotMaterialized(self.0.class.clone()))
    }

    /// Runs `f` against the concrete entity type, if loaded, not borrowed
    /// elsewhere and of type `E`.
    pub fn with<E: Entity, R>(&self, f: impl FnOnce(&E) -> R) -> Option<R> {
        let entity = self.borrow().ok()?;
        entity.as_any().downcast_ref::<E>().map(f)
    }

    pub fn with_mut<E: Entity, R>(&self, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        let mut entity = self.borrow_mut().ok()?;
        entity.as_any_mut().downcast_mut::<E>().map(f)
    }

    fn busy(&self) -> AccessError {
        AccessError::EntityBusy(self.0.class.clone())
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EntityRef {}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_pending() { "pending" } else { "loaded" };
        write!(f, "EntityRef({}@{:#x}, {})", self.0.class, self.key().0, state)
    }
}
