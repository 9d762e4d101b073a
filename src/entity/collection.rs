use crate::entity::EntityRef;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Minimal container contract needed by default-path collection mutation.
pub trait Collection {
    fn contains(&self, item: &EntityRef) -> bool;
    fn add(&mut self, item: EntityRef);
    /// Removes `item` if present and reports whether it was.
    fn remove_element(&mut self, item: &EntityRef) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Snapshot of the elements in container order.
    fn to_vec(&self) -> Vec<EntityRef>;
}

/// Vec-backed collection comparing elements by identity.
#[derive(Debug, Default, Clone)]
pub struct ArrayCollection {
    elements: Vec<EntityRef>,
}

impl ArrayCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<EntityRef> for ArrayCollection {
    fn from_iter<I: IntoIterator<Item = EntityRef>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl Collection for ArrayCollection {
    fn contains(&self, item: &EntityRef) -> bool {
        self.elements.iter().any(|e| e.ptr_eq(item))
    }

    fn add(&mut self, item: EntityRef) {
        self.elements.push(item);
    }

    fn remove_element(&mut self, item: &EntityRef) -> bool {
        match self.elements.iter().position(|e| e.ptr_eq(item)) {
            Some(idx) => {
                self.elements.remove(idx);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn to_vec(&self) -> Vec<EntityRef> {
        self.elements.clone()
    }
}

/// Shared handle to a collection stored in an entity field.
#[derive(Clone)]
pub struct CollectionRef(Rc<RefCell<dyn Collection>>);

impl CollectionRef {
    pub fn new<C: Collection + 'static>(collection: C) -> Self {
        Self(Rc::new(RefCell::new(collection)))
    }

    pub fn empty() -> Self {
        Self::new(ArrayCollection::new())
    }

    pub fn of(items: impl IntoIterator<Item = EntityRef>) -> Self {
        Self::new(items.into_iter().collect::<ArrayCollection>())
    }

    pub fn contains(&self, item: &EntityRef) -> bool {
        self.0.borrow().contains(item)
    }

    pub fn add(&self, item: EntityRef) {
        self.0.borrow_mut().add(item);
    }

    pub fn remove_element(&self, item: &EntityRef) -> bool {
        self.0.borrow_mut().remove_element(item)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn to_vec(&self) -> Vec<EntityRef> {
        self.0.borrow().to_vec()
    }

    pub fn ptr_eq(&self, other: &CollectionRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for CollectionRef {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}
