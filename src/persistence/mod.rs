//! Persistence-manager contract: identifier lookups and lazy-reference
//! bookkeeping. Transactions, queries and flushing live elsewhere.

mod memory;

pub use memory::{Hydrator, InMemoryPersistence};

use crate::core::{Identifier, Result, Value};
use crate::entity::EntityRef;

pub trait PersistenceManager {
    /// Primary-key lookup. `Ok(None)` when nothing matches `key`.
    fn find_by_identifier(&self, target_class: &str, key: &Value) -> Result<Option<EntityRef>>;

    /// Whether `entity` is a reference handed out by this manager in place
    /// of loaded state (it may have been materialized since).
    fn is_lazy_reference(&self, entity: &EntityRef) -> bool;

    /// Loads the state behind a pending reference. A no-op once loaded.
    fn force_load(&self, entity: &EntityRef) -> Result<()>;

    /// Identifier the manager already knows for a lazy reference.
    fn known_identifier_of(&self, entity: &EntityRef) -> Option<Identifier>;
}
