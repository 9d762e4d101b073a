// ============================================================================
// Entity Access Library
// ============================================================================
//
// Generic accessor layer over entities managed by an external persistence
// layer: override-aware get/set, to-many collection mutation with
// inverse-side sync, identifier resolution and lazy materialization.

pub mod config;
pub mod core;
pub mod entity;
pub mod metadata;
pub mod overrides;
pub mod persistence;
pub mod prelude;
pub mod wrapper;

#[cfg(test)]
mod test_support;

// Lets `#[derive(Entity)]` output (which names `::entity_access`) resolve
// inside this crate too.
extern crate self as entity_access;

pub use config::AccessorConfig;
pub use core::{AccessError, ErrorKind, FromValue, Identifier, IntoValue, Result, Value};
pub use entity::{ArrayCollection, Collection, CollectionRef, Entity, EntityKey, EntityRef, LazyHandle};
pub use metadata::{
    AssociationDescriptor, Cardinality, EntityMetadata, InverseSide, MetadataProvider,
    MetadataRegistry,
};
pub use overrides::{
    AccessorKind, AccessorOverride, AccessorOverrideCache, AnnotationSource, AttributeSource,
    ChainedSource, OverrideTable,
};
pub use persistence::{InMemoryPersistence, PersistenceManager};
pub use wrapper::{EntityWrapper, WrapperCache, WrapperCacheBuilder};

pub use entity_access_derive::{Entity, entity_methods};
