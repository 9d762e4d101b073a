//! Everything needed to declare entities and drive them through a wrapper cache.

pub use crate::{
    AccessError, AccessorConfig, AccessorOverride, AssociationDescriptor, CollectionRef, Entity,
    EntityMetadata, EntityRef, EntityWrapper, ErrorKind, Identifier, InMemoryPersistence,
    MetadataRegistry, OverrideTable, Result, Value, WrapperCache, entity_methods,
};
