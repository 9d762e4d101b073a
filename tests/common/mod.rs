#![allow(dead_code)]

use entity_access::prelude::*;
use entity_access::{AnnotationSource, InMemoryPersistence};
use std::rc::Rc;

// ============================================================================
// Plain entities: every access goes through the default path
// ============================================================================

#[derive(Entity, Default)]
pub struct Order {
    pub id: Option<i64>,
    pub total: i64,
    pub note: Option<String>,
    pub items: CollectionRef,
    pub tags: CollectionRef,
    pub customer: Option<EntityRef>,
    #[entity(skip)]
    pub scratch: Vec<String>,
}

#[derive(Entity, Default)]
pub struct Item {
    pub id: Option<i64>,
    pub name: String,
    pub order: Option<EntityRef>,
}

#[derive(Entity, Default)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Entity, Default)]
pub struct Tag {
    pub id: Option<i64>,
    pub label: String,
    pub orders: CollectionRef,
}

/// Holds its to-many side in an untyped slot so tests can break the shape.
#[derive(Entity)]
pub struct Shelf {
    pub id: Option<i64>,
    pub books: Value,
}

#[derive(Entity, Default)]
pub struct Book {
    pub id: Option<i64>,
    pub shelf: Option<EntityRef>,
}

#[derive(Entity, Default)]
#[entity(class = "OrderLine")]
pub struct CompositeLine {
    pub order_no: Option<i64>,
    pub position: Option<i64>,
}

// ============================================================================
// Entities exposing methods: override and conventional tiers
// ============================================================================

#[derive(Entity, Default)]
#[entity(methods)]
pub struct Invoice {
    pub id: Option<i64>,
    pub number: String,
    #[accessor(get = "formatted_total", set = "store_total")]
    pub total: i64,
    #[accessor(add = "attach_line", remove = "detach_line")]
    pub lines: CollectionRef,
    pub payments: CollectionRef,
    #[entity(skip)]
    pub calls: Vec<String>,
}

#[entity_methods]
impl Invoice {
    pub fn get_number(&mut self) -> String {
        self.calls.push("get_number".into());
        self.number.to_uppercase()
    }

    pub fn set_number(&mut self, number: String) {
        self.calls.push("set_number".into());
        self.number = number.trim().to_string();
    }

    pub fn get_total(&mut self) -> i64 {
        self.calls.push("get_total".into());
        -1
    }

    pub fn formatted_total(&mut self) -> String {
        self.calls.push("formatted_total".into());
        format!("{} EUR", self.total)
    }

    pub fn store_total(&mut self, total: i64) {
        self.calls.push(format!("store_total({})", total));
        self.total = total * 100;
    }

    /// Keeps `Line::invoice` in step itself, since override adders are not synced.
    pub fn attach_line(&mut self, this: EntityRef, line: EntityRef) {
        self.calls.push("attach_line".into());
        line.with_mut(|l: &mut Line| l.invoice = Some(this));
        self.lines.add(line);
    }

    pub fn detach_line(&mut self, line: EntityRef) -> Result<bool> {
        self.calls.push("detach_line".into());
        line.with_mut(|l: &mut Line| l.invoice = None);
        Ok(self.lines.remove_element(&line))
    }

    /// Conventional adder that deliberately leaves the inverse side alone.
    pub fn add_payments(&mut self, payment: EntityRef) {
        self.calls.push("add_payments".into());
        if !self.payments.contains(&payment) {
            self.payments.add(payment);
        }
    }
}

#[derive(Entity, Default)]
pub struct Line {
    pub id: Option<i64>,
    pub invoice: Option<EntityRef>,
}

#[derive(Entity, Default)]
pub struct Payment {
    pub id: Option<i64>,
    pub invoice: Option<EntityRef>,
}

/// Self-referential tree whose conventional adder links the child's parent.
#[derive(Entity, Default)]
#[entity(methods)]
pub struct Node {
    pub id: Option<i64>,
    pub children: CollectionRef,
    pub parent: Option<EntityRef>,
}

#[entity_methods]
impl Node {
    /// Returns whether the child's back-reference could be written. A node
    /// adopting itself is already borrowed and only joins the collection.
    pub fn add_children(&mut self, this: EntityRef, child: EntityRef) -> bool {
        let linked = child
            .with_mut(|c: &mut Node| c.parent = Some(this))
            .is_some();
        if !self.children.contains(&child) {
            self.children.add(child);
        }
        linked
    }
}

/// Never registered with the metadata registry.
#[derive(Entity, Default)]
pub struct Draft {
    pub text: String,
}

// ============================================================================
// Wiring
// ============================================================================

pub fn registry() -> MetadataRegistry {
    MetadataRegistry::new()
        .with_class(
            EntityMetadata::builder("Order")
                .identifier("id")
                .field("total")
                .field("note")
                .association(AssociationDescriptor::to_many("items", "Item").mapped_by("order"))
                .association(AssociationDescriptor::to_many("tags", "Tag").inversed_by("orders"))
                .to_one("customer", "Customer")
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Item")
                .identifier("id")
                .field("name")
                .association(AssociationDescriptor::to_one("order", "Order").inversed_by("items"))
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Customer")
                .identifier("id")
                .field("name")
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Tag")
                .identifier("id")
                .field("label")
                .association(AssociationDescriptor::to_many("orders", "Order").mapped_by("tags"))
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Shelf")
                .identifier("id")
                .association(AssociationDescriptor::to_many("books", "Book").mapped_by("shelf"))
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Book")
                .identifier("id")
                .to_one("shelf", "Shelf")
                .build(),
        )
        .with_class(
            EntityMetadata::builder("OrderLine")
                .identifier("order_no")
                .identifier("position")
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Invoice")
                .identifier("id")
                .field("number")
                .field("total")
                .association(AssociationDescriptor::to_many("lines", "Line").mapped_by("invoice"))
                .association(AssociationDescriptor::to_many("payments", "Payment").mapped_by("invoice"))
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Line")
                .identifier("id")
                .to_one("invoice", "Invoice")
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Node")
                .identifier("id")
                .association(AssociationDescriptor::to_many("children", "Node").mapped_by("parent"))
                .to_one("parent", "Node")
                .build(),
        )
        .with_class(
            EntityMetadata::builder("Payment")
                .identifier("id")
                .to_one("invoice", "Invoice")
                .build(),
        )
}

/// Primary keys above 100 do not exist in the backing store.
fn stored_id(key: &Value) -> Option<i64> {
    key.as_i64().filter(|id| *id <= 100)
}

/// Persistence manager able to load customers, orders, items and order
/// lines by primary key.
pub fn persistence() -> Rc<InMemoryPersistence> {
    let persistence = InMemoryPersistence::new()
        .with_hydrator("Customer", |key| {
            let Some(id) = stored_id(key) else {
                return Ok(None);
            };
            let customer: Box<dyn Entity> = Box::new(Customer {
                id: Some(id),
                name: format!("customer-{}", id),
            });
            Ok(Some(customer))
        })
        .with_hydrator("Order", |key| {
            let Some(id) = stored_id(key) else {
                return Ok(None);
            };
            let order: Box<dyn Entity> = Box::new(Order {
                id: Some(id),
                total: id * 10,
                ..Order::default()
            });
            Ok(Some(order))
        })
        .with_hydrator("Item", |key| {
            let Some(id) = stored_id(key) else {
                return Ok(None);
            };
            let item: Box<dyn Entity> = Box::new(Item {
                id: Some(id),
                name: format!("item-{}", id),
                order: None,
            });
            Ok(Some(item))
        })
        .with_hydrator("OrderLine", |key| {
            // Stored lines are keyed by order number; each order has one line.
            let Some(order_no) = stored_id(key) else {
                return Ok(None);
            };
            let line: Box<dyn Entity> = Box::new(CompositeLine {
                order_no: Some(order_no),
                position: Some(1),
            });
            Ok(Some(line))
        });
    Rc::new(persistence)
}

pub struct Fixture {
    pub cache: WrapperCache,
    pub persistence: Rc<InMemoryPersistence>,
}

impl Fixture {
    pub fn new() -> Self {
        let persistence = persistence();
        let cache = WrapperCache::new(Rc::new(registry()), persistence.clone());
        Self { cache, persistence }
    }

    pub fn with_config(config: AccessorConfig) -> Self {
        let persistence = persistence();
        let cache = WrapperCache::builder(Rc::new(registry()), persistence.clone())
            .config(config)
            .build();
        Self { cache, persistence }
    }

    pub fn with_source(source: Rc<dyn AnnotationSource>) -> Self {
        let persistence = persistence();
        let cache = WrapperCache::builder(Rc::new(registry()), persistence.clone())
            .annotation_source(source)
            .build();
        Self { cache, persistence }
    }
}

pub fn order(id: i64, total: i64) -> EntityRef {
    EntityRef::new(Order {
        id: Some(id),
        total,
        ..Order::default()
    })
}

pub fn item(id: i64, name: &str) -> EntityRef {
    EntityRef::new(Item {
        id: Some(id),
        name: name.to_string(),
        order: None,
    })
}

pub fn node(id: i64) -> EntityRef {
    EntityRef::new(Node {
        id: Some(id),
        ..Node::default()
    })
}

pub fn node_parent(node: &EntityRef) -> Option<EntityRef> {
    node.with(|n: &Node| n.parent.clone()).flatten()
}

pub fn invoice_calls(invoice: &EntityRef) -> Vec<String> {
    invoice
        .with(|i: &Invoice| i.calls.clone())
        .unwrap_or_default()
}

pub fn item_order(item: &EntityRef) -> Option<EntityRef> {
    item.with(|i: &Item| i.order.clone()).flatten()
}
