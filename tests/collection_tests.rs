mod common;

use common::*;
use entity_access::prelude::*;

fn items_of(order: &EntityRef) -> CollectionRef {
    order.with(|o: &Order| o.items.clone()).unwrap()
}

// ============================================================================
// Default path: collection mutation plus inverse sync
// ============================================================================

#[test]
fn test_add_to_collection_syncs_owning_side() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let pen = item(5, "pen");

    fx.cache.wrap(&order).add_to_collection("items", &pen).unwrap();

    assert!(items_of(&order).contains(&pen));
    assert!(item_order(&pen).is_some_and(|o| o.ptr_eq(&order)));
}

#[test]
fn test_add_to_collection_is_idempotent() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let pen = item(5, "pen");
    let wrapper = fx.cache.wrap(&order);

    wrapper.add_to_collection("items", &pen).unwrap();
    wrapper.add_to_collection("items", &pen).unwrap();

    assert_eq!(items_of(&order).len(), 1);
}

#[test]
fn test_add_distinguishes_field_equal_items() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let wrapper = fx.cache.wrap(&order);

    wrapper.add_to_collection("items", &item(5, "pen")).unwrap();
    wrapper.add_to_collection("items", &item(5, "pen")).unwrap();

    assert_eq!(items_of(&order).len(), 2);
}

#[test]
fn test_remove_from_collection_clears_owning_side() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let pen = item(5, "pen");
    let cup = item(6, "cup");
    let wrapper = fx.cache.wrap(&order);
    wrapper.add_to_collection("items", &pen).unwrap();
    wrapper.add_to_collection("items", &cup).unwrap();

    wrapper.remove_from_collection("items", &pen).unwrap();

    let items = items_of(&order);
    assert!(!items.contains(&pen));
    assert!(items.contains(&cup));
    assert!(item_order(&pen).is_none());
    assert!(item_order(&cup).is_some());
}

#[test]
fn test_remove_absent_element_is_noop_on_collection() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let pen = item(5, "pen");
    let wrapper = fx.cache.wrap(&order);
    wrapper.add_to_collection("items", &pen).unwrap();

    wrapper.remove_from_collection("items", &item(9, "ghost")).unwrap();

    assert_eq!(items_of(&order).len(), 1);
}

#[test]
fn test_many_to_many_mirrors_membership() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let tag = EntityRef::new(Tag {
        id: Some(3),
        label: "gift".into(),
        ..Tag::default()
    });
    let tag_orders = || tag.with(|t: &Tag| t.orders.clone()).unwrap();

    fx.cache.wrap(&order).add_to_collection("tags", &tag).unwrap();
    assert!(tag_orders().contains(&order));
    assert!(order.with(|o: &Order| o.tags.contains(&tag)).unwrap());

    fx.cache.wrap(&order).remove_from_collection("tags", &tag).unwrap();
    assert!(tag_orders().is_empty());
    assert!(order.with(|o: &Order| o.tags.is_empty()).unwrap());
}

#[test]
fn test_mutation_from_inverse_side_updates_owner() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let tag = EntityRef::new(Tag::default());

    fx.cache.wrap(&tag).add_to_collection("orders", &order).unwrap();

    assert!(order.with(|o: &Order| o.tags.contains(&tag)).unwrap());
}

#[test]
fn test_sync_can_be_disabled() {
    let fx = Fixture::with_config(AccessorConfig::new().sync_inverse_side(false));
    let order = order(1, 10);
    let pen = item(5, "pen");

    fx.cache.wrap(&order).add_to_collection("items", &pen).unwrap();

    assert!(items_of(&order).contains(&pen));
    assert!(item_order(&pen).is_none());
    assert!(!fx.cache.contains(&pen));
}

// ============================================================================
// Method tiers own the whole operation
// ============================================================================

#[test]
fn test_override_adder_and_remover_are_called() {
    let fx = Fixture::new();
    let invoice = EntityRef::new(Invoice::default());
    let line = EntityRef::new(Line::default());
    let wrapper = fx.cache.wrap(&invoice);

    wrapper.add_to_collection("lines", &line).unwrap();
    assert!(invoice.with(|i: &Invoice| i.lines.contains(&line)).unwrap());

    wrapper.remove_from_collection("lines", &line).unwrap();
    assert!(invoice.with(|i: &Invoice| i.lines.is_empty()).unwrap());

    assert_eq!(invoice_calls(&invoice), vec!["attach_line", "detach_line"]);
}

#[test]
fn test_override_adder_maintains_inverse_side_itself() {
    let fx = Fixture::new();
    let invoice = EntityRef::new(Invoice::default());
    let line = EntityRef::new(Line::default());
    let wrapper = fx.cache.wrap(&invoice);

    wrapper.add_to_collection("lines", &line).unwrap();
    let linked = line.with(|l: &Line| l.invoice.clone()).flatten();
    assert!(linked.is_some_and(|i| i.ptr_eq(&invoice)));
    // The wrapper did not sync anything on its own.
    assert!(!fx.cache.contains(&line));

    wrapper.remove_from_collection("lines", &line).unwrap();
    assert!(line.with(|l: &Line| l.invoice.is_none()).unwrap());
}

#[test]
fn test_conventional_adder_receives_owning_handle() {
    let fx = Fixture::new();
    let root = node(1);
    let leaf = node(2);

    fx.cache.wrap(&root).add_to_collection("children", &leaf).unwrap();

    assert!(node_parent(&leaf).is_some_and(|p| p.ptr_eq(&root)));
    assert!(root.with(|n: &Node| n.children.contains(&leaf)).unwrap());
}

#[test]
fn test_method_touching_its_own_entity_does_not_panic() {
    let fx = Fixture::new();
    let root = node(1);

    fx.cache.wrap(&root).add_to_collection("children", &root).unwrap();

    assert!(root.with(|n: &Node| n.children.contains(&root)).unwrap());
    assert!(node_parent(&root).is_none());
}

#[test]
fn test_conventional_adder_skips_inverse_sync() {
    let fx = Fixture::new();
    let invoice = EntityRef::new(Invoice::default());
    let payment = EntityRef::new(Payment::default());
    let wrapper = fx.cache.wrap(&invoice);

    wrapper.add_to_collection("payments", &payment).unwrap();

    assert_eq!(invoice_calls(&invoice), vec!["add_payments"]);
    assert!(invoice.with(|i: &Invoice| i.payments.contains(&payment)).unwrap());
    assert!(payment.with(|p: &Payment| p.invoice.is_none()).unwrap());
}

#[test]
fn test_default_remover_used_when_no_method_exists() {
    let fx = Fixture::new();
    let invoice = EntityRef::new(Invoice::default());
    let payment = EntityRef::new(Payment::default());
    let wrapper = fx.cache.wrap(&invoice);
    wrapper.add_to_collection("payments", &payment).unwrap();
    payment
        .with_mut(|p: &mut Payment| p.invoice = Some(invoice.clone()))
        .unwrap();

    wrapper.remove_from_collection("payments", &payment).unwrap();

    assert!(invoice.with(|i: &Invoice| i.payments.is_empty()).unwrap());
    assert!(payment.with(|p: &Payment| p.invoice.is_none()).unwrap());
    assert_eq!(invoice_calls(&invoice), vec!["add_payments"]);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_wrong_target_class_is_rejected() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let customer = EntityRef::new(Customer::default());

    let err = fx
        .cache
        .wrap(&order)
        .add_to_collection("items", &customer)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAssociation);
    assert_eq!(
        err.to_string(),
        "Invalid class for Order::$items. Item expected, Customer given"
    );
    assert!(items_of(&order).is_empty());
}

#[test]
fn test_to_one_association_is_rejected() {
    let fx = Fixture::new();
    let pen = item(5, "pen");
    let order = order(1, 10);

    let err = fx
        .cache
        .wrap(&pen)
        .add_to_collection("order", &order)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAssociation);
    assert_eq!(
        err.to_string(),
        "Class association Item::$order is not one-to-many or many-to-many association"
    );
    assert!(item_order(&pen).is_none());
}

#[test]
fn test_undeclared_association_is_rejected() {
    let fx = Fixture::new();
    let order = order(1, 10);

    let err = fx
        .cache
        .wrap(&order)
        .remove_from_collection("total", &item(1, "x"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAssociation);
    assert_eq!(err.to_string(), "Class Order has no association total");
}

#[test]
fn test_non_collection_value_is_unexpected() {
    let fx = Fixture::new();
    let shelf = EntityRef::new(Shelf {
        id: Some(1),
        books: Value::Null,
    });
    let book = EntityRef::new(Book::default());

    let err = fx
        .cache
        .wrap(&shelf)
        .add_to_collection("books", &book)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnexpectedValue);
    assert_eq!(err.to_string(), "Class property Shelf::$books is not a collection");
    assert!(book.with(|b: &Book| b.shelf.is_none()).unwrap());
}

#[test]
fn test_collection_stored_in_untyped_slot_is_used() {
    let fx = Fixture::new();
    let shelf = EntityRef::new(Shelf {
        id: Some(1),
        books: Value::Collection(CollectionRef::empty()),
    });
    let book = EntityRef::new(Book::default());

    fx.cache.wrap(&shelf).add_to_collection("books", &book).unwrap();

    let books = shelf.with(|s: &Shelf| s.books.clone()).unwrap();
    assert!(matches!(books, Value::Collection(c) if c.contains(&book)));
    assert!(book.with(|b: &Book| b.shelf.is_some()).unwrap());
}

// ============================================================================
// Lazy references on either side
// ============================================================================

#[test]
fn test_add_to_collection_materializes_pending_owner() {
    let fx = Fixture::new();
    let order = fx
        .persistence
        .get_reference("Order", Identifier::single("id", 4i64));
    let pen = item(5, "pen");
    assert!(order.is_pending());

    fx.cache.wrap(&order).add_to_collection("items", &pen).unwrap();

    assert!(!order.is_pending());
    assert_eq!(order.with(|o: &Order| o.total), Some(40));
    assert!(items_of(&order).contains(&pen));
    assert!(item_order(&pen).is_some_and(|o| o.ptr_eq(&order)));
}

#[test]
fn test_remove_from_collection_materializes_pending_owner() {
    let fx = Fixture::new();
    let order = fx
        .persistence
        .get_reference("Order", Identifier::single("id", 4i64));

    fx.cache
        .wrap(&order)
        .remove_from_collection("items", &item(5, "pen"))
        .unwrap();

    assert!(!order.is_pending());
    assert!(items_of(&order).is_empty());
}

#[test]
fn test_set_value_materializes_pending_owner() {
    let fx = Fixture::new();
    let order = fx
        .persistence
        .get_reference("Order", Identifier::single("id", 4i64));

    fx.cache.wrap(&order).set_value("total", 7i64).unwrap();

    assert!(!order.is_pending());
    assert_eq!(order.with(|o: &Order| o.total), Some(7));
}

#[test]
fn test_inverse_sync_materializes_pending_associated_entity() {
    let fx = Fixture::new();
    let order = order(1, 10);
    let pending = fx
        .persistence
        .get_reference("Item", Identifier::single("id", 8i64));

    fx.cache.wrap(&order).add_to_collection("items", &pending).unwrap();

    assert!(!pending.is_pending());
    assert_eq!(
        pending.with(|i: &Item| i.name.clone()),
        Some("item-8".to_string())
    );
    assert!(item_order(&pending).is_some_and(|o| o.ptr_eq(&order)));
    assert!(items_of(&order).contains(&pending));

    fx.cache.wrap(&order).remove_from_collection("items", &pending).unwrap();
    assert!(item_order(&pending).is_none());
}

#[test]
fn test_missing_pending_owner_fails_before_mutation() {
    let fx = Fixture::new();
    let order = fx
        .persistence
        .get_reference("Order", Identifier::single("id", 500i64));
    let pen = item(5, "pen");

    let err = fx
        .cache
        .wrap(&order)
        .add_to_collection("items", &pen)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(order.is_pending());
    assert!(item_order(&pen).is_none());
}
