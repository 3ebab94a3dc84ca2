//! Integration tests for subscription notification.

use serde_json::{json, Value};
use skein_cache::{Cache, Error, ReadResult, RecordKey, Selection, SubscriptionSpec, WriteOptions};
use std::cell::RefCell;
use std::rc::Rc;

fn selection(value: Value) -> Selection {
    Selection::from_json(value).unwrap()
}

fn viewer_selection() -> Selection {
    selection(json!({
        "fields": {
            "viewer": {
                "type": "User", "visible": true, "keyRaw": "viewer", "nullable": true,
                "selection": { "fields": {
                    "id": { "type": "ID", "visible": true, "keyRaw": "id" },
                    "firstName": { "type": "String", "visible": true, "keyRaw": "firstName" }
                }}
            }
        }
    }))
}

fn name_fragment() -> Selection {
    selection(json!({
        "fields": {
            "firstName": { "type": "String", "visible": true, "keyRaw": "firstName" }
        }
    }))
}

/// Collects every result delivered to a subscription.
fn recorder() -> (Rc<RefCell<Vec<ReadResult>>>, impl Fn(&ReadResult) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |result: &ReadResult| sink.borrow_mut().push(result.clone()))
}

fn rename(cache: &mut Cache, id: &str, name: &str) {
    cache
        .write_with(
            &name_fragment(),
            &json!({ "firstName": name }),
            WriteOptions::default().parent(RecordKey::entity("User", id)),
        )
        .unwrap();
}

#[test]
fn test_notified_after_write() {
    let mut cache = Cache::new();
    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));

    let data = json!({ "viewer": { "id": "1", "firstName": "bob" } });
    cache.write(&viewer_selection(), &data).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].data, Some(data));
    assert!(!seen[0].partial);
}

#[test]
fn test_idempotent_write_does_not_notify() {
    let mut cache = Cache::new();
    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));

    let data = json!({ "viewer": { "id": "1", "firstName": "bob" } });
    cache.write(&viewer_selection(), &data).unwrap();
    cache.write(&viewer_selection(), &data).unwrap();

    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_notification_order_follows_registration() {
    let mut cache = Cache::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut ids = Vec::new();
    for label in ["first", "second", "third"] {
        let log = log.clone();
        ids.push(cache.subscribe(SubscriptionSpec::new(viewer_selection(), move |_| {
            log.borrow_mut().push(label);
        })));
    }
    // Re-registering the first one puts it last
    cache.unsubscribe(ids[0]);
    let relog = log.clone();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), move |_| {
        relog.borrow_mut().push("fourth");
    }));

    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();

    assert_eq!(*log.borrow(), vec!["second", "third", "fourth"]);
}

#[test]
fn test_unrelated_write_does_not_notify() {
    let mut cache = Cache::new();
    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();

    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));

    rename(&mut cache, "2", "jane");
    assert!(seen.borrow().is_empty());

    rename(&mut cache, "1", "robert");
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let mut cache = Cache::new();
    let (seen, set) = recorder();
    let id = cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));
    assert_eq!(cache.subscription_count(), 1);

    assert!(cache.unsubscribe(id));
    assert!(!cache.unsubscribe(id));
    assert_eq!(cache.subscription_count(), 0);

    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_dependencies_follow_populated_link() {
    let mut cache = Cache::new();
    cache
        .write(&viewer_selection(), &json!({ "viewer": null }))
        .unwrap();

    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));

    // The link becomes populated: User:1 fields are now reachable
    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();
    assert_eq!(seen.borrow().len(), 1);

    rename(&mut cache, "1", "robert");
    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].pointer("/viewer/firstName"), Some(&json!("robert")));
}

#[test]
fn test_dependencies_drop_unreachable_records() {
    let mut cache = Cache::new();
    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();

    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));

    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "2", "firstName": "jane" } }))
        .unwrap();
    assert_eq!(seen.borrow().len(), 1);

    // User:1 is no longer read by the subscription
    rename(&mut cache, "1", "robert");
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_subscription_from_parent_record() {
    let mut cache = Cache::new();
    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();

    let (seen, set) = recorder();
    cache.subscribe(
        SubscriptionSpec::new(name_fragment(), set).parent(RecordKey::entity("User", "1")),
    );

    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "robert" } }))
        .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].data, Some(json!({ "firstName": "robert" })));
}

#[test]
fn test_subscription_variables() {
    let mut cache = Cache::new();
    let query = selection(json!({
        "fields": {
            "user": {
                "type": "User", "visible": true, "keyRaw": "user(id: $id)",
                "selection": { "fields": {
                    "id": { "type": "ID", "visible": true, "keyRaw": "id" },
                    "firstName": { "type": "String", "visible": true, "keyRaw": "firstName" }
                }}
            }
        }
    }));
    let variables = json!({ "id": "2" }).as_object().cloned().unwrap();

    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(query.clone(), set).variables(variables.clone()));

    // Same selection, different arguments: a different root field
    cache
        .write_with(
            &query,
            &json!({ "user": { "id": "3", "firstName": "sam" } }),
            WriteOptions::default().variables(json!({ "id": "3" }).as_object().cloned().unwrap()),
        )
        .unwrap();
    assert!(seen.borrow().is_empty());

    cache
        .write_with(
            &query,
            &json!({ "user": { "id": "2", "firstName": "jane" } }),
            WriteOptions::default().variables(variables),
        )
        .unwrap();
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].pointer("/user/firstName"), Some(&json!("jane")));
}

#[test]
fn test_delete_notifies_readers_of_record() {
    let mut cache = Cache::new();
    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();

    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));

    assert!(cache.delete(&RecordKey::entity("User", "1")));
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].partial);
}

#[test]
fn test_failed_write_leaves_store_and_notifies_nobody() {
    let mut cache = Cache::new();
    cache
        .write(&viewer_selection(), &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        .unwrap();

    let (seen, set) = recorder();
    cache.subscribe(SubscriptionSpec::new(viewer_selection(), set));
    let records = cache.store().len();

    let query = selection(json!({
        "fields": {
            "a_viewer": {
                "type": "User", "visible": true, "keyRaw": "viewer",
                "selection": { "fields": {
                    "id": { "type": "ID", "visible": true, "keyRaw": "id" },
                    "firstName": { "type": "String", "visible": true, "keyRaw": "firstName" }
                }}
            },
            "b_node": {
                "type": "Node", "visible": true, "keyRaw": "node", "abstract": true,
                "selection": { "fields": {
                    "id": { "type": "ID", "visible": true, "keyRaw": "id" }
                }}
            }
        }
    }));
    let err = cache
        .write(
            &query,
            &json!({ "a_viewer": { "id": "1", "firstName": "robert" }, "b_node": { "id": "9" } }),
        )
        .unwrap_err();

    assert_eq!(err, Error::missing_typename("node"));
    assert!(seen.borrow().is_empty());
    assert_eq!(cache.store().len(), records);
    assert!(cache.store().get_field(&RecordKey::root(), "node").is_none());
    let result = cache.read(&viewer_selection());
    assert_eq!(result.pointer("/viewer/firstName"), Some(&json!("bob")));
}
