
use std::sync::Arc;

use bparchive::archive::{
    register, ArchiveValue, FieldKind, FieldSpec, Instance, RecordAdapter,
};
use bparchive::{archive, parse, unarchive, Error, Object};

#[test]
fn test_registered_class_roundtrip() {
    register(
        "MyCocoaClass",
        Arc::new(RecordAdapter::new("MyCocoaClass", vec![
            FieldSpec::new("first_property", FieldKind::String),
            FieldSpec::new("second_property", FieldKind::Integer),
        ])),
    );

    let value = ArchiveValue::from(
        Instance::new("MyCocoaClass")
            .field("first_property", "a")
            .field("second_property", 42i64),
    );
    let data = archive(&value).unwrap();
    assert_eq!(unarchive(&data), Ok(value));
}

#[test]
fn test_shared_instance_stays_shared() {
    register(
        "SharedWidget",
        Arc::new(RecordAdapter::new("SharedWidget", vec![
            FieldSpec::new("name", FieldKind::String),
        ])),
    );

    let shared = Arc::new(Instance::new("SharedWidget").field("name", "only one"));
    let value = ArchiveValue::Array(vec![
        ArchiveValue::from(Arc::clone(&shared)),
        ArchiveValue::from(shared),
    ]);

    let data = archive(&value).unwrap();

    // One record serves both references: null, the array record and its
    // class record, the instance and its class record, and the name string.
    let document = parse(&data).unwrap();
    let objects = document.get("$objects").and_then(Object::as_array).unwrap();
    assert_eq!(objects.len(), 6);

    // After the round-trip the two elements are one object, not two copies.
    let decoded = unarchive(&data).unwrap();
    let elements = decoded.as_array().unwrap();
    let first = elements[0].as_instance().unwrap();
    let second = elements[1].as_instance().unwrap();
    assert!(Arc::ptr_eq(first, second));
    assert_eq!(first.get("name"), Some(&ArchiveValue::from("only one")));
}

#[test]
fn test_absent_field_decodes_to_its_default() {
    // Archive with an adapter that only knows the name field, then decode
    // with one that also declares a defaulted count. Re-registration under
    // the same name replaces the adapter silently.
    register(
        "DefaultedWidget",
        Arc::new(RecordAdapter::new("DefaultedWidget", vec![
            FieldSpec::new("name", FieldKind::String),
        ])),
    );
    let data = archive(&ArchiveValue::from(
        Instance::new("DefaultedWidget").field("name", "gizmo"),
    ))
    .unwrap();

    register(
        "DefaultedWidget",
        Arc::new(RecordAdapter::new("DefaultedWidget", vec![
            FieldSpec::new("name", FieldKind::String),
            FieldSpec::new("count", FieldKind::Integer).with_default(0i64),
        ])),
    );
    let decoded = unarchive(&data).unwrap();
    let instance = decoded.as_instance().unwrap();
    assert_eq!(instance.get("name"), Some(&ArchiveValue::from("gizmo")));
    assert_eq!(instance.get("count"), Some(&ArchiveValue::Integer(0)));
}

#[test]
fn test_absent_field_without_default_is_malformed() {
    register(
        "StrictWidgetEncoder",
        Arc::new(RecordAdapter::new("StrictWidgetEncoder", vec![])),
    );
    let data = archive(&ArchiveValue::from(Instance::new("StrictWidgetEncoder"))).unwrap();

    register(
        "StrictWidgetEncoder",
        Arc::new(RecordAdapter::new("StrictWidgetEncoder", vec![
            FieldSpec::new("required", FieldKind::Any),
        ])),
    );
    match unarchive(&data) {
        Err(Error::MalformedClassRecord(_)) => (),
        other => panic!("expected a malformed class record error, got {:?}", other),
    }
}

#[test]
fn test_unregistered_instance_cannot_archive() {
    let value = ArchiveValue::from(Instance::new("NeverRegisteredWidget"));
    assert_eq!(
        archive(&value),
        Err(Error::UnsupportedClass("NeverRegisteredWidget".to_string()))
    );
}

#[test]
fn test_null_field_roundtrip() {
    register(
        "NullableWidget",
        Arc::new(RecordAdapter::new("NullableWidget", vec![
            FieldSpec::new("payload", FieldKind::Any),
        ])),
    );

    let value = ArchiveValue::from(
        Instance::new("NullableWidget").field("payload", ArchiveValue::Null),
    );
    let data = archive(&value).unwrap();

    // Null fields are stored as UID zero.
    let document = parse(&data).unwrap();
    let objects = document.get("$objects").and_then(Object::as_array).unwrap();
    let record = objects[1].as_dictionary().unwrap();
    assert!(record.iter().any(|(key, stored)| {
        key.as_str() == Some("payload")
            && stored.as_uid().map(|uid| uid.value) == Some(0)
    }));

    assert_eq!(unarchive(&data), Ok(value));
}

#[test]
fn test_self_referential_record_is_rejected() {
    register(
        "SelfLoopWidget",
        Arc::new(RecordAdapter::new("SelfLoopWidget", vec![
            FieldSpec::new("next", FieldKind::Any),
        ])),
    );

    let document = Object::Dictionary(vec![
        (Object::String("$archiver".to_string()), Object::String("NSKeyedArchiver".to_string())),
        (
            Object::String("$objects".to_string()),
            Object::Array(vec![
                Object::String("$null".to_string()),
                Object::Dictionary(vec![
                    (Object::String("$class".to_string()), Object::Uid(bparchive::Uid::new(2))),
                    (Object::String("next".to_string()), Object::Uid(bparchive::Uid::new(1))),
                ]),
                Object::Dictionary(vec![
                    (Object::String("$classname".to_string()), Object::String("SelfLoopWidget".to_string())),
                    (
                        Object::String("$classes".to_string()),
                        Object::Array(vec![Object::String("SelfLoopWidget".to_string())]),
                    ),
                ]),
            ]),
        ),
        (
            Object::String("$top".to_string()),
            Object::Dictionary(vec![
                (Object::String("root".to_string()), Object::Uid(bparchive::Uid::new(1))),
            ]),
        ),
        (Object::String("$version".to_string()), Object::Integer(100000)),
    ]);
    let data = bparchive::generate(&document).unwrap();
    assert_eq!(unarchive(&data), Err(Error::CircularReferenceUnresolvable(1)));
}
