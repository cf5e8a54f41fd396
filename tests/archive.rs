
use indexmap::IndexMap;

use bparchive::archive::ArchiveValue;
use bparchive::{archive, parse, unarchive, Error, Object, Uid};

fn string(value: &str) -> Object {
    Object::String(value.to_string())
}

/// Builds the bytes of a keyed archive from a hand-written `$objects` table
/// with the root at UID 1.
fn archive_bytes_with_objects(objects: Vec<Object>) -> Vec<u8> {
    let document = Object::Dictionary(vec![
        (string("$archiver"), string("NSKeyedArchiver")),
        (string("$objects"), Object::Array(objects)),
        (
            string("$top"),
            Object::Dictionary(vec![(string("root"), Object::Uid(Uid::new(1)))]),
        ),
        (string("$version"), Object::Integer(100000)),
    ]);
    bparchive::generate(&document).unwrap()
}

#[test]
fn test_roundtrip_simple_dictionary() {
    let mut entries = IndexMap::new();
    entries.insert("foo".to_string(), ArchiveValue::from("bar"));
    entries.insert(
        "some_array".to_string(),
        ArchiveValue::Array(vec![
            ArchiveValue::Integer(1),
            ArchiveValue::Integer(2),
            ArchiveValue::Integer(3),
            ArchiveValue::Integer(4),
        ]),
    );
    let value = ArchiveValue::Dictionary(entries);

    let data = archive(&value).unwrap();

    // The intermediate bplist carries the four schema entries.
    let document = parse(&data).unwrap();
    assert_eq!(document.get("$archiver"), Some(&string("NSKeyedArchiver")));
    assert_eq!(document.get("$version"), Some(&Object::Integer(100000)));
    assert!(document.get("$top").is_some());
    let objects = document.get("$objects").and_then(Object::as_array).unwrap();
    assert_eq!(objects[0], string("$null"));

    assert_eq!(unarchive(&data), Ok(value));
}

#[test]
fn test_roundtrip_primitives() {
    for value in vec![
        ArchiveValue::Boolean(true),
        ArchiveValue::Integer(-42),
        ArchiveValue::Real(2.5),
        ArchiveValue::from("text"),
        ArchiveValue::Data(vec![1, 2, 3]),
        ArchiveValue::Uid(Uid::new(12)),
    ] {
        let data = archive(&value).unwrap();
        assert_eq!(unarchive(&data), Ok(value));
    }
}

#[test]
fn test_roundtrip_date() {
    let value = ArchiveValue::Date(bparchive::Date::from_unix_time(978307200.0));
    let data = archive(&value).unwrap();

    // Dates archive as NSDate records carrying CFAbsoluteTime in NS.time.
    let document = parse(&data).unwrap();
    let objects = document.get("$objects").and_then(Object::as_array).unwrap();
    let record = objects[1].as_dictionary().unwrap();
    assert!(record.iter().any(|(key, value)| {
        key.as_str() == Some("NS.time") && value.as_real() == Some(0.0)
    }));

    assert_eq!(unarchive(&data), Ok(value));
}

#[test]
fn test_null_archives_as_uid_zero() {
    let data = archive(&ArchiveValue::Null).unwrap();

    let document = parse(&data).unwrap();
    let top = document.get("$top").unwrap();
    assert_eq!(top.get("root"), Some(&Object::Uid(Uid::new(0))));
    let objects = document.get("$objects").and_then(Object::as_array).unwrap();
    assert_eq!(objects[0], string("$null"));

    assert_eq!(unarchive(&data), Ok(ArchiveValue::Null));
}

#[test]
fn test_unknown_class_is_rejected_by_name() {
    let data = archive_bytes_with_objects(vec![
        string("$null"),
        Object::Dictionary(vec![
            (string("$class"), Object::Uid(Uid::new(2))),
            (string("first_property"), Object::Integer(1)),
        ]),
        Object::Dictionary(vec![
            (string("$classname"), string("UnregisteredGadget")),
            (string("$classes"), Object::Array(vec![string("UnregisteredGadget")])),
        ]),
    ]);
    assert_eq!(
        unarchive(&data),
        Err(Error::UnsupportedClass("UnregisteredGadget".to_string()))
    );
}

#[test]
fn test_ns_set_decodes_to_an_array() {
    let data = archive_bytes_with_objects(vec![
        string("$null"),
        Object::Dictionary(vec![
            (string("$class"), Object::Uid(Uid::new(2))),
            (
                string("NS.objects"),
                Object::Array(vec![Object::Uid(Uid::new(3)), Object::Uid(Uid::new(4))]),
            ),
        ]),
        Object::Dictionary(vec![
            (string("$classname"), string("NSSet")),
            (string("$classes"), Object::Array(vec![string("NSSet"), string("NSObject")])),
        ]),
        Object::Integer(1),
        Object::Integer(2),
    ]);
    assert_eq!(
        unarchive(&data),
        Ok(ArchiveValue::Array(vec![
            ArchiveValue::Integer(1),
            ArchiveValue::Integer(2),
        ]))
    );
}

#[test]
fn test_ns_string_record_decodes_to_a_string() {
    let data = archive_bytes_with_objects(vec![
        string("$null"),
        Object::Dictionary(vec![
            (string("$class"), Object::Uid(Uid::new(2))),
            (string("NS.string"), Object::Uid(Uid::new(3))),
        ]),
        Object::Dictionary(vec![
            (string("$classname"), string("NSMutableString")),
            (
                string("$classes"),
                Object::Array(vec![
                    string("NSMutableString"),
                    string("NSString"),
                    string("NSObject"),
                ]),
            ),
        ]),
        string("mutable contents"),
    ]);
    assert_eq!(unarchive(&data), Ok(ArchiveValue::from("mutable contents")));
}

#[test]
fn test_ns_uuid_decodes_to_its_bytes() {
    let uuid_bytes = (0u8 .. 16).collect::<Vec<u8>>();
    let data = archive_bytes_with_objects(vec![
        string("$null"),
        Object::Dictionary(vec![
            (string("$class"), Object::Uid(Uid::new(2))),
            (string("NS.uuidbytes"), Object::Data(uuid_bytes.clone())),
        ]),
        Object::Dictionary(vec![
            (string("$classname"), string("NSUUID")),
            (string("$classes"), Object::Array(vec![string("NSUUID"), string("NSObject")])),
        ]),
    ]);
    assert_eq!(unarchive(&data), Ok(ArchiveValue::Data(uuid_bytes)));
}

#[test]
fn test_uid_out_of_range_is_reported() {
    let data = archive_bytes_with_objects(vec![
        string("$null"),
        Object::Uid(Uid::new(9)),
    ]);
    // The stored value decodes, but a $top reference beyond the table fails.
    assert_eq!(unarchive(&data), Ok(ArchiveValue::Uid(Uid::new(9))));

    let document = Object::Dictionary(vec![
        (string("$archiver"), string("NSKeyedArchiver")),
        (string("$objects"), Object::Array(vec![string("$null")])),
        (
            string("$top"),
            Object::Dictionary(vec![(string("root"), Object::Uid(Uid::new(5)))]),
        ),
        (string("$version"), Object::Integer(100000)),
    ]);
    let data = bparchive::generate(&document).unwrap();
    assert_eq!(unarchive(&data), Err(Error::UidOutOfRange { uid: 5, count: 1 }));
}
