
use bparchive::{generate, parse, Date, Object, Uid};

fn roundtrip(object: Object) {
    let document = generate(&object).unwrap();
    assert!(document.starts_with(b"bplist00"));
    assert!(document.len() >= 40);
    assert_eq!(parse(&document), Ok(object));
}

#[test]
fn test_roundtrip_booleans() {
    roundtrip(Object::Boolean(false));
    roundtrip(Object::Boolean(true));
}

#[test]
fn test_roundtrip_integer_boundaries() {
    let values = [
        i64::min_value(),
        -1,
        0,
        127,
        128,
        255,
        256,
        65535,
        65536,
        (1i64 << 31) - 1,
        i64::max_value(),
    ];
    for &value in &values {
        roundtrip(Object::Integer(value));
    }
}

#[test]
fn test_roundtrip_reals() {
    roundtrip(Object::Real(0.0.into()));
    roundtrip(Object::Real((-2.5).into()));
    roundtrip(Object::Real(40.1328125.into()));
}

#[test]
fn test_roundtrip_strings() {
    // Empty, inline-length ASCII, extended-length ASCII, single non-ASCII
    // code point and a surrogate-pair code point.
    roundtrip(Object::String(String::new()));
    roundtrip(Object::String("0123456789abcd".to_string()));
    roundtrip(Object::String("0123456789abcde".to_string()));
    roundtrip(Object::String("\u{00E9}".to_string()));
    roundtrip(Object::String("\u{1F600}".to_string()));
}

#[test]
fn test_roundtrip_data() {
    roundtrip(Object::Data(Vec::new()));
    roundtrip(Object::Data((0u8 .. 14).collect()));
    roundtrip(Object::Data((0u8 .. 15).collect()));
}

#[test]
fn test_roundtrip_dates() {
    // The Core Data epoch, the Unix epoch, and a date far in the future.
    roundtrip(Object::Date(Date::from_absolute_time(0.0)));
    roundtrip(Object::Date(Date::from_unix_time(0.0)));
    roundtrip(Object::Date(Date::from_unix_time(4102444800.0)));
}

#[test]
fn test_uid_and_integer_stay_distinct() {
    let document = generate(&Object::Uid(Uid::new(7))).unwrap();
    let decoded = parse(&document).unwrap();
    assert_eq!(decoded, Object::Uid(Uid::new(7)));
    assert_ne!(decoded, Object::Integer(7));
}

#[test]
fn test_date_and_real_stay_distinct() {
    let date = Date::from_unix_time(978307200.0);
    let document = generate(&Object::Date(date)).unwrap();
    let decoded = parse(&document).unwrap();
    assert_eq!(decoded, Object::Date(date));
    assert_ne!(decoded, Object::Real(978307200.0.into()));
}

#[test]
fn test_roundtrip_collection_length_boundaries() {
    roundtrip(Object::Array(vec![Object::Integer(1); 14]));
    roundtrip(Object::Array(vec![Object::Integer(1); 15]));

    let fourteen = (0 .. 14)
        .map(|i| (Object::String(format!("k{}", i)), Object::Integer(i)))
        .collect::<Vec<_>>();
    roundtrip(Object::Dictionary(fourteen));

    let fifteen = (0 .. 15)
        .map(|i| (Object::String(format!("k{}", i)), Object::Integer(i)))
        .collect::<Vec<_>>();
    roundtrip(Object::Dictionary(fifteen));
}

#[test]
fn test_roundtrip_preserves_dictionary_order() {
    let object = Object::Dictionary(vec![
        (Object::String("zulu".to_string()), Object::Integer(1)),
        (Object::String("alpha".to_string()), Object::Integer(2)),
        (Object::String("mike".to_string()), Object::Integer(3)),
    ]);
    roundtrip(object);
}

#[test]
fn test_roundtrip_nested_structure() {
    roundtrip(Object::Dictionary(vec![
        (
            Object::String("values".to_string()),
            Object::Array(vec![
                Object::Integer(1),
                Object::Real(2.5.into()),
                Object::String("three".to_string()),
                Object::Array(vec![Object::Boolean(true)]),
            ]),
        ),
        (
            Object::String("blob".to_string()),
            Object::Data(vec![0xDE, 0xAD, 0xBE, 0xEF]),
        ),
    ]));
}

#[test]
fn test_parse_rejects_self_referential_array() {
    // A hand-built document whose only object is an array containing itself.
    let document = [
        // Header.
        0x62, 0x70, 0x6C, 0x69, 0x73, 0x74, 0x30, 0x30,
        // Array of one element referencing object 0.
        0xA1, 0x00,
        // Offset table.
        0x08,
        // Trailer.
        0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
        0x01,
        0x01,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A,
    ];
    assert_eq!(parse(&document), Err(bparchive::Error::CycleDetected));
}

#[test]
fn test_parse_rejects_truncated_input() {
    let document = generate(&Object::Integer(1)).unwrap();
    assert!(parse(&document[.. document.len() - 1]).is_err());
    assert!(parse(b"bplist00").is_err());
}

#[test]
fn test_parse_rejects_bad_magic() {
    let mut document = generate(&Object::Integer(1)).unwrap();
    document[0] = b'x';
    assert_eq!(parse(&document), Err(bparchive::Error::MissingOrInvalidHeader));
}
