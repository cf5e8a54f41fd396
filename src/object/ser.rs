//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use serde::ser::{self, SerializeMap, SerializeSeq, SerializeStruct};

use crate::de::{date, uid};
use crate::object::{Date, Object, Uid};

/// Serialization of bplist objects mirrors their deserialization: every
/// variant maps onto the corresponding serde data-model type, with `Date` and
/// `Uid` expressed as single-field pseudo-structures with magic names. Any
/// serde format can therefore serialize an `Object`, but only the bplist
/// serializer reconstitutes dates and UIDs as native wire types.
impl ser::Serialize for Object {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Object::Boolean(value) =>
                serializer.serialize_bool(*value),
            Object::Integer(value) =>
                serializer.serialize_i64(*value),
            Object::Real(value) =>
                serializer.serialize_f64(value.0),
            Object::Data(value) =>
                serializer.serialize_bytes(value),
            Object::Date(value) =>
                value.serialize(serializer),
            Object::Uid(value) =>
                value.serialize(serializer),
            Object::String(value) =>
                serializer.serialize_str(value),
            Object::Array(elements) => {
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Object::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Custom serializer for the Date pseudo-structure.
impl ser::Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut structure = serializer.serialize_struct(date::STRUCT_NAME, 1)?;
        structure.serialize_field(date::STRUCT_FIELD, &self.unix_time.0)?;
        structure.end()
    }
}

/// Custom serializer for the UID pseudo-structure.
impl ser::Serialize for Uid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut structure = serializer.serialize_struct(uid::STRUCT_NAME, 1)?;
        structure.serialize_field(uid::STRUCT_FIELD, &self.value)?;
        structure.end()
    }
}
