//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

mod writer;

use serde::ser;

use crate::de::{date, uid};
use crate::error::{Error, Result};
use crate::object::{Date, Dictionary, Object, Uid};

/// Support for serializing any supported type into a binary property list document.
pub fn to_bytes<T>(value: &T) -> Result<Vec<u8>>
where
    T: ser::Serialize,
{
    let object = value.serialize(Serializer)?;
    writer::to_bytes(&object)
}

/// Serializes an object tree directly, without a pass through serde.
pub fn generate(object: &Object) -> Result<Vec<u8>> {
    writer::to_bytes(object)
}

/// A serde serializer producing an [`Object`] tree, which the document writer
/// then lays out as bplist00 bytes.
///
/// The two bplist types without a serde analogue, `Date` and `Uid`, arrive
/// here as pseudo-structures with magic names and are intercepted by
/// `serialize_struct`; any other structure becomes a dictionary keyed by its
/// field names.
pub struct Serializer;

impl ser::Serializer for Serializer {
    type Ok = Object;
    type Error = Error;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = SerializeVariantArray;
    type SerializeMap = SerializeDictionary;
    type SerializeStruct = SerializeStructure;
    type SerializeStructVariant = SerializeVariantDictionary;

    fn serialize_bool(self, value: bool) -> Result<Object> {
        Ok(Object::Boolean(value))
    }

    fn serialize_i8(self, value: i8) -> Result<Object> {
        self.serialize_i64(value as i64)
    }

    fn serialize_i16(self, value: i16) -> Result<Object> {
        self.serialize_i64(value as i64)
    }

    fn serialize_i32(self, value: i32) -> Result<Object> {
        self.serialize_i64(value as i64)
    }

    fn serialize_i64(self, value: i64) -> Result<Object> {
        Ok(Object::Integer(value))
    }

    fn serialize_u8(self, value: u8) -> Result<Object> {
        self.serialize_i64(value as i64)
    }

    fn serialize_u16(self, value: u16) -> Result<Object> {
        self.serialize_i64(value as i64)
    }

    fn serialize_u32(self, value: u32) -> Result<Object> {
        self.serialize_i64(value as i64)
    }

    fn serialize_u64(self, value: u64) -> Result<Object> {
        if value <= i64::max_value() as u64 {
            Ok(Object::Integer(value as i64))
        } else {
            Err(Error::UnsupportedType("u64 value beyond 63 bits"))
        }
    }

    fn serialize_f32(self, value: f32) -> Result<Object> {
        self.serialize_f64(value as f64)
    }

    fn serialize_f64(self, value: f64) -> Result<Object> {
        Ok(Object::Real(value.into()))
    }

    fn serialize_char(self, value: char) -> Result<Object> {
        Ok(Object::String(value.to_string()))
    }

    fn serialize_str(self, value: &str) -> Result<Object> {
        Ok(Object::String(value.to_string()))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Object> {
        Ok(Object::Data(value.to_vec()))
    }

    fn serialize_none(self) -> Result<Object> {
        Err(Error::UnsupportedType("None"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Object>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Object> {
        Err(Error::UnsupportedType("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Object> {
        Err(Error::UnsupportedType("unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Object> {
        Ok(Object::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Object>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Object>
    where
        T: ?Sized + ser::Serialize,
    {
        let value = value.serialize(Serializer)?;
        Ok(Object::Dictionary(vec![
            (Object::String(variant.to_string()), value),
        ]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeArray> {
        Ok(SerializeArray {
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeArray> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeArray> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVariantArray> {
        Ok(SerializeVariantArray {
            variant,
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeDictionary> {
        Ok(SerializeDictionary {
            entries: Dictionary::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<SerializeStructure> {
        // The Date and Uid pseudo-structures are reconstituted as wire types.
        if name == date::STRUCT_NAME {
            Ok(SerializeStructure::Date(None))
        } else if name == uid::STRUCT_NAME {
            Ok(SerializeStructure::Uid(None))
        } else {
            Ok(SerializeStructure::Dictionary(Dictionary::with_capacity(len)))
        }
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVariantDictionary> {
        Ok(SerializeVariantDictionary {
            variant,
            entries: Dictionary::with_capacity(len),
        })
    }
}

pub struct SerializeArray {
    elements: Vec<Object>,
}

impl ser::SerializeSeq for SerializeArray {
    type Ok = Object;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        self.elements.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Object> {
        Ok(Object::Array(self.elements))
    }
}

impl ser::SerializeTuple for SerializeArray {
    type Ok = Object;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Object> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeArray {
    type Ok = Object;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Object> {
        ser::SerializeSeq::end(self)
    }
}

pub struct SerializeVariantArray {
    variant: &'static str,
    elements: Vec<Object>,
}

impl ser::SerializeTupleVariant for SerializeVariantArray {
    type Ok = Object;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        self.elements.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Object> {
        Ok(Object::Dictionary(vec![
            (Object::String(self.variant.to_string()), Object::Array(self.elements)),
        ]))
    }
}

pub struct SerializeDictionary {
    entries: Dictionary,
    pending_key: Option<Object>,
}

impl ser::SerializeMap for SerializeDictionary {
    type Ok = Object;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        self.pending_key = Some(key.serialize(Serializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        let key = self.pending_key.take()
            .ok_or(Error::Message("serialize_value called before serialize_key".to_string()))?;
        self.entries.push((key, value.serialize(Serializer)?));
        Ok(())
    }

    fn end(self) -> Result<Object> {
        Ok(Object::Dictionary(self.entries))
    }
}

pub enum SerializeStructure {
    /// Capturing the seconds field of the Date pseudo-structure.
    Date(Option<f64>),
    /// Capturing the value field of the Uid pseudo-structure.
    Uid(Option<u64>),
    /// An ordinary structure serialized as a dictionary of its fields.
    Dictionary(Dictionary),
}

impl ser::SerializeStruct for SerializeStructure {
    type Ok = Object;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        match self {
            SerializeStructure::Date(slot) => {
                if key != date::STRUCT_FIELD {
                    return Err(Error::Message("unexpected field in date structure".to_string()));
                }
                match value.serialize(Serializer)? {
                    Object::Real(seconds) => *slot = Some(seconds.0),
                    _ => return Err(Error::Message("date field must be a double".to_string())),
                }
            }
            SerializeStructure::Uid(slot) => {
                if key != uid::STRUCT_FIELD {
                    return Err(Error::Message("unexpected field in uid structure".to_string()));
                }
                match value.serialize(Serializer)? {
                    Object::Integer(id) if id >= 0 => *slot = Some(id as u64),
                    _ => return Err(Error::Message("uid field must be a non-negative integer".to_string())),
                }
            }
            SerializeStructure::Dictionary(entries) => {
                entries.push((Object::String(key.to_string()), value.serialize(Serializer)?));
            }
        }
        Ok(())
    }

    fn end(self) -> Result<Object> {
        match self {
            SerializeStructure::Date(Some(seconds)) =>
                Ok(Object::Date(Date::from_unix_time(seconds))),
            SerializeStructure::Uid(Some(value)) =>
                Ok(Object::Uid(Uid::new(value))),
            SerializeStructure::Date(None) | SerializeStructure::Uid(None) =>
                Err(Error::Message("pseudo-structure ended before its field".to_string())),
            SerializeStructure::Dictionary(entries) =>
                Ok(Object::Dictionary(entries)),
        }
    }
}

pub struct SerializeVariantDictionary {
    variant: &'static str,
    entries: Dictionary,
}

impl ser::SerializeStructVariant for SerializeVariantDictionary {
    type Ok = Object;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + ser::Serialize,
    {
        self.entries.push((Object::String(key.to_string()), value.serialize(Serializer)?));
        Ok(())
    }

    fn end(self) -> Result<Object> {
        Ok(Object::Dictionary(vec![
            (Object::String(self.variant.to_string()), Object::Dictionary(self.entries)),
        ]))
    }
}
