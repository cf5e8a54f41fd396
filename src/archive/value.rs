//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The host-side value domain of a keyed archive.
//!
//! Where the bplist [`Object`](crate::Object) mirrors the wire format, an
//! [`ArchiveValue`] mirrors the object graph an application works with:
//! UID indirection is resolved away, `NS*` container classes are replaced
//! with native collections, and instances of registered custom classes
//! surface as shared [`Instance`] handles. Sharing is expressed through
//! `Arc`, so a subtree referenced from two places decodes to one allocation
//! and archives back to one record.

use indexmap::IndexMap;

use std::sync::Arc;

use crate::object::{Date, Uid};

/// Any value which can appear in a decoded keyed archive.
#[derive(Clone, Debug, PartialEq)]
pub enum ArchiveValue {
    /// The null sentinel, written as UID zero.
    Null,
    /// A boolean value.
    Boolean(bool),
    /// An integer value of up to 64 bits.
    Integer(i64),
    /// A double-precision floating-point value.
    Real(f64),
    /// A text string.
    String(String),
    /// An arbitrary sequence of bytes.
    Data(Vec<u8>),
    /// A date. Archived as an `NSDate` record.
    Date(Date),
    /// A UID carried as an application-level value, distinct from the UIDs
    /// the archive itself uses for cross-references.
    Uid(Uid),
    /// An ordered collection. Archived as an `NSArray` record.
    Array(Vec<ArchiveValue>),
    /// A string-keyed mapping with insertion order preserved.
    /// Archived as an `NSDictionary` record.
    Dictionary(IndexMap<String, ArchiveValue>),
    /// An instance of a registered custom class. The handle is shared;
    /// `Arc::ptr_eq` distinguishes two references to one object from two
    /// equal but distinct objects.
    Instance(Arc<Instance>),
}

impl ArchiveValue {
    /// Returns true if the receiver is the null sentinel.
    pub fn is_null(&self) -> bool {
        *self == ArchiveValue::Null
    }

    /// Returns the boolean value of the receiver, if it is one.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            ArchiveValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer value of the receiver, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ArchiveValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the floating-point value of the receiver, if it is one.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            ArchiveValue::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string contents of the receiver, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArchiveValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the bytes of the receiver, if it is a data value.
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            ArchiveValue::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the date value of the receiver, if it is one.
    pub fn as_date(&self) -> Option<Date> {
        match self {
            ArchiveValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the elements of the receiver, if it is an array.
    pub fn as_array(&self) -> Option<&[ArchiveValue]> {
        match self {
            ArchiveValue::Array(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the entries of the receiver, if it is a dictionary.
    pub fn as_dictionary(&self) -> Option<&IndexMap<String, ArchiveValue>> {
        match self {
            ArchiveValue::Dictionary(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the instance handle of the receiver, if it is one.
    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            ArchiveValue::Instance(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for ArchiveValue {
    fn from(value: bool) -> ArchiveValue {
        ArchiveValue::Boolean(value)
    }
}

impl From<i64> for ArchiveValue {
    fn from(value: i64) -> ArchiveValue {
        ArchiveValue::Integer(value)
    }
}

impl From<f64> for ArchiveValue {
    fn from(value: f64) -> ArchiveValue {
        ArchiveValue::Real(value)
    }
}

impl From<&str> for ArchiveValue {
    fn from(value: &str) -> ArchiveValue {
        ArchiveValue::String(value.to_string())
    }
}

impl From<String> for ArchiveValue {
    fn from(value: String) -> ArchiveValue {
        ArchiveValue::String(value)
    }
}

impl From<Vec<u8>> for ArchiveValue {
    fn from(value: Vec<u8>) -> ArchiveValue {
        ArchiveValue::Data(value)
    }
}

impl From<Date> for ArchiveValue {
    fn from(value: Date) -> ArchiveValue {
        ArchiveValue::Date(value)
    }
}

impl From<Vec<ArchiveValue>> for ArchiveValue {
    fn from(value: Vec<ArchiveValue>) -> ArchiveValue {
        ArchiveValue::Array(value)
    }
}

impl From<Instance> for ArchiveValue {
    fn from(value: Instance) -> ArchiveValue {
        ArchiveValue::Instance(Arc::new(value))
    }
}

impl From<Arc<Instance>> for ArchiveValue {
    fn from(value: Arc<Instance>) -> ArchiveValue {
        ArchiveValue::Instance(value)
    }
}

/// An instance of a custom archived class: a Cocoa class name plus an
/// ordered collection of named field values.
///
/// Instances are immutable once wrapped in an [`ArchiveValue`]; build the
/// field set first, then share the instance through `Arc` as needed.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    class_name: String,
    fields: IndexMap<String, ArchiveValue>,
}

impl Instance {
    /// Creates an instance of the named class with no fields.
    pub fn new(class_name: impl Into<String>) -> Instance {
        Instance {
            class_name: class_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field, consuming and returning the instance for chaining.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<ArchiveValue>) -> Instance {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a field in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ArchiveValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// The Cocoa class this instance belongs to.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the value of the named field, if present.
    pub fn get(&self, name: &str) -> Option<&ArchiveValue> {
        self.fields.get(name)
    }

    /// The full field map in declaration order.
    pub fn fields(&self) -> &IndexMap<String, ArchiveValue> {
        &self.fields
    }
}
