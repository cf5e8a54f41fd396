//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The bplist object model.
//!
//! The bplist format version 00 supports the following object kinds:
//!
//! 1. Boolean.
//! 2. Integers, up to 64 bits long.
//! 3. Real, single- and double-precision.
//! 4. Data.
//! 5. Date.
//! 6. String.
//! 7. Uid.
//! 8. Array.
//! 9. Dictionary.
//!
//! # References
//!
//! 1. https://github.com/opensource-apple/CF/blob/master/ForFoundationOnly.h
//! 2. https://opensource.apple.com/source/CF/CF-855.17/CFBinaryPList.c

/// Seconds between the Unix epoch (1 January 1970, 00:00:00 UTC) and the
/// Core Data epoch (1 January 2001, 00:00:00 UTC). Dates are stored on the
/// wire relative to the Core Data epoch.
pub const COCOA_EPOCH_OFFSET: f64 = 978_307_200.0;

/// A date structure roughly equivalent to an `NSDate`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Date {
    /// A double-precision 64-bit offset, in seconds, from the Unix epoch.
    pub unix_time: ordered_float::OrderedFloat<f64>,
}

impl Date {
    /// Creates a date from seconds since the Unix epoch.
    pub fn from_unix_time(seconds: f64) -> Date {
        Date { unix_time: seconds.into() }
    }

    /// Creates a date from a CFAbsoluteTime, that is seconds since the
    /// Core Data epoch. This is the representation used on the wire.
    pub fn from_absolute_time(seconds: f64) -> Date {
        Date { unix_time: (seconds + COCOA_EPOCH_OFFSET).into() }
    }

    /// The CFAbsoluteTime equivalent of the receiver.
    pub fn absolute_time(&self) -> f64 {
        self.unix_time.0 - COCOA_EPOCH_OFFSET
    }
}

/// A UID structure holding a non-negative integer identifier.
///
/// UIDs are emitted by `NSKeyedArchiver` as references into its object table.
/// They are deliberately a distinct type: a UID and an integer of the same
/// value never compare equal and never substitute for one another.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Uid {
    /// The identifier value.
    pub value: u64,
}

impl Uid {
    /// Creates a UID with the given value.
    pub fn new(value: u64) -> Uid {
        Uid { value }
    }
}

/// An array of objects roughly equivalent to an `NSArray`.
pub type Array = Vec<Object>;

/// Key-value pairs in document order, roughly equivalent to an `NSDictionary`.
///
/// Dictionaries are kept as pair lists rather than as a map so that the order
/// in which entries appear in a document survives a round-trip unchanged.
/// Keys are arbitrary objects on the wire, in practice always strings.
pub type Dictionary = Vec<(Object, Object)>;

/// Represents any valid bplist object.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Object {
    /// Represents a bplist boolean, like `NSNumber`.
    Boolean(bool),

    /// Represents a bplist integral value of up to 64 bits, like `NSNumber`.
    Integer(i64),

    /// Represents a bplist floating-point value, like `NSNumber`.
    ///
    /// Unlike normal `f64` values, these values have a defined order, implementing
    /// `Ord`, `Eq` and `Hash` in addition to `PartialOrd` and `PartialEq`.
    /// This allows them to be used as keys and values in Dictionaries.
    Real(ordered_float::OrderedFloat<f64>),

    /// Represents a bplist data instance, like `NSData`.
    Data(Vec<u8>),

    /// Represents a bplist date, like `NSDate`.
    ///
    /// Dates are held as seconds since the Unix epoch and converted to and
    /// from the on-wire CFAbsoluteTime representation at the document
    /// boundary. As serde does not have a built-in date type, this is treated
    /// as a custom type and deserialized as a structure.
    Date(Date),

    /// Represents a bplist UID value.
    ///
    /// This is a custom type and is deserialized as a structure.
    Uid(Uid),

    /// Represents a bplist string, like `NSString`.
    String(String),

    /// Represents a bplist array of objects, like `NSArray<id>`.
    Array(Array),

    /// Represents a bplist dictionary, like `NSDictionary<id,id>`.
    Dictionary(Dictionary),
}

impl Object {
    /// Returns the boolean value of the receiver, if it is one.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Object::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer value of the receiver, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the floating-point value of the receiver, if it is one.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(value) => Some(value.0),
            _ => None,
        }
    }

    /// Returns the string contents of the receiver, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the bytes of the receiver, if it is a data object.
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Object::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the date value of the receiver, if it is one.
    pub fn as_date(&self) -> Option<Date> {
        match self {
            Object::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the UID value of the receiver, if it is one.
    pub fn as_uid(&self) -> Option<Uid> {
        match self {
            Object::Uid(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the elements of the receiver, if it is an array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the entries of the receiver, if it is a dictionary.
    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up the value stored under a string key, if the receiver is a
    /// dictionary containing one.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.as_dictionary().and_then(|entries| {
            entries
                .iter()
                .find(|(entry_key, _)| entry_key.as_str() == Some(key))
                .map(|(_, value)| value)
        })
    }
}

mod de;
mod ser;
