//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std;
use std::fmt::{self, Display};

use serde::{de, ser};

pub type Result<T> = std::result::Result<T, Error>;

/// Binary property list and keyed archive serialization and deserialization error.
///
/// Every failure path in the crate reports through this type; no operation
/// produces a partial result. Variants carry the offending offset, object
/// index or class name where one is known.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Constructed from serialization and deserialization errors.
    Message(String),
    /// The bplist magic number and version marker is missing or invalid.
    MissingOrInvalidHeader,
    /// The offset table used determine the location of objects in the object table is missing or invalid.
    MissingOrInvalidOffsetTable,
    /// The trailer with the metadata necessary to interpret the offset table and object table is missing or invalid.
    MissingOrInvalidTrailer,
    /// The version number in the header is not one of the versions supported by this library.
    UnsupportedVersion,
    /// Encountered a reference to an object not in the offset table.
    InvalidObjectReference(usize),
    /// Encountered an offset pointing outside of the object table.
    InvalidOffsetToObject(usize),
    /// Encountered a marker byte for an object format not supported by this library.
    InvalidOrUnsupportedObjectFormat(usize),
    /// The root object in the trailer is not in the offset table.
    InvalidRootObject(usize),
    /// The object at the given index was expected to be a valid boolean, but parsing it failed.
    ExpectedBool(usize),
    /// The object at the given index was expected to be a valid fill byte, but parsing it failed.
    ExpectedFill(usize),
    /// The object at the given index was expected to be a valid 8-bit unsigned integer, but parsing it failed.
    ExpectedUInt8(usize),
    /// The object at the given index was expected to be a valid 16-bit unsigned integer, but parsing it failed.
    ExpectedUInt16(usize),
    /// The object at the given index was expected to be a valid 32-bit unsigned integer, but parsing it failed.
    ExpectedUInt32(usize),
    /// The object at the given index was expected to be a valid 64-bit signed integer, but parsing it failed.
    ExpectedSInt64(usize),
    /// The object at the given index was expected to be a valid 32-bit single-precision floating point value.
    ExpectedFloat32(usize),
    /// The object at the given index was expected to be a valid 64-bit double-precision floating point value.
    ExpectedFloat64(usize),
    /// The object at the given index was expected to be a valid array, but parsing it failed.
    ExpectedArray(usize),
    /// The object at the given index was expected to be a valid date object, but parsing it failed.
    ExpectedDate(usize),
    /// The object at the given index was expected to be a valid data buffer, but parsing it failed.
    ExpectedData(usize),
    /// The object at the given index was expected to be a valid ASCII string, but parsing it failed.
    ExpectedAsciiString(usize),
    /// The object at the given index was expected to be a valid UTF-16 string, but parsing it failed.
    ExpectedUtf16String(usize),
    /// The object at the given index was expected to be a valid UID value, but parsing it failed.
    ExpectedUid(usize),
    /// The object at the given index was expected to be a valid dictionary, but parsing it failed.
    ExpectedDictionary(usize),
    /// Containers in a binary property list form a directed acyclic graph and cannot reference each other.
    CycleDetected,
    /// Prematurely reached the end of the file.
    Eof,
    /// The generator received a value it cannot express in the bplist format.
    UnsupportedType(&'static str),
    /// An object count or byte size exceeds what the chosen field widths can express.
    Overflow(&'static str),
    /// The `$archiver` entry is missing or names an archiver other than `NSKeyedArchiver`.
    MissingArchiverHeader,
    /// The `$version` entry holds an unsupported archive version.
    InvalidVersion(i64),
    /// The archive is structurally invalid in the named way.
    SchemaViolation(&'static str),
    /// A UID does not index into the `$objects` table.
    UidOutOfRange { uid: u64, count: usize },
    /// A `$class` entry or class record is missing or malformed.
    MalformedClassRecord(String),
    /// The named class has no built-in handler and no registered adapter.
    UnsupportedClass(String),
    /// A decoder required an object that is still being constructed.
    CircularReferenceUnresolvable(u64),
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(msg) =>
                formatter.write_str(msg),
            Error::MissingOrInvalidHeader =>
                formatter.write_str("missing or invalid bplist header"),
            Error::MissingOrInvalidOffsetTable =>
                formatter.write_str("missing or invalid bplist offset table"),
            Error::MissingOrInvalidTrailer =>
                formatter.write_str("missing or invalid bplist trailer"),
            Error::UnsupportedVersion =>
                formatter.write_str("document is not a version (0,0) bplist"),
            Error::InvalidObjectReference(object) =>
                write!(formatter, "invalid reference to object {} not in offset table", object),
            Error::InvalidOffsetToObject(offset) =>
                write!(formatter, "offset {} points outside of the object table", offset),
            Error::InvalidOrUnsupportedObjectFormat(object) =>
                write!(formatter, "invalid or unsupported object format at object {}", object),
            Error::InvalidRootObject(object) =>
                write!(formatter, "invalid root object {} in document metadata", object),
            Error::ExpectedBool(object) =>
                write!(formatter, "expected boolean at object {}", object),
            Error::ExpectedFill(object) =>
                write!(formatter, "expected fill unit type at object {}", object),
            Error::ExpectedUInt8(object) =>
                write!(formatter, "expected 8-bit unsigned integer at object {}", object),
            Error::ExpectedUInt16(object) =>
                write!(formatter, "expected 16-bit unsigned integer at object {}", object),
            Error::ExpectedUInt32(object) =>
                write!(formatter, "expected 32-bit unsigned integer at object {}", object),
            Error::ExpectedSInt64(object) =>
                write!(formatter, "expected 64-bit signed integer at object {}", object),
            Error::ExpectedFloat32(object) =>
                write!(formatter, "expected 32-bit single-precision floating point value at object {}", object),
            Error::ExpectedFloat64(object) =>
                write!(formatter, "expected 64-bit double-precision floating point value at object {}", object),
            Error::ExpectedArray(object) =>
                write!(formatter, "expected array of object references at object {}", object),
            Error::ExpectedDate(object) =>
                write!(formatter, "expected CFAbsoluteTime value at object {}", object),
            Error::ExpectedData(object) =>
                write!(formatter, "expected data at object {}", object),
            Error::ExpectedAsciiString(object) =>
                write!(formatter, "expected ASCII string at object {}", object),
            Error::ExpectedUtf16String(object) =>
                write!(formatter, "expected UTF-16 string at object {}", object),
            Error::ExpectedUid(object) =>
                write!(formatter, "expected UID value at object {}", object),
            Error::ExpectedDictionary(object) =>
                write!(formatter, "expected dictionary at object {}", object),
            Error::CycleDetected =>
                formatter.write_str("cycle detected"),
            Error::Eof =>
                formatter.write_str("unexpected end of input"),
            Error::UnsupportedType(what) =>
                write!(formatter, "value of type {} cannot be encoded in a bplist", what),
            Error::Overflow(what) =>
                write!(formatter, "overflow: {}", what),
            Error::MissingArchiverHeader =>
                formatter.write_str("missing or unrecognized $archiver entry"),
            Error::InvalidVersion(version) =>
                write!(formatter, "unsupported archive version {}", version),
            Error::SchemaViolation(what) =>
                write!(formatter, "archive schema violation: {}", what),
            Error::UidOutOfRange { uid, count } =>
                write!(formatter, "UID {} is out of range for an object table of {} entries", uid, count),
            Error::MalformedClassRecord(what) =>
                write!(formatter, "malformed class record: {}", what),
            Error::UnsupportedClass(name) =>
                write!(formatter, "no adapter registered for class {}", name),
            Error::CircularReferenceUnresolvable(uid) =>
                write!(formatter, "object {} circularly references itself while being decoded", uid),
        }
    }
}

impl std::error::Error for Error {}
