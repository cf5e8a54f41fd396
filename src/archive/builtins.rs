//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Adapters for the built-in Foundation classes.
//!
//! Foundation's collection and value classes archive themselves under
//! well-known field names (`NS.objects`, `NS.keys`, `NS.string`, `NS.time`,
//! `NS.data`, `NS.uuidbytes`). The adapters here decode those records into
//! native [`ArchiveValue`]s; the mutable variants of each class share the
//! adapter of their immutable counterpart.
//!
//! None of these adapters implement `encode`: the archiver emits Foundation
//! container records directly from the corresponding `ArchiveValue` variants,
//! so the encode path never consults them.

use indexmap::IndexMap;

use std::collections::HashMap;
use std::sync::Arc;

use crate::archive::adapter::ClassAdapter;
use crate::archive::unarchiver::ObjectDecoder;
use crate::archive::value::ArchiveValue;
use crate::error::{Error, Result};
use crate::object::Date;

pub(crate) const NSDICTIONARY_CLASSES: &[&str] = &["NSDictionary", "NSObject"];
pub(crate) const NSARRAY_CLASSES: &[&str] = &["NSArray", "NSObject"];
pub(crate) const NSDATE_CLASSES: &[&str] = &["NSDate", "NSObject"];

pub(crate) const OBJECTS_FIELD: &str = "NS.objects";
pub(crate) const KEYS_FIELD: &str = "NS.keys";
pub(crate) const STRING_FIELD: &str = "NS.string";
pub(crate) const TIME_FIELD: &str = "NS.time";
pub(crate) const DATA_FIELD: &str = "NS.data";
pub(crate) const UUID_BYTES_FIELD: &str = "NS.uuidbytes";

/// Builds the registry seed: every built-in class name mapped to its adapter.
pub(crate) fn class_map() -> HashMap<String, Arc<dyn ClassAdapter>> {
    let mut map = HashMap::new();

    let null = Arc::new(NsNull) as Arc<dyn ClassAdapter>;
    let dictionary = Arc::new(NsDictionary) as Arc<dyn ClassAdapter>;
    let sequence = Arc::new(NsSequence) as Arc<dyn ClassAdapter>;
    let string = Arc::new(NsString) as Arc<dyn ClassAdapter>;
    let date = Arc::new(NsDate) as Arc<dyn ClassAdapter>;
    let data = Arc::new(NsData) as Arc<dyn ClassAdapter>;
    let uuid = Arc::new(NsUuid) as Arc<dyn ClassAdapter>;

    map.insert("NSNull".to_string(), null);
    map.insert("NSDictionary".to_string(), Arc::clone(&dictionary));
    map.insert("NSMutableDictionary".to_string(), dictionary);
    map.insert("NSArray".to_string(), Arc::clone(&sequence));
    map.insert("NSMutableArray".to_string(), Arc::clone(&sequence));
    map.insert("NSSet".to_string(), Arc::clone(&sequence));
    map.insert("NSMutableSet".to_string(), sequence);
    map.insert("NSString".to_string(), Arc::clone(&string));
    map.insert("NSMutableString".to_string(), string);
    map.insert("NSDate".to_string(), date);
    map.insert("NSData".to_string(), Arc::clone(&data));
    map.insert("NSMutableData".to_string(), data);
    map.insert("NSUUID".to_string(), uuid);

    map
}

fn classes_of(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// `NSNull` archives as a bare record; it decodes to the null sentinel.
struct NsNull;

impl ClassAdapter for NsNull {
    fn classes(&self) -> Vec<String> {
        classes_of(&["NSNull", "NSObject"])
    }

    fn decode(&self, _coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        Ok(ArchiveValue::Null)
    }
}

/// `NSDictionary` and `NSMutableDictionary`: parallel key and object lists.
struct NsDictionary;

impl ClassAdapter for NsDictionary {
    fn classes(&self) -> Vec<String> {
        classes_of(NSDICTIONARY_CLASSES)
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        let keys = match coder.decode(KEYS_FIELD)? {
            ArchiveValue::Array(keys) => keys,
            _ => return Err(Error::MalformedClassRecord("NS.keys is not an array".to_string())),
        };
        let values = match coder.decode(OBJECTS_FIELD)? {
            ArchiveValue::Array(values) => values,
            _ => return Err(Error::MalformedClassRecord("NS.objects is not an array".to_string())),
        };
        if keys.len() != values.len() {
            return Err(Error::MalformedClassRecord(
                "NS.keys and NS.objects differ in length".to_string(),
            ));
        }

        let mut entries = IndexMap::with_capacity(keys.len());
        for (key, value) in keys.into_iter().zip(values.into_iter()) {
            match key {
                ArchiveValue::String(key) => {
                    entries.insert(key, value);
                }
                other => {
                    return Err(Error::MalformedClassRecord(format!(
                        "dictionary key {:?} is not a string",
                        other
                    )))
                }
            }
        }
        Ok(ArchiveValue::Dictionary(entries))
    }
}

/// `NSArray`, `NSMutableArray`, `NSSet` and `NSMutableSet`: an object list.
/// Sets surface as arrays in whatever order the archive stored them.
struct NsSequence;

impl ClassAdapter for NsSequence {
    fn classes(&self) -> Vec<String> {
        classes_of(NSARRAY_CLASSES)
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        match coder.decode(OBJECTS_FIELD)? {
            elements @ ArchiveValue::Array(_) => Ok(elements),
            _ => Err(Error::MalformedClassRecord("NS.objects is not an array".to_string())),
        }
    }
}

/// `NSString` and `NSMutableString`: the text under `NS.string`.
struct NsString;

impl ClassAdapter for NsString {
    fn classes(&self) -> Vec<String> {
        classes_of(&["NSString", "NSObject"])
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        match coder.decode(STRING_FIELD)? {
            string @ ArchiveValue::String(_) => Ok(string),
            _ => Err(Error::MalformedClassRecord("NS.string is not a string".to_string())),
        }
    }
}

/// `NSDate`: `NS.time` holds a plain double of CFAbsoluteTime.
struct NsDate;

impl ClassAdapter for NsDate {
    fn classes(&self) -> Vec<String> {
        classes_of(NSDATE_CLASSES)
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        match coder.decode(TIME_FIELD)? {
            ArchiveValue::Real(seconds) => Ok(ArchiveValue::Date(Date::from_absolute_time(seconds))),
            // Some producers store a genuine date object instead of a double.
            date @ ArchiveValue::Date(_) => Ok(date),
            _ => Err(Error::MalformedClassRecord("NS.time is not a double".to_string())),
        }
    }
}

/// `NSData` and `NSMutableData`: the bytes under `NS.data`.
struct NsData;

impl ClassAdapter for NsData {
    fn classes(&self) -> Vec<String> {
        classes_of(&["NSData", "NSObject"])
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        match coder.decode(DATA_FIELD)? {
            data @ ArchiveValue::Data(_) => Ok(data),
            _ => Err(Error::MalformedClassRecord("NS.data is not a data value".to_string())),
        }
    }
}

/// `NSUUID`: sixteen bytes under `NS.uuidbytes`, surfaced as a data value.
struct NsUuid;

impl ClassAdapter for NsUuid {
    fn classes(&self) -> Vec<String> {
        classes_of(&["NSUUID", "NSObject"])
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        match coder.decode(UUID_BYTES_FIELD)? {
            ArchiveValue::Data(bytes) => {
                if bytes.len() != 16 {
                    return Err(Error::MalformedClassRecord(format!(
                        "NS.uuidbytes holds {} bytes, not 16",
                        bytes.len()
                    )));
                }
                Ok(ArchiveValue::Data(bytes))
            }
            _ => Err(Error::MalformedClassRecord("NS.uuidbytes is not a data value".to_string())),
        }
    }
}
