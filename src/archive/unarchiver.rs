//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use indexmap::IndexMap;
use log::{debug, trace};

use std::collections::{BTreeSet, HashMap};

use crate::archive::registry;
use crate::archive::value::ArchiveValue;
use crate::archive::{
    ARCHIVER_CLASS_NAME,
    ARCHIVER_KEY,
    ARCHIVE_VERSION,
    CLASS_KEY,
    CLASS_NAME_KEY,
    NULL_SENTINEL,
    OBJECTS_KEY,
    ROOT_KEY,
    TOP_KEY,
    VERSION_KEY,
};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};

/// Parses a keyed archive document and decodes its root object.
pub fn unarchive(data: &[u8]) -> Result<ArchiveValue> {
    unarchive_object(crate::de::from_slice(data)?)
}

/// Decodes an already-parsed keyed archive document.
///
/// The input is the top-level dictionary of the archive, exactly as the
/// bplist parser produced it.
pub fn unarchive_object(document: Object) -> Result<ArchiveValue> {
    let mut unarchiver = Unarchiver::new(document)?;
    unarchiver.unarchive_top()
}

/// Looks up a string-keyed entry in a dictionary's pair list.
fn entry<'a>(record: &'a Dictionary, key: &str) -> Option<&'a Object> {
    record
        .iter()
        .find(|(entry_key, _)| entry_key.as_str() == Some(key))
        .map(|(_, value)| value)
}

/// Walks a decoded bplist following the `NSKeyedArchiver` schema, resolving
/// UIDs against `$objects` and dispatching records through the class
/// registry. Materialized objects are memoized per UID, so a subtree shared
/// on the wire is shared in the result, and a record is decoded at most once.
struct Unarchiver {
    /// The `$objects` table; UIDs index into it.
    objects: Vec<Object>,
    /// The `$top` entry-point dictionary.
    top: Dictionary,
    /// Already materialized objects by UID.
    cache: HashMap<u64, ArchiveValue>,
    /// UIDs whose resolution is in progress, used to refuse cycles that
    /// would hand an adapter a partially-constructed child.
    in_flight: BTreeSet<u64>,
}

impl Unarchiver {

    /// Validates the archive schema and captures `$objects` and `$top`.
    fn new(document: Object) -> Result<Unarchiver> {
        let document = match document.as_dictionary() {
            Some(entries) => entries,
            None => return Err(Error::SchemaViolation("top-level object is not a dictionary")),
        };

        match entry(document, ARCHIVER_KEY).and_then(Object::as_str) {
            Some(ARCHIVER_CLASS_NAME) => (),
            _ => return Err(Error::MissingArchiverHeader),
        }

        match entry(document, VERSION_KEY).and_then(Object::as_integer) {
            Some(ARCHIVE_VERSION) => (),
            Some(version) => return Err(Error::InvalidVersion(version)),
            None => return Err(Error::SchemaViolation("missing $version")),
        }

        let objects = match entry(document, OBJECTS_KEY).and_then(Object::as_array) {
            Some(objects) => objects.to_vec(),
            None => return Err(Error::SchemaViolation("missing $objects array")),
        };
        match objects.first().and_then(Object::as_str) {
            Some(NULL_SENTINEL) => (),
            _ => return Err(Error::SchemaViolation("$objects[0] is not \"$null\"")),
        }

        let top = match entry(document, TOP_KEY).and_then(Object::as_dictionary) {
            Some(top) => top.clone(),
            None => return Err(Error::SchemaViolation("missing $top dictionary")),
        };

        Ok(Unarchiver {
            objects,
            top,
            cache: HashMap::new(),
            in_flight: BTreeSet::new(),
        })
    }

    /// Resolves every `$top` entry. The Cocoa convention of a single entry
    /// keyed `"root"` unwraps to the root value itself; anything else is
    /// returned as a dictionary of decoded entries.
    fn unarchive_top(&mut self) -> Result<ArchiveValue> {
        debug!("unarchiving a document of {} objects", self.objects.len());

        let top = self.top.clone();
        let mut decoded = IndexMap::with_capacity(top.len());
        for (key, value) in &top {
            let key = match key.as_str() {
                Some(key) => key.to_string(),
                None => return Err(Error::SchemaViolation("$top key is not a string")),
            };
            let uid = match value.as_uid() {
                Some(uid) => uid,
                None => return Err(Error::SchemaViolation("$top value is not a UID")),
            };
            decoded.insert(key, self.resolve(uid.value)?);
        }

        if decoded.len() == 1 && decoded.contains_key(ROOT_KEY) {
            match decoded.shift_remove(ROOT_KEY) {
                Some(root) => Ok(root),
                None => Ok(ArchiveValue::Null),
            }
        } else {
            Ok(ArchiveValue::Dictionary(decoded))
        }
    }

    /// Materializes the object a UID refers to. UID zero is null; everything
    /// else indexes `$objects`.
    fn resolve(&mut self, uid: u64) -> Result<ArchiveValue> {
        if uid == 0 {
            return Ok(ArchiveValue::Null);
        }
        if let Some(existing) = self.cache.get(&uid) {
            return Ok(existing.clone());
        }

        let index = uid as usize;
        if index >= self.objects.len() {
            return Err(Error::UidOutOfRange { uid, count: self.objects.len() });
        }
        if !self.in_flight.insert(uid) {
            return Err(Error::CircularReferenceUnresolvable(uid));
        }

        let object = self.objects[index].clone();
        let result = match object {
            Object::Dictionary(record) => {
                if entry(&record, CLASS_KEY).is_some() {
                    self.resolve_record(record)
                } else {
                    self.convert(Object::Dictionary(record))
                }
            }
            other => self.convert(other),
        };

        self.in_flight.remove(&uid);
        let value = result?;
        self.cache.insert(uid, value.clone());
        Ok(value)
    }

    /// Decodes an object record: chase `$class` to its class record, then
    /// hand the record to the adapter registered for `$classname`.
    fn resolve_record(&mut self, record: Dictionary) -> Result<ArchiveValue> {
        let class_uid = match entry(&record, CLASS_KEY).and_then(Object::as_uid) {
            Some(uid) => uid,
            None => return Err(Error::MalformedClassRecord("$class is not a UID".to_string())),
        };

        let class_index = class_uid.value as usize;
        if class_index >= self.objects.len() {
            return Err(Error::UidOutOfRange { uid: class_uid.value, count: self.objects.len() });
        }
        let class_name = match self.objects[class_index].get(CLASS_NAME_KEY).and_then(Object::as_str) {
            Some(name) => name.to_string(),
            None => return Err(Error::MalformedClassRecord(
                "class record is missing $classname".to_string(),
            )),
        };

        let adapter = match registry::lookup_by_name(&class_name) {
            Some(adapter) => adapter,
            None => return Err(Error::UnsupportedClass(class_name)),
        };

        trace!("decoding a record of class {}", class_name);
        let mut coder = ObjectDecoder {
            unarchiver: self,
            record,
        };
        adapter.decode(&mut coder)
    }

    /// Converts a class-less object to its host representation. UIDs nested
    /// inside plain containers are references and resolve recursively; a UID
    /// stored directly in `$objects` is itself a value and passes through.
    fn convert(&mut self, object: Object) -> Result<ArchiveValue> {
        match object {
            Object::Boolean(value) => Ok(ArchiveValue::Boolean(value)),
            Object::Integer(value) => Ok(ArchiveValue::Integer(value)),
            Object::Real(value) => Ok(ArchiveValue::Real(value.0)),
            Object::String(value) => Ok(ArchiveValue::String(value)),
            Object::Data(value) => Ok(ArchiveValue::Data(value)),
            Object::Date(value) => Ok(ArchiveValue::Date(value)),
            Object::Uid(value) => Ok(ArchiveValue::Uid(value)),
            Object::Array(elements) => {
                let mut converted = Vec::with_capacity(elements.len());
                for element in elements {
                    converted.push(self.convert_element(element)?);
                }
                Ok(ArchiveValue::Array(converted))
            }
            Object::Dictionary(entries) => {
                let mut converted = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key.as_str() {
                        Some(key) => key.to_string(),
                        None => return Err(Error::SchemaViolation("dictionary key is not a string")),
                    };
                    converted.insert(key, self.convert_element(value)?);
                }
                Ok(ArchiveValue::Dictionary(converted))
            }
        }
    }

    fn convert_element(&mut self, object: Object) -> Result<ArchiveValue> {
        match object {
            Object::Uid(reference) => self.resolve(reference.value),
            other => self.convert(other),
        }
    }

}

/// The read-side view an adapter decodes its fields through.
///
/// Each call resolves one named field of the record being decoded: stored
/// primitives convert directly, stored UIDs resolve through the unarchiver
/// and its identity cache. A missing field and the `$null` UID both read
/// as [`ArchiveValue::Null`]; adapters that must tell them apart consult
/// [`contains`](ObjectDecoder::contains).
pub struct ObjectDecoder<'a> {
    unarchiver: &'a mut Unarchiver,
    record: Dictionary,
}

impl ObjectDecoder<'_> {
    /// Returns true if the record stores the named field.
    pub fn contains(&self, field: &str) -> bool {
        entry(&self.record, field).is_some()
    }

    /// Decodes the named field of the record.
    pub fn decode(&mut self, field: &str) -> Result<ArchiveValue> {
        match entry(&self.record, field).cloned() {
            None => Ok(ArchiveValue::Null),
            Some(Object::Uid(reference)) => self.unarchiver.resolve(reference.value),
            Some(stored) => self.unarchiver.convert(stored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::unarchive_object;
    use crate::archive::value::ArchiveValue;
    use crate::error::Error;
    use crate::object::{Object, Uid};

    fn string(value: &str) -> Object {
        Object::String(value.to_string())
    }

    fn document(entries: Vec<(Object, Object)>) -> Object {
        Object::Dictionary(entries)
    }

    fn well_formed(root: Object) -> Vec<(Object, Object)> {
        vec![
            (string("$archiver"), string("NSKeyedArchiver")),
            (string("$objects"), Object::Array(vec![string("$null"), root])),
            (
                string("$top"),
                Object::Dictionary(vec![(string("root"), Object::Uid(Uid::new(1)))]),
            ),
            (string("$version"), Object::Integer(100000)),
        ]
    }

    #[test]
    fn test_unarchives_a_primitive_root() {
        let result = unarchive_object(document(well_formed(Object::Integer(12))));
        assert_eq!(result, Ok(ArchiveValue::Integer(12)));
    }

    #[test]
    fn test_rejects_non_dictionary_document() {
        let result = unarchive_object(Object::Integer(1));
        assert_eq!(result, Err(Error::SchemaViolation("top-level object is not a dictionary")));
    }

    #[test]
    fn test_rejects_missing_archiver() {
        let mut entries = well_formed(Object::Integer(1));
        entries.remove(0);
        assert_eq!(
            unarchive_object(document(entries)),
            Err(Error::MissingArchiverHeader)
        );
    }

    #[test]
    fn test_rejects_foreign_archiver() {
        let mut entries = well_formed(Object::Integer(1));
        entries[0].1 = string("NSArchiver");
        assert_eq!(
            unarchive_object(document(entries)),
            Err(Error::MissingArchiverHeader)
        );
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut entries = well_formed(Object::Integer(1));
        entries[3].1 = Object::Integer(99999);
        assert_eq!(
            unarchive_object(document(entries)),
            Err(Error::InvalidVersion(99999))
        );
    }

    #[test]
    fn test_rejects_bad_null_sentinel() {
        let mut entries = well_formed(Object::Integer(1));
        entries[1].1 = Object::Array(vec![string("$nil"), Object::Integer(1)]);
        assert_eq!(
            unarchive_object(document(entries)),
            Err(Error::SchemaViolation("$objects[0] is not \"$null\""))
        );
    }

    #[test]
    fn test_rejects_missing_top() {
        let mut entries = well_formed(Object::Integer(1));
        entries.remove(2);
        assert_eq!(
            unarchive_object(document(entries)),
            Err(Error::SchemaViolation("missing $top dictionary"))
        );
    }

    #[test]
    fn test_multiple_top_entries_decode_to_a_dictionary() {
        let entries = vec![
            (string("$archiver"), string("NSKeyedArchiver")),
            (
                string("$objects"),
                Object::Array(vec![string("$null"), Object::Integer(7), string("seven")]),
            ),
            (
                string("$top"),
                Object::Dictionary(vec![
                    (string("count"), Object::Uid(Uid::new(1))),
                    (string("label"), Object::Uid(Uid::new(2))),
                ]),
            ),
            (string("$version"), Object::Integer(100000)),
        ];
        let decoded = unarchive_object(document(entries)).unwrap();
        let top = decoded.as_dictionary().unwrap();
        assert_eq!(top.get("count"), Some(&ArchiveValue::Integer(7)));
        assert_eq!(top.get("label"), Some(&ArchiveValue::from("seven")));
    }
}
