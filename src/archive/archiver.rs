//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use log::{debug, trace};

use std::collections::HashMap;
use std::sync::Arc;

use crate::archive::builtins::{
    KEYS_FIELD,
    NSARRAY_CLASSES,
    NSDATE_CLASSES,
    NSDICTIONARY_CLASSES,
    OBJECTS_FIELD,
    TIME_FIELD,
};
use crate::archive::registry;
use crate::archive::value::{ArchiveValue, Instance};
use crate::archive::{
    ARCHIVER_CLASS_NAME,
    ARCHIVER_KEY,
    ARCHIVE_VERSION,
    CLASSES_KEY,
    CLASS_KEY,
    CLASS_NAME_KEY,
    NULL_SENTINEL,
    OBJECTS_KEY,
    ROOT_KEY,
    TOP_KEY,
    VERSION_KEY,
};
use crate::error::{Error, Result};
use crate::object::{Object, Uid};

/// Archives a value graph into a complete keyed-archive bplist document.
pub fn archive(value: &ArchiveValue) -> Result<Vec<u8>> {
    crate::ser::generate(&archive_object(value)?)
}

/// Archives a value graph into the top-level dictionary of a keyed archive,
/// leaving the bplist serialization to the caller.
pub fn archive_object(value: &ArchiveValue) -> Result<Object> {
    let mut archiver = Archiver::new();
    let root = archiver.archive_value(value)?;
    Ok(archiver.finish(root))
}

/// Walks a value graph depth-first, appending one record per object to
/// `$objects` and returning UIDs for the caller to reference them by.
/// Instances are tracked by handle identity so an object shared within the
/// graph archives exactly once; class records dedup by their class chain.
struct Archiver {
    /// The `$objects` table under construction. Index 0 is the null sentinel.
    objects: Vec<Object>,
    /// UIDs of already archived instances, keyed by handle identity.
    instance_references: HashMap<usize, u64>,
    /// UIDs of already emitted class records, keyed by class chain.
    class_references: HashMap<Vec<String>, u64>,
}

impl Archiver {

    fn new() -> Archiver {
        Archiver {
            objects: vec![Object::String(NULL_SENTINEL.to_string())],
            instance_references: HashMap::new(),
            class_references: HashMap::new(),
        }
    }

    /// Appends one object and returns the UID now referring to it.
    fn append(&mut self, object: Object) -> u64 {
        self.objects.push(object);
        (self.objects.len() - 1) as u64
    }

    /// Claims the next UID before its record is built, so that the record's
    /// children observe a stable reference to their parent.
    fn reserve(&mut self) -> u64 {
        self.append(Object::Dictionary(Vec::new()))
    }

    fn archive_value(&mut self, value: &ArchiveValue) -> Result<u64> {
        match value {
            ArchiveValue::Null =>
                Ok(0),
            ArchiveValue::Boolean(value) =>
                Ok(self.append(Object::Boolean(*value))),
            ArchiveValue::Integer(value) =>
                Ok(self.append(Object::Integer(*value))),
            ArchiveValue::Real(value) =>
                Ok(self.append(Object::Real((*value).into()))),
            ArchiveValue::String(value) =>
                Ok(self.append(Object::String(value.clone()))),
            ArchiveValue::Data(value) =>
                Ok(self.append(Object::Data(value.clone()))),
            ArchiveValue::Uid(value) =>
                Ok(self.append(Object::Uid(*value))),

            ArchiveValue::Date(date) => {
                let slot = self.reserve();
                let class = self.class_record(class_chain(NSDATE_CLASSES));
                self.objects[slot as usize] = Object::Dictionary(vec![
                    (Object::String(CLASS_KEY.to_string()), Object::Uid(Uid::new(class))),
                    (Object::String(TIME_FIELD.to_string()), Object::Real(date.absolute_time().into())),
                ]);
                Ok(slot)
            }

            ArchiveValue::Array(elements) => {
                let slot = self.reserve();
                let class = self.class_record(class_chain(NSARRAY_CLASSES));
                let mut references = Vec::with_capacity(elements.len());
                for element in elements {
                    references.push(Object::Uid(Uid::new(self.archive_value(element)?)));
                }
                self.objects[slot as usize] = Object::Dictionary(vec![
                    (Object::String(CLASS_KEY.to_string()), Object::Uid(Uid::new(class))),
                    (Object::String(OBJECTS_FIELD.to_string()), Object::Array(references)),
                ]);
                Ok(slot)
            }

            ArchiveValue::Dictionary(entries) => {
                let slot = self.reserve();
                let class = self.class_record(class_chain(NSDICTIONARY_CLASSES));
                let mut key_references = Vec::with_capacity(entries.len());
                let mut value_references = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.append(Object::String(key.clone()));
                    key_references.push(Object::Uid(Uid::new(key)));
                    value_references.push(Object::Uid(Uid::new(self.archive_value(value)?)));
                }
                self.objects[slot as usize] = Object::Dictionary(vec![
                    (Object::String(CLASS_KEY.to_string()), Object::Uid(Uid::new(class))),
                    (Object::String(KEYS_FIELD.to_string()), Object::Array(key_references)),
                    (Object::String(OBJECTS_FIELD.to_string()), Object::Array(value_references)),
                ]);
                Ok(slot)
            }

            ArchiveValue::Instance(instance) => self.archive_instance(instance),
        }
    }

    fn archive_instance(&mut self, instance: &Arc<Instance>) -> Result<u64> {
        // An already archived handle reuses its UID; that is what keeps a
        // shared object shared on the wire.
        let identity = Arc::as_ptr(instance) as usize;
        if let Some(&reference) = self.instance_references.get(&identity) {
            return Ok(reference);
        }

        let adapter = match registry::lookup_for_instance(instance) {
            Some(adapter) => adapter,
            None => return Err(Error::UnsupportedClass(instance.class_name().to_string())),
        };
        let classes = adapter.classes();
        if classes.is_empty() {
            return Err(Error::MalformedClassRecord(format!(
                "adapter for {} declares no classes",
                instance.class_name()
            )));
        }

        trace!("archiving an instance of {}", instance.class_name());

        // The UID is claimed before the encoder runs so that a child
        // referring back to this instance closes the cycle.
        let slot = self.reserve();
        self.instance_references.insert(identity, slot);
        let class = self.class_record(classes);

        let mut coder = ObjectEncoder {
            archiver: self,
            fields: Vec::new(),
        };
        adapter.encode(instance, &mut coder)?;
        let ObjectEncoder { fields, .. } = coder;

        let mut record = vec![
            (Object::String(CLASS_KEY.to_string()), Object::Uid(Uid::new(class))),
        ];
        record.extend(fields);
        self.objects[slot as usize] = Object::Dictionary(record);
        Ok(slot)
    }

    /// Returns the UID of the class record for the given chain, emitting it
    /// on first use.
    fn class_record(&mut self, classes: Vec<String>) -> u64 {
        if let Some(&reference) = self.class_references.get(&classes) {
            return reference;
        }

        let record = Object::Dictionary(vec![
            (
                Object::String(CLASSES_KEY.to_string()),
                Object::Array(classes.iter().map(|name| Object::String(name.clone())).collect()),
            ),
            (
                Object::String(CLASS_NAME_KEY.to_string()),
                Object::String(classes[0].clone()),
            ),
        ]);
        let reference = self.append(record);
        self.class_references.insert(classes, reference);
        reference
    }

    /// Wraps the finished `$objects` table in the archive's top-level shape.
    fn finish(self, root: u64) -> Object {
        debug!("archived a document of {} objects", self.objects.len());
        Object::Dictionary(vec![
            (
                Object::String(ARCHIVER_KEY.to_string()),
                Object::String(ARCHIVER_CLASS_NAME.to_string()),
            ),
            (
                Object::String(OBJECTS_KEY.to_string()),
                Object::Array(self.objects),
            ),
            (
                Object::String(TOP_KEY.to_string()),
                Object::Dictionary(vec![
                    (Object::String(ROOT_KEY.to_string()), Object::Uid(Uid::new(root))),
                ]),
            ),
            (
                Object::String(VERSION_KEY.to_string()),
                Object::Integer(ARCHIVE_VERSION),
            ),
        ])
    }

}

fn class_chain(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// The write-side view an adapter encodes its fields through.
///
/// Booleans, integers and reals are stored inline in the record; every other
/// value is archived into `$objects` and stored as a UID, with null mapping
/// onto UID zero.
pub struct ObjectEncoder<'a> {
    archiver: &'a mut Archiver,
    fields: crate::object::Dictionary,
}

impl ObjectEncoder<'_> {
    /// Encodes one named field of the record under construction.
    pub fn encode(&mut self, field: &str, value: &ArchiveValue) -> Result<()> {
        let stored = match value {
            ArchiveValue::Boolean(value) => Object::Boolean(*value),
            ArchiveValue::Integer(value) => Object::Integer(*value),
            ArchiveValue::Real(value) => Object::Real((*value).into()),
            other => Object::Uid(Uid::new(self.archiver.archive_value(other)?)),
        };
        self.fields.push((Object::String(field.to_string()), stored));
        Ok(())
    }
}
