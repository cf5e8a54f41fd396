//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use crate::archive::archiver::ObjectEncoder;
use crate::archive::unarchiver::ObjectDecoder;
use crate::archive::value::{ArchiveValue, Instance};
use crate::error::{Error, Result};

/// Translates between the archived record of one Cocoa class and its host
/// representation.
///
/// Adapters are registered by class name through
/// [`register`](crate::archive::register) and consulted by the unarchiver
/// whenever a record's `$classname` is not handled built in, and by the
/// archiver for every [`Instance`] it encounters.
pub trait ClassAdapter: Send + Sync {
    /// The class identity written into `$classes` on encode, primary class
    /// first, followed by any ancestors the adapter wishes to declare.
    fn classes(&self) -> Vec<String>;

    /// Decodes one record into a host value. Fields are read through the
    /// decode view, which resolves UID references transparently.
    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue>;

    /// Encodes one instance into the record under construction. Adapters for
    /// classes that are only ever decoded may rely on the default, which
    /// rejects the attempt.
    fn encode(&self, instance: &Instance, coder: &mut ObjectEncoder<'_>) -> Result<()> {
        let _ = (instance, coder);
        Err(Error::UnsupportedClass(
            self.classes().into_iter().next().unwrap_or_default(),
        ))
    }
}

/// The set of host value shapes a declared record field may take.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FieldKind {
    /// Any value, including null.
    Any,
    Boolean,
    Integer,
    Real,
    String,
    Data,
    Date,
    Array,
    Dictionary,
    /// An instance of some registered class.
    Instance,
}

impl FieldKind {
    fn matches(self, value: &ArchiveValue) -> bool {
        match (self, value) {
            (FieldKind::Any, _) => true,
            (FieldKind::Boolean, ArchiveValue::Boolean(_)) => true,
            (FieldKind::Integer, ArchiveValue::Integer(_)) => true,
            (FieldKind::Real, ArchiveValue::Real(_)) => true,
            (FieldKind::String, ArchiveValue::String(_)) => true,
            (FieldKind::Data, ArchiveValue::Data(_)) => true,
            (FieldKind::Date, ArchiveValue::Date(_)) => true,
            (FieldKind::Array, ArchiveValue::Array(_)) => true,
            (FieldKind::Dictionary, ArchiveValue::Dictionary(_)) => true,
            (FieldKind::Instance, ArchiveValue::Instance(_)) => true,
            // Null is admissible anywhere a reference shape is expected.
            (_, ArchiveValue::Null) => true,
            _ => false,
        }
    }
}

/// One declared field of a [`RecordAdapter`]: a name, the shape the value
/// must take, and an optional default used when the archive omits the field.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    default: Option<ArchiveValue>,
}

impl FieldSpec {
    /// Declares a required field of the given shape.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Attaches a default, making the field optional in decoded archives.
    pub fn with_default(mut self, value: impl Into<ArchiveValue>) -> FieldSpec {
        self.default = Some(value.into());
        self
    }
}

/// A generic adapter for record-like classes with named, typed fields.
///
/// The adapter iterates its field descriptors in declaration order on both
/// paths: decode reads each declared field from the record and builds an
/// [`Instance`], encode writes each declared field of the instance. A field
/// missing from an archive decodes to its declared default; a missing field
/// with no default is a malformed record.
pub struct RecordAdapter {
    classes: Vec<String>,
    fields: Vec<FieldSpec>,
}

impl RecordAdapter {
    /// Creates an adapter for the named class with the declared fields.
    pub fn new(class_name: impl Into<String>, fields: Vec<FieldSpec>) -> RecordAdapter {
        RecordAdapter {
            classes: vec![class_name.into()],
            fields,
        }
    }

    /// Appends ancestor class names to the encoded `$classes` chain.
    pub fn with_ancestors(mut self, ancestors: &[&str]) -> RecordAdapter {
        self.classes.extend(ancestors.iter().map(|name| name.to_string()));
        self
    }

    fn class_name(&self) -> &str {
        &self.classes[0]
    }
}

impl ClassAdapter for RecordAdapter {
    fn classes(&self) -> Vec<String> {
        self.classes.clone()
    }

    fn decode(&self, coder: &mut ObjectDecoder<'_>) -> Result<ArchiveValue> {
        let mut instance = Instance::new(self.class_name());
        for spec in &self.fields {
            let value = if coder.contains(&spec.name) {
                let value = coder.decode(&spec.name)?;
                if !spec.kind.matches(&value) {
                    return Err(Error::MalformedClassRecord(format!(
                        "field {} of {} is not a {:?}",
                        spec.name,
                        self.class_name(),
                        spec.kind
                    )));
                }
                value
            } else {
                spec.default.clone().ok_or_else(|| {
                    Error::MalformedClassRecord(format!(
                        "field {} of {} is absent and has no default",
                        spec.name,
                        self.class_name()
                    ))
                })?
            };
            instance.set(spec.name.clone(), value);
        }
        Ok(ArchiveValue::from(instance))
    }

    fn encode(&self, instance: &Instance, coder: &mut ObjectEncoder<'_>) -> Result<()> {
        for spec in &self.fields {
            match instance.get(&spec.name).or(spec.default.as_ref()) {
                Some(value) => coder.encode(&spec.name, value)?,
                None => {
                    return Err(Error::MalformedClassRecord(format!(
                        "field {} of {} is unset and has no default",
                        spec.name,
                        self.class_name()
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, FieldSpec, RecordAdapter, ClassAdapter};
    use crate::archive::value::ArchiveValue;

    #[test]
    fn test_field_kind_matches() {
        assert!(FieldKind::Any.matches(&ArchiveValue::Null));
        assert!(FieldKind::Integer.matches(&ArchiveValue::Integer(5)));
        assert!(FieldKind::Integer.matches(&ArchiveValue::Null));
        assert!(!FieldKind::Integer.matches(&ArchiveValue::Boolean(true)));
        assert!(FieldKind::String.matches(&ArchiveValue::String("x".to_string())));
        assert!(!FieldKind::String.matches(&ArchiveValue::Integer(5)));
    }

    #[test]
    fn test_record_adapter_classes() {
        let adapter = RecordAdapter::new("Widget", vec![
            FieldSpec::new("size", FieldKind::Integer),
        ]).with_ancestors(&["NSObject"]);
        assert_eq!(adapter.classes(), vec!["Widget".to_string(), "NSObject".to_string()]);
    }

    #[test]
    fn test_field_spec_default() {
        let spec = FieldSpec::new("count", FieldKind::Integer).with_default(0i64);
        assert_eq!(spec.default, Some(ArchiveValue::Integer(0)));
    }
}
