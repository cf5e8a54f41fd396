//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The keyed archive layer.
//!
//! An `NSKeyedArchiver` stream is a bplist whose top object is a dictionary
//! with four entries:
//!
//! | key         | value                                                     |
//! |-------------|-----------------------------------------------------------|
//! | `$version`  | the integer 100000                                        |
//! | `$archiver` | the string `"NSKeyedArchiver"`                            |
//! | `$top`      | dictionary of root key to UID                             |
//! | `$objects`  | array of every archived record, `"$null"` at index zero   |
//!
//! Application objects appear inside `$objects` as dictionaries keyed by
//! field name, alongside a `$class` UID pointing at a class record carrying
//! the Cocoa class identity. UID zero denotes null everywhere.
//!
//! This module decodes such a stream into an [`ArchiveValue`] graph and
//! encodes such graphs back, dispatching custom classes through the process
//! wide [registry](crate::archive::register) of [`ClassAdapter`]s.
//!
//! # References
//!
//! 1. https://developer.apple.com/library/archive/documentation/Cocoa/Conceptual/Archiving/Articles/archives.html

mod adapter;
mod archiver;
mod builtins;
mod registry;
mod unarchiver;
mod value;

pub use adapter::{ClassAdapter, FieldKind, FieldSpec, RecordAdapter};
pub use archiver::{archive, archive_object, ObjectEncoder};
pub use registry::{lookup_by_name, lookup_for_instance, register, update_class_map};
pub use unarchiver::{unarchive, unarchive_object, ObjectDecoder};
pub use value::{ArchiveValue, Instance};

/// The only archiver class this library reads or writes. The non-keyed
/// `NSArchiver` format predates bplist and is long deprecated.
pub(crate) const ARCHIVER_CLASS_NAME: &str = "NSKeyedArchiver";

/// The archive version emitted by every known NSKeyedArchiver.
pub(crate) const ARCHIVE_VERSION: i64 = 100_000;

/// The string stored at `$objects[0]`, referenced by UID zero to express null.
pub(crate) const NULL_SENTINEL: &str = "$null";

/// The conventional single key of `$top`.
pub(crate) const ROOT_KEY: &str = "root";

pub(crate) const VERSION_KEY: &str = "$version";
pub(crate) const ARCHIVER_KEY: &str = "$archiver";
pub(crate) const TOP_KEY: &str = "$top";
pub(crate) const OBJECTS_KEY: &str = "$objects";
pub(crate) const CLASS_KEY: &str = "$class";
pub(crate) const CLASS_NAME_KEY: &str = "$classname";
pub(crate) const CLASSES_KEY: &str = "$classes";
