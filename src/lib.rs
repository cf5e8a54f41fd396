//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

mod de;
mod document;
mod error;
mod ser;

pub mod archive;
pub mod object;
pub use object::{Date, Object, Uid};

pub use de::{from_slice, Deserializer};
pub use ser::{to_bytes, Serializer};
pub use error::{Error, Result};

pub use archive::{archive, unarchive, update_class_map};

/// Parses a `bplist00` document into its top-level [`Object`].
pub fn parse(data: &[u8]) -> Result<Object> {
    de::from_slice(data)
}

/// Serializes an [`Object`] tree into a complete `bplist00` document.
pub fn generate(object: &Object) -> Result<Vec<u8>> {
    ser::generate(object)
}
