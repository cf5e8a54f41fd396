//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Serialization of an object tree into the bplist00 document layout.
//!
//! The writer makes a single depth-first pass over the value tree. Each tree
//! node becomes exactly one entry in the object table; the offset of each
//! object is recorded as it is emitted, and container reference slots are
//! reserved up front and back-filled once the children have been written.
//! Because the number of objects is known before emission begins, the
//! object reference width is fixed a priori.

use ascii::AsciiStr;

use crate::document::{
    ObjectFormat,
    EXTENDED_LENGTH,
    HEADER_MAGIC_NUMBER,
    HEADER_VERSION_00,
    OffsetTable,
    TRAILER_PREAMBLE_UNUSED_SIZE,
};
use crate::error::{Error, Result};
use crate::object::Object;

/// Documents larger than this cannot be expressed with four-byte offsets.
const MAX_DOCUMENT_SIZE: usize = u32::max_value() as usize;

/// Emits a complete bplist00 document for the given object tree.
pub fn to_bytes(object: &Object) -> Result<Vec<u8>> {
    let number_of_objects = count_objects(object);
    Writer::new(number_of_objects).write_document(object)
}

/// Returns the total number of object-table entries the tree will occupy.
/// The writer performs no deduplication, so this is simply the node count.
fn count_objects(object: &Object) -> usize {
    match object {
        Object::Array(elements) =>
            1 + elements.iter().map(count_objects).sum::<usize>(),
        Object::Dictionary(entries) =>
            1 + entries
                .iter()
                .map(|(key, value)| count_objects(key) + count_objects(value))
                .sum::<usize>(),
        _ =>
            1,
    }
}

/// Returns the smallest of the widths 1, 2, 4 and 8 able to hold the value.
fn width_of(value: u64) -> usize {
    if value <= 0xFF {
        1
    } else if value <= 0xFFFF {
        2
    } else if value <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

struct Writer {
    /// The document being produced, addressed exclusively by offset.
    buffer: Vec<u8>,
    /// Byte offset of each emitted object, indexed by object reference.
    offset_table: OffsetTable,
    /// The width of a container reference slot, fixed before emission.
    object_reference_size: usize,
}

impl Writer {

    fn new(number_of_objects: usize) -> Writer {
        Writer {
            buffer: Vec::new(),
            offset_table: OffsetTable::with_capacity(number_of_objects),
            object_reference_size: width_of(number_of_objects as u64),
        }
    }

    fn write_document(mut self, object: &Object) -> Result<Vec<u8>> {
        self.buffer.extend_from_slice(HEADER_MAGIC_NUMBER);
        self.buffer.push(HEADER_VERSION_00.0);
        self.buffer.push(HEADER_VERSION_00.1);

        let root_object = self.write_object(object)?;
        debug_assert!(root_object == 0, "the root object must be emitted first");

        if self.buffer.len() > MAX_DOCUMENT_SIZE {
            return Err(Error::Overflow("document exceeds 4 GiB"));
        }

        // Emit the offset table using the narrowest workable entry size.
        let offset_table_offset = self.buffer.len();
        let offset_table_entry_size = width_of(offset_table_offset as u64).min(4);
        for index in 0 .. self.offset_table.len() {
            let offset = self.offset_table[index];
            self.append_be(offset as u64, offset_table_entry_size);
        }

        // Emit the trailer.
        self.buffer.extend_from_slice(&[0; TRAILER_PREAMBLE_UNUSED_SIZE]);
        self.buffer.push(0); // sort version
        self.buffer.push(offset_table_entry_size as u8);
        self.buffer.push(self.object_reference_size as u8);
        self.buffer.extend_from_slice(&(self.offset_table.len() as u64).to_be_bytes());
        self.buffer.extend_from_slice(&0u64.to_be_bytes()); // root object
        self.buffer.extend_from_slice(&(offset_table_offset as u64).to_be_bytes());

        Ok(self.buffer)
    }

    /// Emits one object and its children, returning the object's reference.
    fn write_object(&mut self, object: &Object) -> Result<usize> {
        let reference = self.offset_table.len();
        self.offset_table.push(self.buffer.len());

        match object {
            Object::Boolean(value) => {
                self.buffer.push(ObjectFormat::Boolean.marker_with(*value as u8));
            }

            Object::Integer(value) => {
                self.append_integer(*value);
            }

            Object::Real(value) => {
                self.buffer.push(ObjectFormat::Float64.tag_bits());
                self.buffer.extend_from_slice(&value.0.to_be_bytes());
            }

            Object::Date(value) => {
                self.buffer.push(ObjectFormat::Date.tag_bits());
                self.buffer.extend_from_slice(&value.absolute_time().to_be_bytes());
            }

            Object::Data(bytes) => {
                self.append_marker_with_count(ObjectFormat::Data, bytes.len());
                self.buffer.extend_from_slice(bytes);
            }

            Object::String(string) => {
                match AsciiStr::from_ascii(string.as_bytes()) {
                    // 7-bit clean text, stored byte per character.
                    Ok(ascii) => {
                        self.append_marker_with_count(ObjectFormat::AsciiString, ascii.len());
                        self.buffer.extend_from_slice(ascii.as_bytes());
                    }
                    // Everything else is stored as UTF-16BE. The length field
                    // counts code units, so surrogate pairs count as two.
                    Err(_) => {
                        let code_units = string.encode_utf16().collect::<Vec<u16>>();
                        self.append_marker_with_count(ObjectFormat::Utf16String, code_units.len());
                        for unit in code_units {
                            self.buffer.extend_from_slice(&unit.to_be_bytes());
                        }
                    }
                }
            }

            Object::Uid(uid) => {
                let width = width_of(uid.value);
                self.buffer.push(ObjectFormat::Uid.marker_with(width as u8 - 1));
                self.append_be(uid.value, width);
            }

            Object::Array(elements) => {
                self.append_marker_with_count(ObjectFormat::Array, elements.len());
                let slots = self.reserve_references(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let child = self.write_object(element)?;
                    self.patch_reference(slots + index * self.object_reference_size, child)?;
                }
            }

            Object::Dictionary(entries) => {
                self.append_marker_with_count(ObjectFormat::Dictionary, entries.len());

                // All key references precede all value references.
                let key_slots = self.reserve_references(entries.len() * 2);
                let value_slots = key_slots + entries.len() * self.object_reference_size;
                for (index, (key, _)) in entries.iter().enumerate() {
                    let child = self.write_object(key)?;
                    self.patch_reference(key_slots + index * self.object_reference_size, child)?;
                }
                for (index, (_, value)) in entries.iter().enumerate() {
                    let child = self.write_object(value)?;
                    self.patch_reference(value_slots + index * self.object_reference_size, child)?;
                }
            }
        }

        Ok(reference)
    }

    /// Emits an integer payload using the narrowest legal encoding.
    /// Negative values are always stored as 8-byte two's complement, matching
    /// CoreFoundation.
    fn append_integer(&mut self, value: i64) {
        if value < 0 {
            self.buffer.push(ObjectFormat::SInt64.tag_bits());
            self.buffer.extend_from_slice(&value.to_be_bytes());
        } else {
            match width_of(value as u64) {
                1 => self.buffer.push(ObjectFormat::UInt8.tag_bits()),
                2 => self.buffer.push(ObjectFormat::UInt16.tag_bits()),
                4 => self.buffer.push(ObjectFormat::UInt32.tag_bits()),
                _ => self.buffer.push(ObjectFormat::SInt64.tag_bits()),
            }
            self.append_be(value as u64, width_of(value as u64));
        }
    }

    /// Emits a marker byte for a variably-sized object. Counts below fifteen
    /// are embedded in the marker; larger counts trail it as an integer.
    fn append_marker_with_count(&mut self, format: ObjectFormat, count: usize) {
        if count < EXTENDED_LENGTH as usize {
            self.buffer.push(format.marker_with(count as u8));
        } else {
            self.buffer.push(format.marker_with(EXTENDED_LENGTH));
            self.append_integer(count as i64);
        }
    }

    /// Appends the low `width` bytes of the value in big-endian order.
    fn append_be(&mut self, value: u64, width: usize) {
        let bytes = value.to_be_bytes();
        self.buffer.extend_from_slice(&bytes[8 - width .. ]);
    }

    /// Reserves zeroed reference slots at the current position and returns
    /// the byte offset of the first slot.
    fn reserve_references(&mut self, count: usize) -> usize {
        let position = self.buffer.len();
        self.buffer.resize(position + count * self.object_reference_size, 0);
        position
    }

    /// Back-fills a previously reserved reference slot with an object reference.
    fn patch_reference(&mut self, slot: usize, reference: usize) -> Result<()> {
        let width = self.object_reference_size;
        if width < 8 && (reference as u64) >= 1u64 << (width * 8) {
            return Err(Error::Overflow("object reference exceeds the chosen reference width"));
        }
        let bytes = (reference as u64).to_be_bytes();
        self.buffer[slot .. slot + width].copy_from_slice(&bytes[8 - width .. ]);
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use crate::object::{Date, Object, Uid};
    use super::{count_objects, to_bytes, width_of};

    #[test]
    fn test_width_of() {
        assert_eq!(width_of(0), 1);
        assert_eq!(width_of(255), 1);
        assert_eq!(width_of(256), 2);
        assert_eq!(width_of(65535), 2);
        assert_eq!(width_of(65536), 4);
        assert_eq!(width_of(4294967295), 4);
        assert_eq!(width_of(4294967296), 8);
    }

    #[test]
    fn test_count_objects() {
        assert_eq!(count_objects(&Object::Boolean(true)), 1);
        assert_eq!(
            count_objects(&Object::Array(vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(2)]),
            ])),
            4
        );
        assert_eq!(
            count_objects(&Object::Dictionary(vec![
                (Object::String("x".to_string()), Object::Integer(1)),
            ])),
            3
        );
    }

    #[test]
    fn test_write_negative_integer() {
        // A lone -1: header, SInt64 object, one offset entry, trailer.
        let document = to_bytes(&Object::Integer(-1)).unwrap();
        let expected = vec![
            // Header.
            0x62, 0x70, 0x6C, 0x69, 0x73, 0x74, 0x30, 0x30,
            // SInt64(-1): negative values are always 8 bytes wide.
            0x13, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            // Offset table.
            0x08,
            // Trailer.
            0x00, 0x00, 0x00, 0x00, 0x00,
            0x00,
            0x01,
            0x01,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x11,
        ];
        assert_eq!(document, expected);
    }

    #[test]
    fn test_write_integer_widths() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x10, 0x00]),
            (127, &[0x10, 0x7F]),
            (128, &[0x10, 0x80]),
            (255, &[0x10, 0xFF]),
            (256, &[0x11, 0x01, 0x00]),
            (65535, &[0x11, 0xFF, 0xFF]),
            (65536, &[0x12, 0x00, 0x01, 0x00, 0x00]),
            (i64::max_value(), &[0x13, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            (i64::min_value(), &[0x13, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
        ];
        for (value, payload) in cases {
            let document = to_bytes(&Object::Integer(*value)).unwrap();
            assert_eq!(&document[8 .. 8 + payload.len()], *payload, "value {}", value);
        }
    }

    #[test]
    fn test_write_ascii_string_inline_length() {
        // Fourteen characters fit in the marker's value bits.
        let document = to_bytes(&Object::String("0123456789abcd".to_string())).unwrap();
        assert_eq!(document[8], 0x5E);
        assert_eq!(&document[9 .. 23], b"0123456789abcd");
    }

    #[test]
    fn test_write_ascii_string_extended_length() {
        // Fifteen characters require a trailing length object.
        let document = to_bytes(&Object::String("0123456789abcde".to_string())).unwrap();
        assert_eq!(&document[8 .. 11], &[0x5F, 0x10, 0x0F]);
        assert_eq!(&document[11 .. 26], b"0123456789abcde");
    }

    #[test]
    fn test_write_non_ascii_string() {
        // A single non-ASCII code point forces UTF-16BE.
        let document = to_bytes(&Object::String("\u{00E9}".to_string())).unwrap();
        assert_eq!(&document[8 .. 11], &[0x61, 0x00, 0xE9]);
    }

    #[test]
    fn test_write_surrogate_pair_counts_two_units() {
        // U+1F600 encodes as a surrogate pair, so the length field reads 2.
        let document = to_bytes(&Object::String("\u{1F600}".to_string())).unwrap();
        assert_eq!(&document[8 .. 13], &[0x62, 0xD8, 0x3D, 0xDE, 0x00]);
    }

    #[test]
    fn test_write_date_at_core_data_epoch() {
        // 1 January 2001 is zero seconds of CFAbsoluteTime.
        let document = to_bytes(&Object::Date(Date::from_absolute_time(0.0))).unwrap();
        assert_eq!(&document[8 .. 17], &[0x33, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_write_uid_widths() {
        let document = to_bytes(&Object::Uid(Uid::new(7))).unwrap();
        assert_eq!(&document[8 .. 10], &[0x80, 0x07]);

        let document = to_bytes(&Object::Uid(Uid::new(0x0304))).unwrap();
        assert_eq!(&document[8 .. 11], &[0x81, 0x03, 0x04]);
    }

    #[test]
    fn test_write_array_inline_and_extended_counts() {
        let fourteen = Object::Array(vec![Object::Boolean(true); 14]);
        let document = to_bytes(&fourteen).unwrap();
        assert_eq!(document[8], 0xAE);

        let fifteen = Object::Array(vec![Object::Boolean(true); 15]);
        let document = to_bytes(&fifteen).unwrap();
        assert_eq!(&document[8 .. 11], &[0xAF, 0x10, 0x0F]);
    }

    #[test]
    fn test_trailer_object_count() {
        let value = Object::Array(vec![
            Object::Integer(1),
            Object::Integer(2),
            Object::Integer(3),
        ]);
        let document = to_bytes(&value).unwrap();

        // The number of objects sits 24 bytes from the end of the trailer.
        let count_field = &document[document.len() - 24 .. document.len() - 16];
        assert_eq!(count_field, &4u64.to_be_bytes());
    }
}
