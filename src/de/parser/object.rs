//
// Copyright 2020 bparchive Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use ascii::{AsciiStr, AsAsciiStrError};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::take,
    combinator::{map, map_res, verify},
    multi::many_m_n,
    number::complete::{be_u8, be_u16, be_u32, be_i64, be_f32, be_f64},
    sequence::tuple,
};

use std::convert::TryFrom;
use std::num::TryFromIntError;
use std::string::FromUtf16Error;

use crate::document::{ObjectFormat, EXTENDED_LENGTH};
use crate::de::parser::utils::be_usize_n;

/// Returns a parser which consumes a marker conforming to the specified format.
/// On success, the parser yields both the validated format and the encoded value.
/// This allows the function to be used to verify a marker byte is of the specified
/// format and to decode the value contained therein, if any.
fn marker(
    format: ObjectFormat
) -> impl Fn(&[u8]) -> IResult<&[u8], (ObjectFormat, u8)> {
    move |input: &[u8]| {
        map(
            verify(take(1usize), move |b: &[u8]| -> bool {
                (b[0] & format.tag_mask()) == format.tag_bits()
            }),
            move |b: &[u8]| -> (ObjectFormat, u8) {
                (format, b[0] & format.value_mask())
            }
        )(input)
    }
}

/// Parses a marker byte and returns both the object format and encoded value.
pub fn any_marker(input: &[u8]) -> IResult<&[u8], (ObjectFormat, u8)> {
    alt((
        marker(ObjectFormat::Boolean),
        marker(ObjectFormat::Fill),
        marker(ObjectFormat::UInt8),
        marker(ObjectFormat::UInt16),
        marker(ObjectFormat::UInt32),
        marker(ObjectFormat::SInt64),
        marker(ObjectFormat::Float32),
        marker(ObjectFormat::Float64),
        marker(ObjectFormat::Date),
        marker(ObjectFormat::Data),
        marker(ObjectFormat::AsciiString),
        marker(ObjectFormat::Utf16String),
        marker(ObjectFormat::Uid),
        marker(ObjectFormat::Array),
        marker(ObjectFormat::Dictionary),
    ))(input)
}

/// Parses a boolean object with an encoded value bit.
pub fn boolean(input: &[u8]) -> IResult<&[u8], bool> {
    map(
        marker(ObjectFormat::Boolean),
        |(_, value)| value == 1
    )(input)
}

/// Parses a fill object, which is represented as a unit type.
pub fn fill(input: &[u8]) -> IResult<&[u8], ()> {
    map(
        marker(ObjectFormat::Fill),
        |_| ()
    )(input)
}

/// Parses an 8-bit unsigned integer object.
pub fn uint8(input: &[u8]) -> IResult<&[u8], u8> {
    map(
        tuple((
            marker(ObjectFormat::UInt8),
            be_u8,
        )),
        |(_, value)| value
    )(input)
}

/// Parses a 16-bit unsigned integer object.
pub fn uint16(input: &[u8]) -> IResult<&[u8], u16> {
    map(
        tuple((
            marker(ObjectFormat::UInt16),
            be_u16,
        )),
        |(_, value)| value
    )(input)
}

/// Parses a 32-bit unsigned integer object.
pub fn uint32(input: &[u8]) -> IResult<&[u8], u32> {
    map(
        tuple((
            marker(ObjectFormat::UInt32),
            be_u32,
        )),
        |(_, value)| value
    )(input)
}

/// Parses a 64-bit signed integer object. This is the only width at which a
/// bplist integer is interpreted as a two's-complement value.
pub fn sint64(input: &[u8]) -> IResult<&[u8], i64> {
    map(
        tuple((
            marker(ObjectFormat::SInt64),
            be_i64,
        )),
        |(_, value)| value
    )(input)
}

/// Parses a 32-bit single-precision floating point value.
pub fn float32(input: &[u8]) -> IResult<&[u8], f32> {
    map(
        tuple((
            marker(ObjectFormat::Float32),
            be_f32,
        )),
        |(_, value)| value
    )(input)
}

/// Parses a 64-bit double-precision floating point value.
pub fn float64(input: &[u8]) -> IResult<&[u8], f64> {
    map(
        tuple((
            marker(ObjectFormat::Float64),
            be_f64,
        )),
        |(_, value)| value
    )(input)
}

/// Parses a 64-bit double-precision CFAbsoluteTime date value.
pub fn date(input: &[u8]) -> IResult<&[u8], f64> {
    map(
        tuple((
            marker(ObjectFormat::Date),
            be_f64,
        )),
        |(_, value)| value
    )(input)
}

/// Returns a parser for the length of an object payload.
/// The parameter is the value encoded in the marker byte to which the payload corresponds.
/// If the encoded value is:
///   0b0000_0000 ..= 0b0000_1110:
///     No additional input is consumed and the encoded value represents directly
///     the payload count value.
///   0b0000_1111:
///     An integer object with a 1, 2, 4 or 8 byte payload follows.
///     This object is consumed, interpreted as a non-negative value, and returned.
fn payload_count(
    encoded_value: u8,
) -> impl Fn(&[u8]) -> IResult<&[u8], usize> {
    assert!((encoded_value & 0b1111_0000) == 0, "encoded length must be a 4-bit value");
    move |input: &[u8]| {
        if encoded_value == EXTENDED_LENGTH {
            map_res(
                alt((
                    map(uint8, |value| value as u64),
                    map(uint16, |value| value as u64),
                    map(uint32, |value| value as u64),
                    // Negative counts are nonsensical and rejected here.
                    map_res(sint64, |value| u64::try_from(value)),
                )),
                |value| usize::try_from(value)
            )(input)
        } else {
            Ok((input, encoded_value as usize))
        }
    }
}

/// Parses a variable-length data object and returns the corresponding slice of the input.
pub fn data(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, (_, encoded_value)) = marker(ObjectFormat::Data)(input)?;
    let (input, data_length) = payload_count(encoded_value)(input)?;
    take(data_length)(input)
}

/// Parses a variable-length ASCII string object and returns a corresponding borrowed string slice.
///
/// # Notes
///
/// 1. Validates that the data contained in the object is an ASCII string.
/// 2. This is a zero-copy operation.
pub fn ascii_string(input: &[u8]) -> IResult<&[u8], &str> {
    let (input, (_, encoded_value)) = marker(ObjectFormat::AsciiString)(input)?;
    let (input, char_count) = payload_count(encoded_value)(input)?;
    map_res(
        take(char_count),
        |bytes| -> Result<&str, AsAsciiStrError> {
            AsciiStr::from_ascii(bytes).map(|value| value.as_str())
        }
    )(input)
}

/// Parses a variable-length UTF-16 string object and returns an owned string.
///
/// # Notes
///
/// 1. The length field counts UTF-16 code units, not bytes.
/// 2. Validates that the data contained in the object is valid UTF-16.
/// 3. This is not a zero-copy operation.
pub fn utf16_string(input: &[u8]) -> IResult<&[u8], String> {
    let (input, (_, encoded_value)) = marker(ObjectFormat::Utf16String)(input)?;
    let (input, char_count) = payload_count(encoded_value)(input)?;
    map_res(
        many_m_n(
            char_count,
            char_count,
            be_u16
        ), |code_points| -> Result<String, FromUtf16Error> {
            String::from_utf16(&code_points)
        }
    )(input)
}

/// Parses a variable-length UID object and returns its value.
///
/// The marker's value bits hold the payload width minus one, permitting
/// widths of 1 through 16 bytes. Widths beyond 8 bytes are legal per the
/// format and accepted here as long as the value itself fits in 64 bits.
pub fn uid(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, (_, encoded_value)) = marker(ObjectFormat::Uid)(input)?;
    map_res(
        take(encoded_value as usize + 1),
        |bytes: &[u8]| -> Result<u64, TryFromIntError> {
            let wide = bytes.iter().fold(0u128, |acc, x| {
                (acc << 8) | *x as u128
            });
            u64::try_from(wide)
        }
    )(input)
}

/// Returns a parser for an array with the specified-width object references.
///
/// The value returned by the parser is a list of value object references.
pub fn array(
    object_reference_size: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<usize>> {
    assert!(object_reference_size <= 8, "object references must be up to 8 bytes long");
    move |input: &[u8]| {
        let (input, (_, encoded_value)) = marker(ObjectFormat::Array)(input)?;
        let (input, array_length) = payload_count(encoded_value)(input)?;
        many_m_n(
            array_length,
            array_length,
            be_usize_n(object_reference_size)
        )(input)
    }
}

/// Returns a parser for a dictionary with the specified-width key and value references.
///
/// On the wire a dictionary stores all of its key references followed by all
/// of its value references. The value returned by the parser is the list of
/// matched key and value object references, key first in each tuple.
pub fn dictionary(
    object_reference_size: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<(usize, usize)>> {
    assert!(object_reference_size <= 8, "object references must be up to 8 bytes long");
    move |input: &[u8]| {
        let (input, (_, encoded_value)) = marker(ObjectFormat::Dictionary)(input)?;
        let (input, entry_count) = payload_count(encoded_value)(input)?;

        map(
            tuple((
                many_m_n(entry_count, entry_count, be_usize_n(object_reference_size)),
                many_m_n(entry_count, entry_count, be_usize_n(object_reference_size)),
            )), |(
                mut keys,
                mut values
            )| {
                // Interleave the key and value references
                keys.drain(..)
                    .zip(values.drain(..))
                    .collect::<Vec<(usize, usize)>>()
            }
        )(input)
    }
}
