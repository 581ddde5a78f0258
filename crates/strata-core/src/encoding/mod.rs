//! Order-preserving byte encoding for keys.
//!
//! `encode_key(a) < encode_key(b)` (byte-wise) exactly when `a < b`, so the
//! engine's ordered keyspaces sort entries in key order. Every encoded key is
//! self-delimiting: no encoded key is a proper prefix of another, which lets
//! index entries append the primary key after the index key.
//!
//! Format: `[type_tag][payload]`
//! - number / date: 8-byte order-preserving f64
//! - string (UTF-8) / binary: escaped bytes + `0x00 0x00` terminator
//! - array: encoded elements followed by `0x00` (below every tag)

pub mod binary;
pub mod number;

use crate::error::EncodingError;
use crate::key::Key;

/// Type tag constants. Tag order is the cross-type key order.
pub const TAG_ARRAY_END: u8 = 0x00;
pub const TAG_NUMBER: u8 = 0x10;
pub const TAG_DATE: u8 = 0x20;
pub const TAG_STRING: u8 = 0x30;
pub const TAG_BINARY: u8 = 0x40;
pub const TAG_ARRAY: u8 = 0x50;

/// Encode a key into its order-preserving byte form.
pub fn encode_key(key: &Key) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::new();
    encode_into(key, &mut out)?;
    Ok(out)
}

fn encode_into(key: &Key, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    match key {
        Key::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&number::encode_number(*n)?);
        }
        Key::Date(ms) => {
            out.push(TAG_DATE);
            out.extend_from_slice(&number::encode_number(*ms)?);
        }
        Key::String(s) => {
            out.push(TAG_STRING);
            binary::encode_bytes(s.as_bytes(), out);
        }
        Key::Binary(b) => {
            out.push(TAG_BINARY);
            binary::encode_bytes(b, out);
        }
        Key::Array(items) => {
            out.push(TAG_ARRAY);
            for item in items {
                encode_into(item, out)?;
            }
            out.push(TAG_ARRAY_END);
        }
    }
    Ok(())
}

/// Decode one key from the front of `data`.
///
/// Returns `(key, bytes_consumed)`; trailing bytes are left untouched.
pub fn decode_key(data: &[u8]) -> Result<(Key, usize), EncodingError> {
    let (&tag, rest) = data.split_first().ok_or(EncodingError::MalformedKey)?;
    match tag {
        TAG_NUMBER | TAG_DATE => {
            let arr: [u8; 8] = rest
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or(EncodingError::MalformedKey)?;
            let n = number::decode_number(arr);
            let key = if tag == TAG_NUMBER {
                Key::Number(n)
            } else {
                Key::Date(n)
            };
            Ok((key, 9))
        }
        TAG_STRING => {
            let (bytes, consumed) = binary::decode_bytes(rest)?;
            let s = String::from_utf8(bytes).map_err(|_| EncodingError::MalformedKey)?;
            Ok((Key::String(s), 1 + consumed))
        }
        TAG_BINARY => {
            let (bytes, consumed) = binary::decode_bytes(rest)?;
            Ok((Key::Binary(bytes), 1 + consumed))
        }
        TAG_ARRAY => {
            let mut items = Vec::new();
            let mut offset = 1;
            loop {
                match data.get(offset) {
                    Some(&TAG_ARRAY_END) => return Ok((Key::Array(items), offset + 1)),
                    Some(_) => {
                        let (item, consumed) = decode_key(&data[offset..])?;
                        items.push(item);
                        offset += consumed;
                    }
                    None => return Err(EncodingError::MalformedKey),
                }
            }
        }
        other => Err(EncodingError::InvalidTypeTag(other)),
    }
}

/// Decode a buffer that holds exactly one encoded key.
pub fn decode_exact(data: &[u8]) -> Result<Key, EncodingError> {
    let (key, consumed) = decode_key(data)?;
    if consumed != data.len() {
        return Err(EncodingError::MalformedKey);
    }
    Ok(key)
}

/// Smallest byte string greater than every string that starts with `prefix`.
///
/// Trailing `0xFF` bytes cannot be bumped, so they are dropped and the last
/// remaining byte is incremented. `None` when nothing is left: every string
/// with that prefix sorts last and there is no exclusive upper bound.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let keep = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut successor = prefix[..=keep].to_vec();
    successor[keep] += 1;
    Some(successor)
}
