//! Strict CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::{cmp_text_canonical, Value};

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR or use constructs
/// the canonical profile forbids (floats, indefinite lengths,
/// non-shortest encodings, unsorted or non-text map keys).
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode()?;
    Ok(value)
}

/// Maximum element count for arrays and maps.
/// Prevents allocation blowup from corrupt or hostile input.
const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum byte/string length.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// A strict CBOR decoder over a byte slice.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial = self.read_byte()?;
        let major_type = initial >> 5;
        let info = initial & 0x1f;

        match major_type {
            0 => {
                let n = self.decode_argument(info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::invalid_structure("integer out of i64 range"))
            }
            1 => {
                let n = self.decode_argument(info)?;
                // Negative integer: the value is -(argument + 1).
                i64::try_from(n)
                    .map(|n| Value::Integer(-n - 1))
                    .map_err(|_| CodecError::invalid_structure("integer out of i64 range"))
            }
            2 => self.decode_bytes(info),
            3 => Ok(Value::Text(self.decode_text(info)?)),
            4 => self.decode_array(info),
            5 => self.decode_map(info),
            6 => Err(CodecError::unsupported_type("tagged value")),
            7 => self.decode_simple(info),
            _ => unreachable!(),
        }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        if self.pos >= self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.data.len() - self.pos {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Decode a header argument, enforcing shortest-form encoding.
    fn decode_argument(&mut self, info: u8) -> CodecResult<u64> {
        match info {
            0..=23 => Ok(u64::from(info)),
            24 => {
                let byte = self.read_byte()?;
                if byte < 24 {
                    return Err(CodecError::invalid_structure("non-shortest integer form"));
                }
                Ok(u64::from(byte))
            }
            25 => {
                let bytes = self.read_bytes(2)?;
                let value = u16::from_be_bytes([bytes[0], bytes[1]]);
                if u8::try_from(value).is_ok() {
                    return Err(CodecError::invalid_structure("non-shortest integer form"));
                }
                Ok(u64::from(value))
            }
            26 => {
                let bytes = self.read_bytes(4)?;
                let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                if u16::try_from(value).is_ok() {
                    return Err(CodecError::invalid_structure("non-shortest integer form"));
                }
                Ok(u64::from(value))
            }
            27 => {
                let bytes = self.read_bytes(8)?;
                let value = u64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                if u32::try_from(value).is_ok() {
                    return Err(CodecError::invalid_structure("non-shortest integer form"));
                }
                Ok(value)
            }
            28..=30 => Err(CodecError::invalid_structure("reserved additional info")),
            31 => Err(CodecError::IndefiniteLengthForbidden),
            _ => unreachable!(),
        }
    }

    fn checked_len(&mut self, info: u8, max: u64) -> CodecResult<usize> {
        if info == 31 {
            return Err(CodecError::IndefiniteLengthForbidden);
        }
        let len = self.decode_argument(info)?;
        if len > max {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: max,
            });
        }
        Ok(len as usize)
    }

    fn decode_bytes(&mut self, info: u8) -> CodecResult<Value> {
        let len = self.checked_len(info, MAX_BYTES_LENGTH)?;
        Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
    }

    fn decode_text(&mut self, info: u8) -> CodecResult<String> {
        let len = self.checked_len(info, MAX_BYTES_LENGTH)?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn decode_array(&mut self, info: u8) -> CodecResult<Value> {
        let len = self.checked_len(info, MAX_CONTAINER_ELEMENTS)?;
        let mut items = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::Array(items))
    }

    fn decode_map(&mut self, info: u8) -> CodecResult<Value> {
        let len = self.checked_len(info, MAX_CONTAINER_ELEMENTS)?;
        let mut pairs = Vec::with_capacity(len.min(4096));
        let mut prev_key: Option<String> = None;

        for _ in 0..len {
            let initial = self.read_byte()?;
            if initial >> 5 != 3 {
                return Err(CodecError::NonTextKey);
            }
            let key = self.decode_text(initial & 0x1f)?;

            // Canonical maps have strictly increasing keys.
            if let Some(ref prev) = prev_key {
                if cmp_text_canonical(prev, &key) != std::cmp::Ordering::Less {
                    return Err(CodecError::invalid_structure("map keys not in sorted order"));
                }
            }

            let value = self.decode()?;
            prev_key = Some(key.clone());
            pairs.push((key, value));
        }

        Ok(Value::Map(pairs))
    }

    fn decode_simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 | 23 => Ok(Value::Null),
            24 => {
                let simple = self.read_byte()?;
                Err(CodecError::unsupported_type(format!(
                    "simple value {simple}"
                )))
            }
            25..=27 => Err(CodecError::FloatForbidden),
            31 => Err(CodecError::invalid_structure("break outside indefinite item")),
            _ => Err(CodecError::unsupported_type(format!("simple value {info}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_null_and_bools() {
        assert_eq!(from_cbor(&[0xf6]).unwrap(), Value::Null);
        assert_eq!(from_cbor(&[0xf4]).unwrap(), Value::Bool(false));
        assert_eq!(from_cbor(&[0xf5]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn decode_integers() {
        assert_eq!(from_cbor(&[0x00]).unwrap(), Value::Integer(0));
        assert_eq!(from_cbor(&[0x17]).unwrap(), Value::Integer(23));
        assert_eq!(from_cbor(&[0x18, 24]).unwrap(), Value::Integer(24));
        assert_eq!(from_cbor(&[0x19, 0x01, 0x00]).unwrap(), Value::Integer(256));
        assert_eq!(from_cbor(&[0x20]).unwrap(), Value::Integer(-1));
        assert_eq!(from_cbor(&[0x38, 99]).unwrap(), Value::Integer(-100));
    }

    #[test]
    fn decode_bytes_and_text() {
        assert_eq!(
            from_cbor(&[0x43, 1, 2, 3]).unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );
        assert_eq!(
            from_cbor(&[0x61, b'a']).unwrap(),
            Value::Text("a".to_string())
        );
    }

    #[test]
    fn decode_array() {
        assert_eq!(from_cbor(&[0x80]).unwrap(), Value::Array(vec![]));
        assert_eq!(
            from_cbor(&[0x82, 0x01, 0x02]).unwrap(),
            Value::Array(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn decode_map() {
        assert_eq!(
            from_cbor(&[0xa1, 0x61, b'a', 0x01]).unwrap(),
            Value::Map(vec![("a".to_string(), Value::Integer(1))])
        );
    }

    #[test]
    fn reject_float() {
        assert!(matches!(
            from_cbor(&[0xf9, 0x00, 0x00]),
            Err(CodecError::FloatForbidden)
        ));
        assert!(matches!(
            from_cbor(&[0xfb, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(CodecError::FloatForbidden)
        ));
    }

    #[test]
    fn reject_indefinite_length() {
        assert!(matches!(
            from_cbor(&[0x9f, 0x01, 0xff]),
            Err(CodecError::IndefiniteLengthForbidden)
        ));
        assert!(matches!(
            from_cbor(&[0x5f, 0x41, b'a', 0xff]),
            Err(CodecError::IndefiniteLengthForbidden)
        ));
    }

    #[test]
    fn reject_non_shortest_encoding() {
        assert!(matches!(
            from_cbor(&[0x18, 23]),
            Err(CodecError::InvalidStructure { .. })
        ));
        assert!(matches!(
            from_cbor(&[0x19, 0x00, 0xff]),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_unsorted_map_keys() {
        assert!(matches!(
            from_cbor(&[0xa2, 0x61, b'b', 0x01, 0x61, b'a', 0x02]),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_non_text_map_key() {
        assert!(matches!(
            from_cbor(&[0xa1, 0x01, 0x01]),
            Err(CodecError::NonTextKey)
        ));
    }

    #[test]
    fn unexpected_eof() {
        assert!(matches!(from_cbor(&[]), Err(CodecError::UnexpectedEof)));
        assert!(matches!(
            from_cbor(&[0x19, 0x01]),
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        assert!(matches!(
            from_cbor(&[0x62, 0xff, 0xfe]),
            Err(CodecError::InvalidUtf8)
        ));
    }
}
