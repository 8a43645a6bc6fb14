//! Canonical CBOR encoder.

use crate::error::CodecResult;
use crate::value::{cmp_text_canonical, Value};

/// Encode a value to canonical CBOR bytes.
///
/// Output is deterministic per RFC 8949 section 4.2.1: map keys sorted
/// by encoded form, shortest-form integer arguments, no
/// indefinite-length items.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A canonical CBOR encoder over a growable buffer.
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value into the buffer.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => {
                self.buffer.push(0xf6);
                Ok(())
            }
            Value::Bool(b) => {
                self.buffer.push(if *b { 0xf5 } else { 0xf4 });
                Ok(())
            }
            Value::Integer(n) => {
                self.encode_integer(*n);
                Ok(())
            }
            Value::Bytes(b) => {
                self.encode_header(2, b.len() as u64);
                self.buffer.extend_from_slice(b);
                Ok(())
            }
            Value::Text(s) => {
                self.encode_text(s);
                Ok(())
            }
            Value::Array(items) => {
                self.encode_header(4, items.len() as u64);
                for item in items {
                    self.encode(item)?;
                }
                Ok(())
            }
            Value::Map(pairs) => self.encode_map(pairs),
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_header(0, n as u64);
        } else {
            // CBOR negative integers carry -(n+1) as the argument,
            // so -1 encodes argument 0. Safe for the full i64 range.
            self.encode_header(1, (-(n + 1)) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_header(&mut self, major_type: u8, argument: u64) {
        let mt = major_type << 5;

        if argument < 24 {
            self.buffer.push(mt | (argument as u8));
        } else if u8::try_from(argument).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(argument as u8);
        } else if u16::try_from(argument).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer
                .extend_from_slice(&(argument as u16).to_be_bytes());
        } else if u32::try_from(argument).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer
                .extend_from_slice(&(argument as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&argument.to_be_bytes());
        }
    }

    fn encode_text(&mut self, text: &str) {
        self.encode_header(3, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }

    fn encode_map(&mut self, pairs: &[(String, Value)]) -> CodecResult<()> {
        // Sort keys canonically regardless of how the map was built.
        let mut ordered: Vec<&(String, Value)> = pairs.iter().collect();
        ordered.sort_by(|a, b| cmp_text_canonical(&a.0, &b.0));

        self.encode_header(5, pairs.len() as u64);
        for (key, value) in ordered {
            self.encode_text(key);
            self.encode(value)?;
        }
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
