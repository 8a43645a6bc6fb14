//! # NeisanDB Codec
//!
//! Canonical CBOR encoding/decoding for NeisanDB documents and pages.
//!
//! The encoding is deterministic: identical values always produce
//! identical bytes, across platforms and library versions. That property
//! is load-bearing: page files are compared, hashed, and re-read by
//! tooling that assumes byte stability.
//!
//! ## Canonical rules
//!
//! - Map keys are UTF-8 text, sorted by encoded form
//! - Integers use the shortest encoding
//! - No floats
//! - No indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use neisandb_codec::{from_cbor, to_canonical_cbor, Value};
//!
//! let value = Value::map(vec![("answer".to_string(), Value::Integer(42))]);
//! let bytes = to_canonical_cbor(&value).unwrap();
//! let decoded = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, Decoder};
pub use encoder::{to_canonical_cbor, Encoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
