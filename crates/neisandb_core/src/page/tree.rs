//! In-memory page trees.
//!
//! A page tree is the mutable heart of a collection: an ordered map from
//! `(id, lsn)` to a live document or a tombstone. Ordering is primary by
//! id, secondary by LSN, so all versions of an id are adjacent and the
//! newest version of an id is the greatest key in its group. Within one
//! page the tree is append-only; rotation seals it and starts a new one.

use crate::document::Document;
use crate::error::{CoreError, CoreResult};
use neisandb_codec::{from_cbor, to_canonical_cbor, Value};
use std::collections::BTreeMap;

/// Key of one record version.
///
/// Derived `Ord` gives the load-bearing ordering: id ascending, then
/// LSN ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Document id.
    pub id: u32,
    /// Log sequence number of this version.
    pub lsn: u64,
}

impl RecordKey {
    /// Creates a key.
    pub const fn new(id: u32, lsn: u64) -> Self {
        Self { id, lsn }
    }
}

/// Value of one record version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageValue {
    /// A live document.
    Live(Document),
    /// A tombstone shadowing earlier versions of the same id.
    Deleted,
}

impl PageValue {
    /// Returns the document if this version is live.
    pub fn document(&self) -> Option<&Document> {
        match self {
            PageValue::Live(doc) => Some(doc),
            PageValue::Deleted => None,
        }
    }

    /// Returns true for tombstones.
    pub fn is_deleted(&self) -> bool {
        matches!(self, PageValue::Deleted)
    }
}

/// An ordered map of record versions bounded by the collection's tree
/// capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTree {
    entries: BTreeMap<RecordKey, PageValue>,
}

impl PageTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record version.
    pub fn set(&mut self, key: RecordKey, value: PageValue) {
        self.entries.insert(key, value);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true once the tree has reached the rotation threshold.
    pub fn is_full(&self, capacity: usize) -> bool {
        self.entries.len() >= capacity
    }

    /// Floor lookup: the largest stored key `<=` the probe.
    ///
    /// Probing `(id, snapshot_lsn)` finds the newest version of `id`
    /// visible at that snapshot, or a key from a smaller id if `id` has
    /// no versions here, so callers check `key.id`.
    pub fn floor(&self, probe: RecordKey) -> Option<(&RecordKey, &PageValue)> {
        self.entries.range(..=probe).next_back()
    }

    /// Iterates entries in descending key order (newest version of the
    /// largest id first).
    pub fn iter_desc(&self) -> impl Iterator<Item = (&RecordKey, &PageValue)> {
        self.entries.iter().rev()
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &PageValue)> {
        self.entries.iter()
    }

    /// Largest id stored in this tree.
    pub fn max_id(&self) -> Option<u32> {
        self.entries.keys().next_back().map(|k| k.id)
    }

    /// Largest LSN stored in this tree.
    ///
    /// LSNs are not the primary sort key, so this scans.
    pub fn max_lsn(&self) -> Option<u64> {
        self.entries.keys().map(|k| k.lsn).max()
    }

    /// Encodes the tree to its canonical wire form.
    ///
    /// The wire form is a CBOR array of entries in ascending key order.
    /// A live entry is `[id, lsn, document]`; a tombstone is `[id, lsn]`,
    /// which no document can be mistaken for.
    #[allow(clippy::cast_possible_wrap)]
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let entries: Vec<Value> = self
            .entries
            .iter()
            .map(|(key, value)| {
                let mut entry = vec![
                    Value::Integer(i64::from(key.id)),
                    Value::Integer(key.lsn as i64),
                ];
                if let PageValue::Live(doc) = value {
                    entry.push(doc.to_value());
                }
                Value::Array(entry)
            })
            .collect();
        Ok(to_canonical_cbor(&Value::Array(entries))?)
    }

    /// Decodes a tree from its wire form.
    ///
    /// `position` is the page's byte offset, used only for error
    /// reporting.
    pub fn decode(bytes: &[u8], position: u64) -> CoreResult<Self> {
        let value = from_cbor(bytes)?;
        let entries = value
            .as_array()
            .ok_or_else(|| CoreError::corrupt_page(position, "page body is not an entry array"))?;

        let mut tree = PageTree::new();
        for entry in entries {
            let parts = entry
                .as_array()
                .ok_or_else(|| CoreError::corrupt_page(position, "entry is not an array"))?;
            let (id, lsn) = match parts {
                [id, lsn] | [id, lsn, _] => {
                    let id = id
                        .as_integer()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| CoreError::corrupt_page(position, "entry id is not a u32"))?;
                    let lsn = lsn
                        .as_integer()
                        .and_then(|n| u64::try_from(n).ok())
                        .ok_or_else(|| CoreError::corrupt_page(position, "entry lsn is not a u64"))?;
                    (id, lsn)
                }
                _ => {
                    return Err(CoreError::corrupt_page(
                        position,
                        format!("entry has {} elements, expected 2 or 3", parts.len()),
                    ))
                }
            };
            let value = match parts.get(2) {
                Some(doc) => PageValue::Live(Document::from_value(doc).map_err(|_| {
                    CoreError::corrupt_page(position, "entry payload is not a document map")
                })?),
                None => PageValue::Deleted,
            };
            tree.set(RecordKey::new(id, lsn), value);
        }
        Ok(tree)
    }
}
