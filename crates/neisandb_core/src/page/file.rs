//! Whole-page file I/O.

use crate::config::PAGE_HEADER_LEN;
use crate::error::{CoreError, CoreResult};
use crate::page::tree::PageTree;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

/// Fixed-size page I/O over a single collection file.
///
/// Every operation works in whole-page units at page-aligned offsets,
/// so a page is either entirely present or entirely absent; partial
/// writes cannot occur by construction. No file handle is retained
/// across operations; each call opens and closes the file, keeping
/// descriptor lifetimes out of suspension points.
#[derive(Debug, Clone)]
pub struct PageFile {
    path: PathBuf,
    page_size: usize,
}

impl PageFile {
    /// Creates a page file handle for the given path.
    pub fn new(path: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            path: path.into(),
            page_size,
        }
    }

    /// Returns the path to the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configured page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Creates the file and its parent directories if missing.
    pub async fn ensure_exists(&self) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        Ok(())
    }

    /// Returns the file size in bytes, or 0 if the file does not exist.
    pub async fn size(&self) -> CoreResult<u64> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads and decodes the page at the given byte position.
    ///
    /// Returns `Ok(None)` when the file ends at or before `position`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::CorruptPage`] if the page's length prefix
    /// or body cannot be decoded into a page tree.
    pub async fn read_page(&self, position: u64) -> CoreResult<Option<PageTree>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        file.seek(SeekFrom::Start(position)).await?;
        let mut buffer = vec![0u8; self.page_size];
        let mut read = 0usize;
        while read < buffer.len() {
            let n = file.read(&mut buffer[read..]).await?;
            if n == 0 {
                break;
            }
            read += n;
        }

        if read == 0 {
            return Ok(None);
        }
        if read < PAGE_HEADER_LEN {
            return Err(CoreError::corrupt_page(position, "short page header"));
        }

        let body_len = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
        let body_end = PAGE_HEADER_LEN
            .checked_add(body_len)
            .filter(|end| *end <= read)
            .ok_or_else(|| CoreError::corrupt_page(position, "length prefix exceeds page"))?;

        let tree = PageTree::decode(&buffer[PAGE_HEADER_LEN..body_end], position)?;
        debug!(position, entries = tree.len(), "read page");
        Ok(Some(tree))
    }

    /// Encodes and writes a page tree at the given byte position.
    ///
    /// The full `page_size` buffer is written in one call at a
    /// page-aligned offset: the little-endian body length, four reserved
    /// bytes, the encoded tree, zero padding.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::PageOverflow`] if the encoded tree does
    /// not fit in the page payload.
    pub async fn write_page(&self, position: u64, tree: &PageTree) -> CoreResult<()> {
        let encoded = tree.encode()?;
        let max = self.page_size - PAGE_HEADER_LEN;
        if encoded.len() > max {
            return Err(CoreError::PageOverflow {
                encoded_len: encoded.len(),
                max,
            });
        }

        let mut buffer = vec![0u8; self.page_size];
        buffer[..4].copy_from_slice(&(encoded.len() as u32).to_le_bytes());
        buffer[PAGE_HEADER_LEN..PAGE_HEADER_LEN + encoded.len()].copy_from_slice(&encoded);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        file.seek(SeekFrom::Start(position)).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        debug!(position, entries = tree.len(), bytes = encoded.len(), "wrote page");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::page::tree::{PageValue, RecordKey};
    use tempfile::tempdir;

    const PAGE: usize = 4096;

    fn sample_tree(entries: u32) -> PageTree {
        let mut tree = PageTree::new();
        for i in 0..entries {
            tree.set(
                RecordKey::new(i, u64::from(i)),
                PageValue::Live(Document::new().with("n", i64::from(i))),
            );
        }
        tree
    }

    #[tokio::test]
    async fn read_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let file = PageFile::new(dir.path().join("absent.nsdb"), PAGE);
        assert!(file.read_page(0).await.unwrap().is_none());
        assert_eq!(file.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_past_end_is_none() {
        let dir = tempdir().unwrap();
        let file = PageFile::new(dir.path().join("t.nsdb"), PAGE);
        file.write_page(0, &sample_tree(3)).await.unwrap();
        assert!(file.read_page(PAGE as u64).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let file = PageFile::new(dir.path().join("t.nsdb"), PAGE);
        let tree = sample_tree(5);

        file.write_page(0, &tree).await.unwrap();
        let read = file.read_page(0).await.unwrap().unwrap();
        assert_eq!(read, tree);
        assert_eq!(file.size().await.unwrap(), PAGE as u64);
    }

    #[tokio::test]
    async fn pages_are_independent_slots() {
        let dir = tempdir().unwrap();
        let file = PageFile::new(dir.path().join("t.nsdb"), PAGE);

        let first = sample_tree(2);
        let mut second = PageTree::new();
        second.set(RecordKey::new(9, 9), PageValue::Deleted);

        file.write_page(0, &first).await.unwrap();
        file.write_page(PAGE as u64, &second).await.unwrap();

        assert_eq!(file.read_page(0).await.unwrap().unwrap(), first);
        assert_eq!(file.read_page(PAGE as u64).await.unwrap().unwrap(), second);
        assert_eq!(file.size().await.unwrap(), 2 * PAGE as u64);
    }

    #[tokio::test]
    async fn overwrite_in_place() {
        let dir = tempdir().unwrap();
        let file = PageFile::new(dir.path().join("t.nsdb"), PAGE);

        file.write_page(0, &sample_tree(2)).await.unwrap();
        let grown = sample_tree(4);
        file.write_page(0, &grown).await.unwrap();

        assert_eq!(file.read_page(0).await.unwrap().unwrap(), grown);
        assert_eq!(file.size().await.unwrap(), PAGE as u64);
    }

    #[tokio::test]
    async fn oversized_tree_is_fatal() {
        let dir = tempdir().unwrap();
        // A page too small for even a handful of entries.
        let file = PageFile::new(dir.path().join("t.nsdb"), 32);
        let result = file.write_page(0, &sample_tree(10)).await;
        assert!(matches!(result, Err(CoreError::PageOverflow { .. })));
    }

    #[tokio::test]
    async fn corrupt_body_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.nsdb");
        let file = PageFile::new(&path, PAGE);
        file.write_page(0, &sample_tree(1)).await.unwrap();

        // Stamp garbage over the body while keeping the length prefix.
        let mut bytes = std::fs::read(&path).unwrap();
        for b in &mut bytes[PAGE_HEADER_LEN..PAGE_HEADER_LEN + 4] {
            *b = 0xff;
        }
        std::fs::write(&path, &bytes).unwrap();

        assert!(file.read_page(0).await.is_err());
    }

    #[tokio::test]
    async fn ensure_exists_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("t.nsdb");
        let file = PageFile::new(&path, PAGE);
        file.ensure_exists().await.unwrap();
        assert!(path.exists());
    }
}
