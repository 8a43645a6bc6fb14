//! CLI command implementations.

pub mod dump_pages;
pub mod inspect;
pub mod verify;

use neisandb_core::{CoreResult, PageFile, PageTree};
use std::path::Path;

/// Reads every page of a file, newest first, yielding
/// `(page_index, position, decode result)`.
pub(crate) async fn walk_pages(
    path: &Path,
    page_size: usize,
) -> CoreResult<Vec<(u64, u64, CoreResult<Option<PageTree>>)>> {
    let file = PageFile::new(path, page_size);
    let size = file.size().await?;
    let pages = size / page_size as u64;

    let mut results = Vec::with_capacity(pages as usize);
    for index in (0..pages).rev() {
        let position = index * page_size as u64;
        results.push((index, position, file.read_page(position).await));
    }
    Ok(results)
}
