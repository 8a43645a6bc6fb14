//! Dump-pages command implementation.

use std::path::Path;

/// Runs the dump-pages command.
pub async fn run(
    path: &Path,
    page_size: usize,
    page: Option<u64>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("no page file at {}", path.display()).into());
    }

    let mut pages = super::walk_pages(path, page_size).await?;
    // Oldest first reads better for a dump.
    pages.reverse();

    let limit = limit.unwrap_or(usize::MAX);
    let mut printed = 0usize;

    for (index, position, result) in pages {
        if page.is_some_and(|wanted| wanted != index) {
            continue;
        }

        match result {
            Ok(Some(tree)) => {
                println!("page {index} @ byte {position}: {} entries", tree.len());
                for (key, value) in tree.iter() {
                    if printed >= limit {
                        println!("  ... (limit reached)");
                        return Ok(());
                    }
                    match value.document() {
                        Some(doc) => {
                            println!(
                                "  id={} lsn={} live ({} fields)",
                                key.id,
                                key.lsn,
                                doc.len()
                            );
                        }
                        None => println!("  id={} lsn={} tombstone", key.id, key.lsn),
                    }
                    printed += 1;
                }
            }
            Ok(None) => println!("page {index} @ byte {position}: missing"),
            Err(error) => println!("page {index} @ byte {position}: CORRUPT ({error})"),
        }
    }

    Ok(())
}
