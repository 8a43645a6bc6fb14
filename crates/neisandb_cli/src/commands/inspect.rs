//! Inspect command implementation.

use std::collections::HashSet;
use std::path::Path;

/// Runs the inspect command.
pub async fn run(path: &Path, page_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("no page file at {}", path.display()).into());
    }

    let pages = super::walk_pages(path, page_size).await?;
    let file_size: u64 = std::fs::metadata(path)?.len();

    let mut entries = 0usize;
    let mut live = 0usize;
    let mut tombstones = 0usize;
    let mut max_id: Option<u32> = None;
    let mut max_lsn: Option<u64> = None;
    let mut corrupt = 0usize;
    let mut visited: HashSet<u32> = HashSet::new();

    // Pages arrive newest first, so the first version seen per id is
    // the authoritative one.
    for (_, _, result) in &pages {
        match result {
            Ok(Some(tree)) => {
                entries += tree.len();
                max_id = max_id.max(tree.max_id());
                max_lsn = max_lsn.max(tree.max_lsn());
                for (key, value) in tree.iter_desc() {
                    if !visited.insert(key.id) {
                        continue;
                    }
                    if value.is_deleted() {
                        tombstones += 1;
                    } else {
                        live += 1;
                    }
                }
            }
            Ok(None) => {}
            Err(_) => corrupt += 1,
        }
    }

    println!("NeisanDB Page File Inspection");
    println!("=============================");
    println!("Path:             {}", path.display());
    println!("File size:        {file_size} bytes");
    println!("Pages:            {}", pages.len());
    println!("Record versions:  {entries}");
    println!("Live documents:   {live}");
    println!("Tombstoned ids:   {tombstones}");
    if let Some(max_id) = max_id {
        println!("Max id:           {max_id}");
    }
    if let Some(max_lsn) = max_lsn {
        println!("Max LSN:          {max_lsn}");
    }
    if corrupt > 0 {
        println!("Corrupt pages:    {corrupt} (run `neisandb verify` for detail)");
    }

    Ok(())
}
