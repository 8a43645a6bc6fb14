//! Verify command implementation.

use std::path::Path;

/// Runs the verify command.
///
/// Decodes every page and reports the first corruption found. Exits
/// with an error when any page fails to decode.
pub async fn run(path: &Path, page_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("no page file at {}", path.display()).into());
    }

    let pages = super::walk_pages(path, page_size).await?;
    let total = pages.len();
    let mut failures = Vec::new();

    for (index, position, result) in pages {
        match result {
            Ok(Some(_)) => {}
            Ok(None) => failures.push((index, position, "page is missing".to_string())),
            Err(error) => failures.push((index, position, error.to_string())),
        }
    }

    if failures.is_empty() {
        println!("OK: {total} page(s) decoded cleanly");
        return Ok(());
    }

    for (index, position, message) in &failures {
        println!("page {index} (byte {position}): {message}");
    }
    Err(format!("{} of {total} page(s) failed verification", failures.len()).into())
}
