use rayon::prelude::*;
use tantivy::IndexWriter;

use crate::{
    error::Result,
    page_ref::PageRef,
    partition::PartitionIndex,
    walker::DiscoveredPage,
};

/// Extract a title from page content.
///
/// Looks for the first markdown heading (line starting with `# `).
/// Falls back to the page name.
fn extract_title(content: &str, page_name: &str) -> String {
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            let title = heading.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }
    page_name.to_string()
}

/// Ingest a batch of discovered pages into a partition index.
///
/// For each page: reads content, extracts the title, builds the page
/// reference from the page's wiki coordinates, and adds it to the
/// index. Commits the batch at the end and returns the number of pages
/// scheduled.
pub fn ingest_pages(
    index: &PartitionIndex,
    writer: &mut IndexWriter,
    pages: &[DiscoveredPage],
) -> Result<usize> {
    let partition = index.name().to_string();

    // Read files in parallel, then index sequentially.
    let loaded: Vec<_> = pages
        .par_iter()
        .filter_map(|page| {
            let content =
                std::fs::read_to_string(&page.absolute_path).ok()?;
            let title = extract_title(&content, &page.name);
            let page_ref = PageRef::from_page(&partition, page);
            let rel_path =
                page.relative_path.to_string_lossy().to_string();
            Some((page_ref, rel_path, title, content, page.mtime))
        })
        .collect();

    for (page_ref, rel_path, title, content, mtime) in &loaded {
        index.add_page(
            writer,
            &page_ref.full_name(),
            page_ref.numeric_id(),
            rel_path,
            &page_ref.language,
            title,
            content,
            *mtime,
        )?;
    }

    writer.commit()?;
    Ok(loaded.len())
}
