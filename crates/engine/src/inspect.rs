//! Output Inspector: page counts and page-range extraction over finished PDFs.

use std::sync::LazyLock;

use anyhow::Context as _;
use log::{debug, warn};
use pdf::file::FileOptions;
use regex::bytes::Regex;

static PAGE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/Type\s*/Page\b").expect("page object pattern"));

/// Authoritative page count, falling back to a byte scan when the document
/// cannot be parsed. Never returns zero.
pub fn page_count(output: &[u8]) -> usize {
    match structural_page_count(output) {
        Ok(count) => count.max(1),
        Err(err) => {
            warn!("structural page count failed, scanning bytes: {err:#}");
            heuristic_page_count(output)
        }
    }
}

pub fn structural_page_count(output: &[u8]) -> anyhow::Result<usize> {
    let file = FileOptions::cached()
        .load(output.to_vec())
        .context("parse pdf page tree")?;
    Ok(file.num_pages() as usize)
}

/// Counts `/Type /Page` markers (not `/Pages`) in the raw bytes; at least 1.
pub fn heuristic_page_count(output: &[u8]) -> usize {
    PAGE_OBJECT.find_iter(output).count().max(1)
}

/// Returns a document holding only pages `start_page ..= start_page + page_count - 1`.
///
/// `start_page <= 1` with `page_count <= 0` is the whole document and comes back
/// unchanged. Otherwise the end is computed from the requested start and
/// clamped to the page total, then the start is clamped to 1. Any failure, or a
/// range that is empty after clamping, yields the input unchanged.
pub fn extract_range(output: &[u8], start_page: i32, page_count: i32) -> Vec<u8> {
    if start_page <= 1 && page_count <= 0 {
        return output.to_vec();
    }
    match try_extract_range(output, start_page, page_count) {
        Ok(Some(extracted)) => extracted,
        Ok(None) => {
            debug!("page range {start_page}+{page_count} is empty, keeping full document");
            output.to_vec()
        }
        Err(err) => {
            warn!("page range extraction failed, keeping full document: {err:#}");
            output.to_vec()
        }
    }
}

pub fn try_extract_range(
    output: &[u8],
    start_page: i32,
    page_count: i32,
) -> anyhow::Result<Option<Vec<u8>>> {
    let mut document = lopdf::Document::load_mem(output).context("load pdf for extraction")?;
    let pages = document.get_pages();
    let total = pages.len() as i64;

    let end = (i64::from(start_page) + i64::from(page_count) - 1).min(total);
    let start = i64::from(start_page).max(1);
    if start > end {
        return Ok(None);
    }

    let doomed: Vec<u32> = pages
        .keys()
        .copied()
        .filter(|&number| i64::from(number) < start || i64::from(number) > end)
        .collect();
    if !doomed.is_empty() {
        document.delete_pages(&doomed);
        document.prune_objects();
        document.renumber_objects();
    }

    let mut extracted = Vec::new();
    document
        .save_to(&mut extracted)
        .context("serialize extracted pages")?;
    Ok(Some(extracted))
}
