pub mod discovery;
pub mod loader;
pub mod overrides;
pub mod resolve;

use anyhow::Result;
use serde::Serialize;

use crate::core::model::{AnnotationResult, ImageSource};

pub use discovery::discover_results;
pub use loader::ResultLoader;
pub use overrides::OverrideTable;
pub use resolve::UrlResolver;

pub const DEFAULT_PAGE_SIZE: usize = 32;

/// Written next to the pages; never treated as a result document.
pub const MANIFEST_FILE: &str = "gallery.json";

/// A batch of results destined for one HTML document, numbered from 1.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: usize,
    pub results: Vec<AnnotationResult>,
}

/// `ceil(total / page_size)`, but never less than one page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

pub fn paginate(results: Vec<AnnotationResult>, page_size: usize) -> Result<Vec<Page>> {
    if page_size == 0 {
        anyhow::bail!("page size must be at least 1");
    }
    let count = page_count(results.len(), page_size);
    let mut pages: Vec<Page> = (1..=count)
        .map(|number| Page {
            number,
            results: Vec::with_capacity(page_size),
        })
        .collect();
    for (idx, result) in results.into_iter().enumerate() {
        pages[idx / page_size].results.push(result);
    }
    Ok(pages)
}

/// One rendered table row.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryRow {
    pub result: AnnotationResult,
    pub source: ImageSource,
    /// Pixel size of the local image, when it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedItem {
    pub image_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryPage {
    pub number: usize,
    pub rows: Vec<GalleryRow>,
    pub skipped: Vec<SkippedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gallery {
    pub pages: Vec<GalleryPage>,
}

impl Gallery {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|page| page.rows.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.pages.iter().map(|page| page.skipped.len()).sum()
    }
}
