use std::path::PathBuf;

use log::{debug, warn};

use crate::core::model::{AnnotationResult, ImageSource};
use crate::core::ordering::leading_numeric_id;
use crate::gallery::{GalleryPage, GalleryRow, OverrideTable, Page, SkippedItem};

pub const DEFAULT_IMAGE_BASE_URL: &str = "http://dl.wdl.org/";
pub const DEFAULT_ITEM_URL_TEMPLATE: &str = "https://www.wdl.org/en/item/{id}/";

/// Turns results into rows: picks URLs and checks the image is on disk.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    overrides: OverrideTable,
    image_dir: PathBuf,
    image_base_url: String,
    item_url_template: String,
    require_local_images: bool,
}

impl UrlResolver {
    pub fn new(overrides: OverrideTable, image_dir: PathBuf) -> Self {
        Self {
            overrides,
            image_dir,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            item_url_template: DEFAULT_ITEM_URL_TEMPLATE.to_string(),
            require_local_images: true,
        }
    }

    pub fn with_image_base_url(mut self, url: String) -> Self {
        self.image_base_url = url;
        self
    }

    /// `{id}` in the template is replaced by the filename's numeric id.
    pub fn with_item_url_template(mut self, template: String) -> Self {
        self.item_url_template = template;
        self
    }

    pub fn with_require_local_images(mut self, require: bool) -> Self {
        self.require_local_images = require;
        self
    }

    /// Override table first, then the default URL rules.
    pub fn source_for(&self, filename: &str) -> ImageSource {
        if let Some(source) = self.overrides.get(filename) {
            return source.clone();
        }
        let image_url = format!("{}{}", self.image_base_url, filename);
        let item_page_url = match leading_numeric_id(filename) {
            Some(id) => self.item_url_template.replace("{id}", &id),
            None => image_url.clone(),
        };
        ImageSource {
            item_page_url,
            image_url,
        }
    }

    pub fn resolve_page(&self, page: Page) -> GalleryPage {
        let mut rows = Vec::with_capacity(page.results.len());
        let mut skipped = Vec::new();
        for result in page.results {
            match self.resolve(result) {
                Ok(row) => rows.push(row),
                Err(item) => skipped.push(item),
            }
        }
        GalleryPage {
            number: page.number,
            rows,
            skipped,
        }
    }

    fn resolve(&self, result: AnnotationResult) -> Result<GalleryRow, SkippedItem> {
        let local = self.image_dir.join(&result.source_filename);
        if !local.is_file() {
            if self.require_local_images {
                warn!(
                    "{}: image {} not found, skipping",
                    result.image_id,
                    local.display()
                );
                return Err(SkippedItem {
                    image_id: result.image_id,
                    reason: format!("missing local image {}", local.display()),
                });
            }
            return Ok(GalleryRow {
                source: self.source_for(&result.source_filename),
                result,
                natural_size: None,
            });
        }

        let natural_size = match image::image_dimensions(&local) {
            Ok(size) => Some(size),
            Err(err) => {
                debug!("could not read dimensions of {}: {err}", local.display());
                None
            }
        };
        Ok(GalleryRow {
            source: self.source_for(&result.source_filename),
            result,
            natural_size,
        })
    }
}
