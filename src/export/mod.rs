pub mod html_gallery_export;
pub mod json_export;

use anyhow::Result;

use crate::gallery::Gallery;

pub use html_gallery_export::HtmlGalleryExporter;
pub use json_export::ManifestExporter;

pub trait Exporter {
    fn export(&self, gallery: &Gallery) -> Result<()>;
}
