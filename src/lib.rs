pub mod core;
pub mod export;
pub mod fetch;
pub mod gallery;
pub mod pipeline;

pub use crate::core::model::{AnnotationResult, EntityAnnotation, MalformedPolicy, TextAnnotation};
pub use gallery::{Gallery, GalleryPage, GalleryRow, Page};
