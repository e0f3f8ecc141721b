use serde::{Deserialize, Serialize};

use crate::core::geometry::BoundingPoly;

/// What to do with a record that fails validation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Abort the run with an error naming the file and record.
    Fail,
    /// Log a warning, drop the record and keep going.
    #[default]
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationResult {
    /// Stem of the result document, e.g. `12_3` for `12_3.json`.
    pub image_id: String,
    pub sort_key: Vec<u64>,
    /// Filename of the image the document describes.
    pub source_filename: String,
    pub text: Vec<TextAnnotation>,
    pub landmarks: Vec<EntityAnnotation>,
    pub labels: Vec<EntityAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextAnnotation {
    pub locale: String,
    pub description: String,
    pub bounding_poly: BoundingPoly,
}

/// A landmark or label detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityAnnotation {
    pub description: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_graph_id: Option<String>,
}

impl EntityAnnotation {
    /// Score as a two-decimal percentage, e.g. `97.31%`.
    pub fn score_label(&self) -> String {
        format!("{:.2}%", self.score * 100.0)
    }
}

/// Where a gallery row points: the thumbnail source and the click-through page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSource {
    pub item_page_url: String,
    pub image_url: String,
}
