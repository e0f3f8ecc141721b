use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    LabelDetection,
    LandmarkDetection,
    TextDetection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub max_results: u32,
}

impl Feature {
    pub fn new(kind: FeatureType, max_results: u32) -> Self {
        Self { kind, max_results }
    }
}

/// Labels top-10, landmarks top-3, text top-10.
pub fn default_features() -> Vec<Feature> {
    vec![
        Feature::new(FeatureType::LabelDetection, 10),
        Feature::new(FeatureType::LandmarkDetection, 3),
        Feature::new(FeatureType::TextDetection, 10),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateRequest {
    pub requests: Vec<ImageRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageContent {
    /// Base64 of the raw file bytes.
    pub content: String,
}

impl AnnotateRequest {
    pub fn for_image(bytes: &[u8], features: &[Feature]) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(bytes),
                },
                features: features.to_vec(),
            }],
        }
    }
}
