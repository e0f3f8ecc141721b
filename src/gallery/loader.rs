use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::core::error::AnnotationError;
use crate::core::geometry::{BoundingPoly, Vertex};
use crate::core::model::{AnnotationResult, EntityAnnotation, MalformedPolicy, TextAnnotation};
use crate::core::ordering::numeric_key;

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    responses: Vec<RawResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    // Kept untyped and decoded one record at a time.
    #[serde(default)]
    text_annotations: Vec<Value>,
    #[serde(default)]
    landmark_annotations: Vec<Value>,
    #[serde(default)]
    label_annotations: Vec<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawText {
    locale: Option<String>,
    description: Option<String>,
    bounding_poly: Option<RawPoly>,
}

#[derive(Debug, Deserialize)]
struct RawPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    description: Option<String>,
    score: Option<f32>,
    #[serde(alias = "knowledgeGraphId")]
    mid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Reads per-image result documents into [`AnnotationResult`]s.
#[derive(Debug, Clone)]
pub struct ResultLoader {
    policy: MalformedPolicy,
    image_extension: String,
}

impl ResultLoader {
    pub fn new(policy: MalformedPolicy, image_extension: impl Into<String>) -> Self {
        Self {
            policy,
            image_extension: image_extension.into(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<AnnotationResult> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("not a file: {}", path.display()))?;
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.parse(&file_name, &contents)
    }

    /// Parses the document `file_name` from its JSON text.
    pub fn parse(&self, file_name: &str, json: &str) -> Result<AnnotationResult> {
        let document: RawDocument = serde_json::from_str(json)
            .with_context(|| format!("failed to parse result document {file_name}"))?;

        let image_id = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        };

        let mut result = AnnotationResult {
            source_filename: format!("{image_id}.{}", self.image_extension),
            sort_key: numeric_key(file_name),
            image_id,
            text: Vec::new(),
            landmarks: Vec::new(),
            labels: Vec::new(),
        };

        for (index, response) in document.responses.into_iter().enumerate() {
            if let Some(status) = response.error {
                let message = match serde_json::from_value::<RawStatus>(status.clone()) {
                    Ok(status) => format!("{} (code {})", status.message, status.code),
                    Err(_) => status.to_string(),
                };
                self.admit(file_name, AnnotationError::ServiceError { index, message })?;
            }

            for (index, value) in response.text_annotations.into_iter().enumerate() {
                match decode("text", index, value).and_then(|raw| text_annotation(index, raw)) {
                    Ok(text) => result.text.push(text),
                    Err(err) => self.admit(file_name, err)?,
                }
            }
            for (index, value) in response.landmark_annotations.into_iter().enumerate() {
                match decode("landmark", index, value)
                    .and_then(|raw| entity_annotation("landmark", index, raw))
                {
                    Ok(entity) => result.landmarks.push(entity),
                    Err(err) => self.admit(file_name, err)?,
                }
            }
            for (index, value) in response.label_annotations.into_iter().enumerate() {
                match decode("label", index, value)
                    .and_then(|raw| entity_annotation("label", index, raw))
                {
                    Ok(entity) => result.labels.push(entity),
                    Err(err) => self.admit(file_name, err)?,
                }
            }
        }

        Ok(result)
    }

    fn admit(&self, file_name: &str, err: AnnotationError) -> Result<()> {
        admit_malformed(self.policy, file_name, err)
    }
}

/// Applies `policy` to a malformed record found in `source`.
pub fn admit_malformed(policy: MalformedPolicy, source: &str, err: AnnotationError) -> Result<()> {
    match policy {
        MalformedPolicy::Fail => Err(anyhow::Error::new(err).context(format!("malformed record in {source}"))),
        MalformedPolicy::Skip => {
            warn!("{source}: {err}; skipping record");
            Ok(())
        }
    }
}

fn decode<T: DeserializeOwned>(
    kind: &'static str,
    index: usize,
    value: Value,
) -> Result<T, AnnotationError> {
    serde_json::from_value(value).map_err(|err| AnnotationError::InvalidField {
        kind,
        index,
        message: err.to_string(),
    })
}

fn text_annotation(index: usize, raw: RawText) -> Result<TextAnnotation, AnnotationError> {
    let description = raw.description.ok_or(AnnotationError::MissingField {
        kind: "text",
        index,
        field: "description",
    })?;
    let poly = raw.bounding_poly.ok_or(AnnotationError::MissingPoly { index })?;
    let count = poly.vertices.len();
    let vertices: [Vertex; 4] = poly
        .vertices
        .try_into()
        .map_err(|_| AnnotationError::VertexCount { index, count })?;

    Ok(TextAnnotation {
        locale: raw.locale.unwrap_or_default(),
        description,
        bounding_poly: BoundingPoly::new(vertices),
    })
}

fn entity_annotation(
    kind: &'static str,
    index: usize,
    raw: RawEntity,
) -> Result<EntityAnnotation, AnnotationError> {
    let description = raw.description.ok_or(AnnotationError::MissingField {
        kind,
        index,
        field: "description",
    })?;
    let score = raw.score.ok_or(AnnotationError::MissingField {
        kind,
        index,
        field: "score",
    })?;
    Ok(EntityAnnotation {
        description,
        score,
        knowledge_graph_id: raw.mid.filter(|mid| !mid.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = r#"{
      "responses": [{
        "labelAnnotations": [
          {"mid": "/m/01c8br", "description": "street", "score": 0.87},
          {"description": "town", "score": 0.52}
        ],
        "landmarkAnnotations": [
          {"mid": "/m/02j81", "description": "Eiffel Tower", "score": 0.93}
        ],
        "textAnnotations": [
          {
            "locale": "fr",
            "description": "RUE DE RIVOLI",
            "boundingPoly": {"vertices": [{"x": 10, "y": 10}, {"x": 50, "y": 10}, {"x": 50, "y": 40}, {"x": 10, "y": 40}]}
          },
          {
            "description": "RUE",
            "boundingPoly": {"vertices": [{"y": 10}, {"x": 20, "y": 10}, {"x": 20}, {}]}
          }
        ]
      }]
    }"#;

    const MALFORMED: &str = r#"{
      "responses": [{
        "labelAnnotations": [{"score": 0.4}, {"description": "river", "score": 0.8}],
        "textAnnotations": [
          {"description": "A", "boundingPoly": {"vertices": [{"x": 1}, {"x": 2}, {"x": 3}]}},
          {"description": "B", "boundingPoly": {"vertices": [{"x": 1}, {"x": 2}, {"x": 3}, {"x": 4}]}}
        ]
      }]
    }"#;

    #[test]
    fn loads_all_annotation_kinds() -> Result<()> {
        let loader = ResultLoader::new(MalformedPolicy::Fail, "png");
        let result = loader.parse("12_3.json", DOCUMENT)?;

        assert_eq!(result.image_id, "12_3");
        assert_eq!(result.source_filename, "12_3.png");
        assert_eq!(result.sort_key, vec![12, 3]);
        assert_eq!(result.labels.len(), 2);
        assert_eq!(result.labels[0].knowledge_graph_id.as_deref(), Some("/m/01c8br"));
        assert_eq!(result.labels[1].knowledge_graph_id, None);
        assert_eq!(result.landmarks[0].description, "Eiffel Tower");
        assert_eq!(result.text.len(), 2);
        assert_eq!(result.text[0].locale, "fr");
        Ok(())
    }

    #[test]
    fn omitted_coordinates_are_zero() -> Result<()> {
        let loader = ResultLoader::new(MalformedPolicy::Fail, "png");
        let result = loader.parse("1.json", DOCUMENT)?;
        let vertices = result.text[1].bounding_poly.vertices;
        assert_eq!(vertices[0], Vertex::new(0, 10));
        assert_eq!(vertices[3], Vertex::new(0, 0));
        assert_eq!(result.text[1].locale, "");
        Ok(())
    }

    #[test]
    fn skip_policy_drops_bad_records() -> Result<()> {
        let loader = ResultLoader::new(MalformedPolicy::Skip, "png");
        let result = loader.parse("4.json", MALFORMED)?;
        assert_eq!(result.labels.len(), 1);
        assert_eq!(result.labels[0].description, "river");
        assert_eq!(result.text.len(), 1);
        assert_eq!(result.text[0].description, "B");
        Ok(())
    }

    #[test]
    fn fail_policy_aborts_on_first_bad_record() {
        let loader = ResultLoader::new(MalformedPolicy::Fail, "png");
        let err = loader.parse("4.json", MALFORMED).unwrap_err();
        let cause = err.downcast_ref::<AnnotationError>().unwrap();
        assert_eq!(cause, &AnnotationError::VertexCount { index: 0, count: 3 });
        assert!(format!("{err:#}").contains("4.json"));
    }

    #[test]
    fn service_error_follows_policy() -> Result<()> {
        let json = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        let skip = ResultLoader::new(MalformedPolicy::Skip, "jpg");
        let result = skip.parse("9.json", json)?;
        assert!(result.text.is_empty());
        assert_eq!(result.source_filename, "9.jpg");

        let fail = ResultLoader::new(MalformedPolicy::Fail, "jpg");
        assert!(fail.parse("9.json", json).is_err());
        Ok(())
    }

    const WRONG_TYPES: &str = r#"{
      "responses": [{
        "labelAnnotations": [
          {"description": "bridge", "score": 0.9},
          {"description": "tower", "score": "0.4"},
          {"description": "river", "score": 0.7}
        ],
        "textAnnotations": [
          {"description": "A", "boundingPoly": {"vertices": [{"x": 1.5}, {"x": 2}, {"x": 3}, {"x": 4}]}},
          {"description": "B", "boundingPoly": {"vertices": [{"x": 1}, {"x": 2}, {"x": 3}, {"x": 4}]}}
        ]
      }]
    }"#;

    #[test]
    fn wrong_typed_records_are_skipped_alone() -> Result<()> {
        let loader = ResultLoader::new(MalformedPolicy::Skip, "png");
        let result = loader.parse("6.json", WRONG_TYPES)?;
        let labels: Vec<&str> = result.labels.iter().map(|l| l.description.as_str()).collect();
        assert_eq!(labels, vec!["bridge", "river"]);
        assert_eq!(result.text.len(), 1);
        assert_eq!(result.text[0].description, "B");
        Ok(())
    }

    #[test]
    fn wrong_typed_record_fails_under_fail_policy() {
        let loader = ResultLoader::new(MalformedPolicy::Fail, "png");
        let err = loader.parse("6.json", WRONG_TYPES).unwrap_err();
        let cause = err.downcast_ref::<AnnotationError>().unwrap();
        assert!(matches!(
            cause,
            AnnotationError::InvalidField { kind: "text", index: 0, .. }
        ));
    }

    #[test]
    fn invalid_json_is_an_error_under_any_policy() {
        let loader = ResultLoader::new(MalformedPolicy::Skip, "png");
        assert!(loader.parse("bad.json", "{not json").is_err());
    }
}
