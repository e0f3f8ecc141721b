use thiserror::Error;

/// A record that does not have the shape the gallery needs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("text annotation {index} has {count} vertices, expected 4")]
    VertexCount { index: usize, count: usize },

    #[error("text annotation {index} has no bounding polygon")]
    MissingPoly { index: usize },

    #[error("{kind} annotation {index} has no {field}")]
    MissingField {
        kind: &'static str,
        index: usize,
        field: &'static str,
    },

    #[error("{kind} annotation {index} is invalid: {message}")]
    InvalidField {
        kind: &'static str,
        index: usize,
        message: String,
    },

    #[error("response {index} reported an error: {message}")]
    ServiceError { index: usize, message: String },

    #[error("override line {line}: expected 3 tab-separated fields, found {found}")]
    OverrideFields { line: usize, found: usize },
}
