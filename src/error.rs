use crate::models::EntityKind;
use thiserror::Error;

/// Why a dump line produced no entity. Every variant is recoverable: the line is
/// counted, logged and the stream moves on.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("no supported type marker in the prefix columns")]
    NoTypeMarker,
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("declared type {declared} disagrees with prefix marker {marker}")]
    TypeMismatch {
        declared: EntityKind,
        marker: EntityKind,
    },
    #[error("declared type '{0}' is not an enabled entity kind")]
    UnsupportedType(String),
    #[error("record has no key")]
    MissingId,
    #[error("key '{0}' does not carry a valid entity id")]
    InvalidId(String),
}

impl SkipReason {
    /// Short stable label used for statistics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NoTypeMarker => "no_marker",
            SkipReason::InvalidJson(_) => "invalid_json",
            SkipReason::NotAnObject => "not_object",
            SkipReason::TypeMismatch { .. } => "type_mismatch",
            SkipReason::UnsupportedType(_) => "unsupported_type",
            SkipReason::MissingId => "missing_id",
            SkipReason::InvalidId(_) => "invalid_id",
        }
    }
}

/// A single field could not be resolved. The column is written empty and the
/// entity is still emitted.
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("field '{field}' wraps a nested {found} instead of a scalar value")]
    NestedValue { field: &'static str, found: &'static str },
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown entity kind '{0}' (expected edition, author or work)")]
pub struct UnknownKind(pub String);
