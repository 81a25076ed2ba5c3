//! Error types for field tree construction and mutation.

use crate::field::FieldId;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors raised by the parser registry and the field tree.
///
/// Malformed input that the form layer tolerates (missing `type`, missing
/// `properties`, models of the wrong shape) never produces an error; it is
/// coerced or yields no field instead.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The schema declares a `type` no parser is registered for.
    #[error("unsupported schema type `{type_name}`")]
    UnsupportedType { type_name: String },

    /// The resolved kind (descriptor, caller override or enum cardinality)
    /// has no registered parser.
    #[error("no parser registered for kind `{kind}`")]
    UnknownKind { kind: String },

    /// A field handle outlived the subtree it pointed into.
    #[error("stale field handle {0}")]
    StaleField(FieldId),

    /// The operation needs a field of another kind.
    #[error("field `{id}` is not {expected}")]
    KindMismatch { id: String, expected: &'static str },

    /// Schema document could not be read into the schema model.
    #[error("invalid schema: {0}")]
    Schema(#[from] serde_json::Error),
}

impl FormError {
    /// Create a kind mismatch error for the field with DOM id `id`.
    pub fn kind_mismatch(id: &str, expected: &'static str) -> Self {
        Self::KindMismatch {
            id: id.to_string(),
            expected,
        }
    }
}
