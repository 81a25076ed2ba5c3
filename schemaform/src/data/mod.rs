//! File-backed form data.
//!
//! Binds a [`FieldTree`](crate::tree::FieldTree) to a model file on disk:
//!
//! - schema, model and descriptor documents in JSON or TOML
//! - change tracking through the tree's change callback
//! - saving back in the model's own format, with a timestamped backup

/// Form data container and document loading.
pub mod form_data;

pub use form_data::{FormData, default_schema_by_model, parse_document, read_document};
