//! # schemaform
//!
//! Turns a JSON Schema plus a current data model into a tree of form fields,
//! and keeps field values and the model in step while they are edited.
//!
//! ## Features
//!
//! - Scalar fields (string, number, integer, boolean, null) with input type
//!   inference and constraint attributes (`minlength`, `pattern`, `min`, `step`…)
//! - Set fields: objects, arrays (tuples, checkbox groups), enums as radio
//!   groups, long enums as select lists
//! - `if/then/else` and `dependencies` resolved against the live model
//! - Presentation descriptors ("UI schema") merged over what the schema implies
//! - JSON and TOML documents, with change tracking and backups on save
//!
//! ## Quick Start
//!
//! ```rust
//! use schemaform::{FieldTree, ParserOptions, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::from_value(&json!({
//!     "type": "object",
//!     "properties": {"name": {"type": "string", "minLength": 2}},
//! }))
//! .unwrap();
//!
//! let mut tree = FieldTree::default();
//! let root = tree
//!     .parse(ParserOptions::new(schema).with_model(json!({"name": "Jon"})))
//!     .unwrap()
//!     .unwrap();
//!
//! let name = tree.find(root, "name").unwrap();
//! tree.set_value(name, Some(json!("Arya")), true).unwrap();
//! assert_eq!(tree.value(), Some(&json!({"name": "Arya"})));
//! ```
//!
//! ## Modules
//!
//! - [`tree`] - The field arena and value propagation
//! - [`parser`] - Parser registry and the per-kind parsers
//! - [`schema`] - Schema model and conditional resolution
//! - [`data`] - File-backed form data
//! - [`run`] - Command line driver

#[macro_use]
extern crate log;

/// Presentation descriptors and their resolution.
pub mod descriptor;

/// Error types.
pub mod error;

/// Field projection read by view layers.
pub mod field;

/// Parser registry and per-kind parsers.
pub mod parser;

/// JSON Schema model.
pub mod schema;

/// Field tree snapshots.
pub mod snapshot;

/// The field arena and value propagation.
pub mod tree;

/// Unique id generation.
pub mod unique_id;

/// Value coercion helpers.
pub mod value;

/// File-backed form data.
pub mod data;

/// Command line driver.
pub mod run;

#[cfg(test)]
mod test_utils;

pub use descriptor::{Descriptor, DescriptorResolver, NativeDescriptor};
pub use error::{FormError, Result};
pub use field::{Field, FieldId, FieldKind, Message, MessageKind};
pub use parser::{ParserConfig, ParserKind, ParserOptions, ParserRegistry};
pub use schema::Schema;
pub use serde_json::Value;
pub use tree::FieldTree;
