use serde_json::Value;

use crate::{field::FieldId, parser::ParserOptions, schema::Schema, tree::FieldTree};

pub(crate) fn options(schema: Value, model: Option<Value>) -> ParserOptions {
    ParserOptions::new(Schema::from_value(&schema).unwrap()).with_model(model)
}

/// Parse `schema` with `model` into a fresh tree.
pub(crate) fn build(schema: Value, model: Option<Value>) -> (FieldTree, FieldId) {
    let mut tree = FieldTree::default();
    let root = tree.parse(options(schema, model)).unwrap().unwrap();
    (tree, root)
}
