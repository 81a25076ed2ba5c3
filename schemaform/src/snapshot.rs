//! JSON rendering of a field tree, as a view layer would read it.

use serde_json::{Map, Value, json};

use crate::{
    error::Result,
    field::FieldId,
    parser::ParserKind,
    tree::FieldTree,
};

impl FieldTree {
    /// Render the subtree at `id` with live attributes evaluated.
    pub fn snapshot(&self, id: FieldId) -> Result<Value> {
        let node = self.node(id)?;
        let field = &node.field;

        let mut out = Map::new();
        out.insert("id".into(), json!(field.id));
        out.insert("key".into(), json!(field.key));
        out.insert("kind".into(), json!(field.kind));
        if let Some(name) = &field.name {
            out.insert("name".into(), json!(name));
        }
        out.insert("required".into(), json!(field.required));
        out.insert("deep".into(), json!(field.deep));
        if let Some(value) = field.value() {
            out.insert("value".into(), value.clone());
        }
        out.insert(
            "attrs".into(),
            json!({
                "input": field.input_attrs(),
                "label": field.attrs.label,
                "description": field.attrs.description,
            }),
        );
        if let Some(label) = field.label() {
            out.insert("label".into(), json!(label));
        }
        if let Some(helper) = field.helper() {
            out.insert("helper".into(), json!(helper));
        }
        if let Some(component) = &field.component {
            out.insert("component".into(), json!(component));
        }
        if !field.props.is_empty() {
            out.insert("props".into(), Value::Object(field.props.clone()));
        }
        if !field.messages.is_empty() {
            out.insert("messages".into(), json!(field.messages));
        }
        if let Some(actions) = &field.actions {
            out.insert("actions".into(), json!(actions));
        }

        match node.parser {
            ParserKind::Object => {
                let mut fields = Map::new();
                for (key, child) in &field.fields {
                    fields.insert(key.clone(), self.snapshot(*child)?);
                }
                out.insert("fields".into(), Value::Object(fields));
            }
            ParserKind::Array => {
                let children = field
                    .children
                    .iter()
                    .map(|child| self.snapshot(*child))
                    .collect::<Result<Vec<_>>>()?;
                out.insert("children".into(), Value::Array(children));
                out.insert("pushDisabled".into(), json!(self.push_disabled(id)?));
            }
            ParserKind::Enum => {
                let children = field
                    .children
                    .iter()
                    .map(|child| self.snapshot(*child))
                    .collect::<Result<Vec<_>>>()?;
                out.insert("children".into(), Value::Array(children));
            }
            ParserKind::List => {
                let options: Vec<Value> = field
                    .options
                    .iter()
                    .map(|option| {
                        json!({
                            "value": option.value,
                            "label": option.label,
                            "selected": field.is_selected(&option.value),
                        })
                    })
                    .collect();
                out.insert("options".into(), Value::Array(options));
            }
            _ => {}
        }
        Ok(Value::Object(out))
    }

    /// Snapshot of the whole tree, `None` when nothing is parsed.
    pub fn snapshot_root(&self) -> Result<Option<Value>> {
        self.root().map(|root| self.snapshot(root)).transpose()
    }
}
