use serde_json::Value;

use crate::{
    descriptor::Descriptor,
    error::Result,
    field::{FieldId, LiveAttr, ListOption, set_attr},
    parser::ParserOptions,
    tree::{FieldTree, Link},
    value,
};

impl FieldTree {
    /// Build one radio choice per enum literal.
    pub(crate) fn parse_enum(&mut self, id: FieldId) -> Result<()> {
        self.with_building(|tree| {
            let node = tree.node_mut(id)?;
            let previous = std::mem::take(&mut node.field.children);
            let literals = node.schema.enum_values.clone().unwrap_or_default();
            let parent_id = node.field.id.clone();
            let parent_name = node.field.name.clone();
            let user = node.options.descriptor.clone();

            let labels: Vec<Option<String>> = literals
                .iter()
                .map(|literal| node.schema.literal_label(literal).map(str::to_string))
                .collect();
            let mut choice = node.schema.clone();
            choice.enum_values = None;
            choice.one_of = None;
            choice.any_of = None;
            choice.title = None;
            choice.description = None;
            choice.default = None;
            choice.const_value = None;

            for child in previous {
                tree.release(child);
            }

            let mut children = Vec::with_capacity(literals.len());
            for (index, (literal, declared)) in literals.into_iter().zip(labels).enumerate() {
                let text = value::to_js_string(&literal);
                let descriptor = user
                    .as_ref()
                    .and_then(|d| d.values.get(&text).cloned())
                    .unwrap_or_else(|| Descriptor::labelled(declared.unwrap_or(text)));
                let options = ParserOptions {
                    schema: choice.clone(),
                    model: Some(literal.clone()),
                    name: parent_name.clone(),
                    id: Some(format!("{parent_id}-{index}")),
                    descriptor: Some(descriptor),
                    ..Default::default()
                };
                if let Some(child) = tree.spawn(options, Some(id), Link::Choice(index), Some(literal))? {
                    children.push(child);
                }
            }
            tree.node_mut(id)?.field.children = children;
            Ok(())
        })?;
        self.update_inputs_state(id)
    }

    /// Take a chosen literal into enum `id`.
    pub(crate) fn absorb_choice(&mut self, id: FieldId, chosen: Option<Value>) -> Result<()> {
        // choices commit their own literal while they are built
        if self.is_building() {
            return Ok(());
        }
        self.store(id, chosen)?;
        self.update_inputs_state(id)
    }

    /// Check the choice matching the value of enum `id` and uncheck the rest.
    pub(crate) fn update_inputs_state(&mut self, id: FieldId) -> Result<()> {
        let node = self.node(id)?;
        let current = node.field.value.clone();
        let children = node.field.children.clone();
        for child in children {
            let node = self.node_mut(child)?;
            let literal = node.choice.as_ref().or(node.field.value.as_ref());
            let checked = value::same_opt(literal, current.as_ref()) && current.is_some();
            set_attr(&mut node.field.attrs.input, "checked", checked);
        }
        Ok(())
    }

    /// Collect the select options of a list field.
    pub(crate) fn parse_list(&mut self, id: FieldId) -> Result<()> {
        let node = self.node_mut(id)?;
        let user = node.options.descriptor.as_ref();
        let schema = &node.schema;
        node.field.options = schema
            .enum_values
            .iter()
            .flatten()
            .map(|literal| {
                let text = value::to_js_string(literal);
                let label = user
                    .and_then(|d| d.values.get(&text))
                    .and_then(|d| d.label.clone())
                    .or_else(|| schema.literal_label(literal).map(str::to_string))
                    .unwrap_or(text);
                ListOption {
                    value: literal.clone(),
                    label,
                }
            })
            .collect();
        node.field.live = LiveAttr::Value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        field::{Field, FieldKind},
        test_utils::{build, options},
    };

    fn checked(tree: &FieldTree, id: FieldId) -> Vec<bool> {
        tree.field(id)
            .unwrap()
            .children
            .iter()
            .map(|child| tree.field(*child).unwrap().input_attr("checked") == Some(json!(true)))
            .collect()
    }

    #[test]
    fn test_enum_list_threshold() {
        let (tree, root) = build(json!({"type": "string", "enum": ["a", "b", "c", "d"]}), None);
        assert_eq!(tree.field(root).unwrap().kind, FieldKind::Enum);
        let (tree, root) = build(json!({"type": "string", "enum": ["a", "b", "c", "d", "e"]}), None);
        let field = tree.field(root).unwrap();
        assert_eq!(field.kind, FieldKind::List);
        assert!(field.children.is_empty());
        assert_eq!(field.options.len(), 5);
    }

    #[test]
    fn test_radio_choices() {
        let mut tree = FieldTree::default();
        let root = tree
            .parse(
                options(json!({"type": "string", "enum": ["s", "m", "l"], "title": "Size"}), Some(json!("m")))
                    .with_name("size"),
            )
            .unwrap()
            .unwrap();
        let field = tree.field(root).unwrap();
        assert!(field.has_children);
        assert_eq!(field.value(), Some(&json!("m")));
        assert_eq!(checked(&tree, root), [false, true, false]);

        let small: &Field = tree.get_field("[0]").unwrap();
        assert_eq!(small.kind, FieldKind::Radio);
        assert_eq!(small.input_type(), Some("radio"));
        assert_eq!(small.input_attr("value"), Some(json!("s")));
        assert_eq!(small.input_attr("name"), Some(json!("size")));
        assert_eq!(small.label(), Some("s"));
        assert_eq!(small.id, format!("{}-0", field.id));
    }

    #[test]
    fn test_checking_a_choice_is_exclusive() {
        let (mut tree, root) = build(json!({"type": "string", "enum": ["s", "m", "l"]}), None);
        assert_eq!(tree.value(), None);
        assert_eq!(checked(&tree, root), [false, false, false]);

        let large = tree.find(root, "[2]").unwrap();
        tree.set_value(large, Some(json!("l")), true).unwrap();
        assert_eq!(tree.value(), Some(&json!("l")));
        assert_eq!(checked(&tree, root), [false, false, true]);

        tree.set_value(root, Some(json!("s")), true).unwrap();
        assert_eq!(checked(&tree, root), [true, false, false]);
    }

    #[test]
    fn test_numeric_enum() {
        let (tree, root) = build(json!({"type": "integer", "enum": [1, 2, 3]}), Some(json!("2")));
        assert_eq!(tree.value(), Some(&json!(2)));
        assert_eq!(checked(&tree, root), [false, true, false]);
        let one = tree.get_field("0").unwrap();
        assert_eq!(one.input_type(), Some("radio"));
        assert!(one.input_attr("min").is_none());
    }

    #[test]
    fn test_const_alternatives_parse_as_enum() {
        let (tree, root) = build(
            json!({
                "oneOf": [
                    {"type": "string", "const": "debug", "description": "Debug build"},
                    {"type": "string", "const": "release", "description": "Release build"},
                ],
            }),
            Some(json!("release")),
        );
        let field = tree.field(root).unwrap();
        assert_eq!(field.kind, FieldKind::Enum);
        assert_eq!(checked(&tree, root), [false, true]);
        let debug = tree.field(field.children[0]).unwrap();
        assert_eq!(debug.kind, FieldKind::Radio);
        assert_eq!(debug.label(), Some("Debug build"));
    }

    #[test]
    fn test_value_labels_from_descriptor() {
        let descriptor = crate::descriptor::Descriptor::from_value(&json!({
            "values": {"a": {"label": "Alpha"}, "e": {"label": "Echo"}},
        }))
        .unwrap();
        let mut tree = FieldTree::default();
        let root = tree
            .parse(
                options(json!({"type": "string", "enum": ["a", "b", "c", "d", "e"]}), Some(json!("e")))
                    .with_descriptor(descriptor.clone()),
            )
            .unwrap()
            .unwrap();
        let field = tree.field(root).unwrap();
        let labels: Vec<_> = field.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["Alpha", "b", "c", "d", "Echo"]);
        assert!(field.is_selected(&json!("e")));
        assert_eq!(field.input_attr("value"), Some(json!("e")));

        let root = tree
            .parse(
                options(json!({"type": "string", "enum": ["a", "b"]}), None).with_descriptor(descriptor),
            )
            .unwrap()
            .unwrap();
        let first = tree.field(tree.field(root).unwrap().children[0]).unwrap();
        assert_eq!(first.label(), Some("Alpha"));
    }
}
