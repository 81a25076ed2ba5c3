use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    error::Result,
    field::FieldId,
    parser::ParserOptions,
    schema::{Schema, conditional},
    tree::{FieldTree, Link},
    unique_id::id_segment,
    value,
};

/// Bound on re-deriving the effective schema after a structural change.
/// Conditions that keep flipping each other are cut off here.
const MAX_SETTLE_ROUNDS: usize = 8;

/// Property names in display order: `order` first, then declaration order.
fn ordered_keys(properties: &IndexMap<String, Schema>, order: Option<&[String]>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(properties.len());
    for key in order.unwrap_or_default() {
        if properties.contains_key(key) && !keys.contains(key) {
            keys.push(key.clone());
        }
    }
    for key in properties.keys() {
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }
    keys
}

impl FieldTree {
    pub(crate) fn parse_object(&mut self, id: FieldId) -> Result<()> {
        let node = self.node(id)?;
        let model = value::object(node.field.value.as_ref());
        let effective = conditional::effective_schema(&node.options.schema, &model);
        self.restructure(id, effective)?;
        self.refresh_object(id)
    }

    /// Rebuild the members of object `id` for `effective`.
    ///
    /// Members whose property schema is unchanged keep their field. Members
    /// that disappear give their value back to the property's default.
    /// Returns whether the set of member names changed.
    fn restructure(&mut self, id: FieldId, effective: Schema) -> Result<bool> {
        self.with_building(|tree| {
            let node = tree.node_mut(id)?;
            let previous = std::mem::take(&mut node.field.fields);
            let old_properties = node.schema.properties.clone().unwrap_or_default();
            let new_properties = effective.properties.clone().unwrap_or_default();
            let parent_id = node.field.id.clone();
            let parent_name = node.field.name.clone();
            let user = node.options.descriptor.clone();
            let previous_keys: Vec<String> = previous.keys().cloned().collect();

            let mut model = value::object(node.field.value.as_ref());
            for (key, property) in &old_properties {
                if new_properties.contains_key(key) {
                    continue;
                }
                match &property.default {
                    Some(default) => model.insert(key.clone(), default.clone()),
                    None => model.remove(key),
                };
            }
            node.field.value = Some(Value::Object(model.clone()));
            node.field.raw_value = Some(Value::Object(model.clone()));
            node.schema = effective;

            let mut kept = IndexMap::new();
            for (key, child) in previous {
                let unchanged = new_properties.get(&key).is_some_and(|schema| old_properties.get(&key) == Some(schema));
                if unchanged && tree.contains(child) {
                    kept.insert(key, child);
                } else {
                    tree.release(child);
                }
            }

            let order = user
                .as_ref()
                .and_then(|d| d.order.clone())
                .or_else(|| tree.node(id).ok().and_then(|n| n.schema.order.clone()));
            let mut fields = IndexMap::new();
            for key in ordered_keys(&new_properties, order.as_deref()) {
                if let Some(child) = kept.shift_remove(&key) {
                    fields.insert(key, child);
                    continue;
                }
                let node = tree.node(id)?;
                let options = ParserOptions {
                    schema: new_properties[&key].clone(),
                    model: model.get(&key).cloned(),
                    name: Some(match &parent_name {
                        Some(name) => format!("{name}.{key}"),
                        None => key.clone(),
                    }),
                    id: Some(format!("{parent_id}-{}", id_segment(&key))),
                    required: node.schema.requires(&key),
                    descriptor: user.as_ref().and_then(|d| d.properties.get(&key).cloned()),
                    kind: None,
                };
                if let Some(child) = tree.spawn(options, Some(id), Link::Property(key.clone()), None)? {
                    fields.insert(key, child);
                }
            }

            let changed = !fields.keys().eq(previous_keys.iter());
            let node = tree.node_mut(id)?;
            node.field.children = fields.values().copied().collect();
            node.field.fields = fields;
            Ok(changed)
        })
    }

    /// Re-derive the effective schema of object `id` from its value until it
    /// is stable, then refresh member required flags.
    pub(crate) fn refresh_object(&mut self, id: FieldId) -> Result<()> {
        let mut restructured = false;
        for round in 0.. {
            let node = self.node(id)?;
            let model = value::object(node.field.value.as_ref());
            let effective = conditional::effective_schema(&node.options.schema, &model);
            if effective == node.schema {
                break;
            }
            if round == MAX_SETTLE_ROUNDS {
                warn!(
                    "conditional schema of `{}` does not settle, keeping the last resolution",
                    node.field.id
                );
                break;
            }
            debug!("effective schema of `{}` changed", node.field.id);
            restructured |= self.restructure(id, effective)?;
        }
        self.update_required(id)?;
        if restructured && !self.is_building() {
            self.request_render(id, None)?;
        }
        Ok(())
    }

    fn update_required(&mut self, id: FieldId) -> Result<()> {
        let node = self.node(id)?;
        let model = value::object(node.field.value.as_ref());
        let flags: Vec<(FieldId, bool)> = node
            .field
            .fields
            .iter()
            .map(|(key, child)| {
                let required = node.schema.requires(key)
                    || conditional::required_by_dependency(&node.schema, key, &model);
                (*child, required)
            })
            .collect();
        for (child, required) in flags {
            self.set_required(child, required)?;
        }
        Ok(())
    }

    /// Take the value of member `key` into object `id`.
    pub(crate) fn absorb_property(&mut self, id: FieldId, key: &str, member: Option<Value>) -> Result<()> {
        let node = self.node_mut(id)?;
        let mut model = value::object(node.field.value.as_ref());
        match member {
            Some(member) => model.insert(key.to_string(), member),
            None => model.remove(key),
        };
        node.field.raw_value = Some(Value::Object(model.clone()));
        node.field.value = Some(Value::Object(model));
        if self.is_building() {
            return Ok(());
        }
        self.refresh_object(id)
    }

    pub(crate) fn assign_object(&mut self, id: FieldId, raw: Option<Value>) -> Result<()> {
        let model = value::object(raw.as_ref());
        for (key, child) in self.members(id)? {
            self.assign(child, model.get(&key).cloned())?;
        }
        self.sync_object(id, model)?;
        self.refresh_object(id)
    }

    pub(crate) fn reset_object(&mut self, id: FieldId) -> Result<()> {
        let initial = value::object(self.node(id)?.initial_value.as_ref());
        for (_, child) in self.members(id)? {
            self.reset_node(child)?;
        }
        self.sync_object(id, initial)?;
        self.refresh_object(id)
    }

    pub(crate) fn clear_object(&mut self, id: FieldId) -> Result<()> {
        for (_, child) in self.members(id)? {
            self.clear_node(child)?;
        }
        self.sync_object(id, Map::new())?;
        self.refresh_object(id)
    }

    fn members(&self, id: FieldId) -> Result<Vec<(String, FieldId)>> {
        Ok(self
            .node(id)?
            .field
            .fields
            .iter()
            .map(|(key, child)| (key.clone(), *child))
            .collect())
    }

    /// Set the value of object `id` to `model` overlaid with member values.
    fn sync_object(&mut self, id: FieldId, mut model: Map<String, Value>) -> Result<()> {
        for (key, child) in self.members(id)? {
            match self.node(child)?.field.value.clone() {
                Some(member) => model.insert(key, member),
                None => model.remove(&key),
            };
        }
        let node = self.node_mut(id)?;
        node.field.raw_value = Some(Value::Object(model.clone()));
        node.field.value = Some(Value::Object(model));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::{
        descriptor::Descriptor,
        test_utils::{build, options},
    };

    fn keys(tree: &FieldTree, id: FieldId) -> Vec<String> {
        tree.field(id).unwrap().fields.keys().cloned().collect()
    }

    #[test]
    fn test_members_and_names() {
        let (tree, root) = build(
            json!({
                "type": "object",
                "properties": {
                    "address": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                    },
                    "untyped": {},
                },
            }),
            None,
        );
        assert_eq!(keys(&tree, root), ["address"]);
        let root_field = tree.field(root).unwrap();
        assert!(root_field.has_children);
        assert!(root_field.input_attr("name").is_none());

        let city = tree.get_field("address.city").unwrap();
        assert_eq!(city.name.as_deref(), Some("address.city"));
        assert_eq!(city.id, format!("{}-address-city", root_field.id));
        assert_eq!(city.deep, 2);
        assert_eq!(tree.field(city.parent.unwrap()).unwrap().name.as_deref(), Some("address"));
    }

    #[test]
    fn test_property_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "string"},
                "c": {"type": "string"},
            },
            "order": ["c", "missing"],
        });
        let (tree, root) = build(schema.clone(), None);
        assert_eq!(keys(&tree, root), ["c", "a", "b"]);

        let mut tree = FieldTree::default();
        let descriptor = Descriptor::from_value(&json!({"order": ["b", "a"]})).unwrap();
        let root = tree
            .parse(options(schema, None).with_descriptor(descriptor))
            .unwrap()
            .unwrap();
        assert_eq!(keys(&tree, root), ["b", "a", "c"]);
    }

    #[test]
    fn test_required_members() {
        let (tree, root) = build(
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "nick": {"type": "string"},
                    "inner": {"type": "object", "properties": {}},
                },
                "required": ["name", "inner"],
            }),
            None,
        );
        let name = tree.get_field("name").unwrap();
        assert!(name.required);
        assert_eq!(name.input_attr("required"), Some(json!(true)));
        assert_eq!(name.input_attr("aria-required"), Some(json!("true")));
        assert!(!tree.get_field("nick").unwrap().required);

        let inner = tree.get_field("inner").unwrap();
        assert!(inner.required);
        assert!(inner.input_attr("required").is_none());
        assert!(!tree.field(root).unwrap().required);
    }

    #[test]
    fn test_non_object_model_is_coerced() {
        let (tree, _) = build(
            json!({"type": "object", "properties": {"a": {"type": "string"}}}),
            Some(json!("nope")),
        );
        assert_eq!(tree.value(), Some(&json!({})));
    }

    #[test]
    fn test_if_then_else() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "properties": {"has_pet": {"type": "boolean"}},
                "if": {"properties": {"has_pet": {"const": true}}},
                "then": {
                    "properties": {"pet_name": {"type": "string", "default": "Rex"}},
                    "required": ["pet_name"],
                },
            }),
            None,
        );
        assert_eq!(keys(&tree, root), ["has_pet"]);

        let has_pet = tree.find(root, "has_pet").unwrap();
        tree.set_value(has_pet, Some(json!(true)), true).unwrap();
        assert_eq!(keys(&tree, root), ["has_pet", "pet_name"]);
        let pet_name = tree.get_field("pet_name").unwrap();
        assert!(pet_name.required);
        assert_eq!(tree.value(), Some(&json!({"has_pet": true, "pet_name": "Rex"})));

        tree.set_value(has_pet, Some(json!(false)), true).unwrap();
        assert_eq!(keys(&tree, root), ["has_pet"]);
        assert_eq!(tree.value(), Some(&json!({"has_pet": false, "pet_name": "Rex"})));
    }

    #[test]
    fn test_branch_member_value_survives_until_removed() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "properties": {"kind": {"type": "string"}},
                "if": {"properties": {"kind": {"const": "dog"}}},
                "then": {"properties": {"breed": {"type": "string"}}},
            }),
            Some(json!({"kind": "dog"})),
        );
        let breed = tree.find(root, "breed").unwrap();
        tree.set_value(breed, Some(json!("pug")), true).unwrap();
        assert_eq!(tree.find(root, "breed"), Some(breed));
        assert_eq!(tree.value(), Some(&json!({"kind": "dog", "breed": "pug"})));

        let kind = tree.find(root, "kind").unwrap();
        tree.set_value(kind, Some(json!("cat")), true).unwrap();
        assert!(!tree.contains(breed));
        assert_eq!(tree.value(), Some(&json!({"kind": "cat"})));
    }

    #[test]
    fn test_schema_dependency_adds_members() {
        let rendered = Arc::new(Mutex::new(0));
        let count = Arc::clone(&rendered);
        let mut tree = FieldTree::default().on_render(move |_| *count.lock().unwrap() += 1);
        let root = tree
            .parse(options(
                json!({
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "dependencies": {
                        "name": {"properties": {"age": {"type": "integer"}}, "required": ["age"]},
                    },
                }),
                None,
            ))
            .unwrap()
            .unwrap();
        assert_eq!(keys(&tree, root), ["name"]);
        assert_eq!(*rendered.lock().unwrap(), 0);

        let name = tree.find(root, "name").unwrap();
        tree.set_value(name, Some(json!("Jon")), true).unwrap();
        assert_eq!(keys(&tree, root), ["name", "age"]);
        assert!(tree.get_field("age").unwrap().required);
        assert_eq!(*rendered.lock().unwrap(), 1);

        tree.set_value(name, Some(json!("")), true).unwrap();
        assert_eq!(keys(&tree, root), ["name"]);
    }

    #[test]
    fn test_array_dependency_toggles_required() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "properties": {
                    "credit_card": {"type": "number"},
                    "billing_address": {"type": "string"},
                },
                "dependencies": {"credit_card": ["billing_address"]},
            }),
            None,
        );
        let card = tree.find(root, "credit_card").unwrap();
        let billing = tree.find(root, "billing_address").unwrap();
        assert!(!tree.field(billing).unwrap().required);

        tree.set_value(card, Some(json!(1234)), true).unwrap();
        let field = tree.field(billing).unwrap();
        assert!(field.required);
        assert_eq!(field.input_attr("required"), Some(json!(true)));

        tree.clear(card).unwrap();
        let field = tree.field(billing).unwrap();
        assert!(!field.required);
        assert!(field.input_attr("aria-required").is_none());
    }

    #[test]
    fn test_cyclic_conditions_settle() {
        // the branch default feeds back into the condition
        let (tree, root) = build(
            json!({
                "type": "object",
                "properties": {"flag": {"type": "boolean"}},
                "if": {"properties": {"flag": {"const": true}}, "required": ["flag"]},
                "then": {"properties": {"flag": {"type": "boolean", "default": false}}},
                "else": {"properties": {"flag": {"type": "boolean", "default": true}}},
            }),
            None,
        );
        assert!(tree.contains(root));
        assert_eq!(keys(&tree, root), ["flag"]);
    }

    #[test]
    fn test_object_descriptor_flows_to_members() {
        let descriptor = Descriptor::from_value(&json!({
            "properties": {"bio": {"kind": "textarea", "label": "About you"}},
        }))
        .unwrap();
        let mut tree = FieldTree::default();
        tree.parse(
            options(
                json!({"type": "object", "properties": {"bio": {"type": "string"}}}),
                None,
            )
            .with_descriptor(descriptor),
        )
        .unwrap();
        let bio = tree.get_field("bio").unwrap();
        assert_eq!(bio.kind.as_str(), "textarea");
        assert_eq!(bio.label(), Some("About you"));
    }
}
