//! Presentation descriptors.
//!
//! A descriptor carries everything a view layer needs besides the value:
//! label, helper text, renderer component and extra attributes. Callers may
//! hand in their own [`Descriptor`] tree (a "UI schema") next to the JSON
//! Schema; a [`DescriptorResolver`] merges it with what the schema implies.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    field::{Field, FieldKind},
    schema::Schema,
};

/// Presentation overrides for one schema node, and its nested nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Descriptor {
    /// Kind override, e.g. `textarea` or `password`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Extra input attributes.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    /// Extra renderer data.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    /// Descriptor of array items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Descriptor>>,
    /// Descriptors of object properties.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Descriptor>,
    /// Descriptors of enum literals, keyed by their textual form.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub values: IndexMap<String, Descriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<String, DescriptorGroup>,
}

/// A labelled group of object properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub properties: Vec<String>,
}

impl Descriptor {
    /// Descriptor with only a label.
    pub fn labelled(label: impl Into<String>) -> Self {
        Descriptor {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Read a descriptor tree from a JSON document.
    pub fn from_value(value: &Value) -> crate::Result<Self> {
        Ok(Descriptor::deserialize(value)?)
    }
}

/// Resolves the presentation descriptor of each field.
pub trait DescriptorResolver: Send + Sync {
    /// Build the descriptor of a node from its schema, its resolved kind and
    /// the caller-supplied override.
    fn resolve(&self, schema: &Schema, kind: &FieldKind, user: Option<&Descriptor>) -> Descriptor;

    /// Bring a descriptor up to date after a structural change of `field`,
    /// before the view layer re-reads it.
    fn refresh(&self, _descriptor: &mut Descriptor, _field: &Field) {}
}

/// Built-in resolver: the caller's descriptor wins, the schema fills gaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDescriptor;

impl DescriptorResolver for NativeDescriptor {
    fn resolve(&self, schema: &Schema, kind: &FieldKind, user: Option<&Descriptor>) -> Descriptor {
        let mut descriptor = user.cloned().unwrap_or_default();
        if descriptor.label.is_none() {
            descriptor.label = schema.title.clone();
        }
        if descriptor.helper.is_none() {
            descriptor.helper = schema.description.clone();
        }
        if descriptor.component.is_none() {
            descriptor.component = Some(kind.as_str().to_string());
        }
        if descriptor.order.is_none() {
            descriptor.order = schema.order.clone();
        }
        descriptor
    }

    fn refresh(&self, descriptor: &mut Descriptor, field: &Field) {
        if field.fields.is_empty() {
            return;
        }
        descriptor.order = Some(field.fields.keys().cloned().collect());
        for group in descriptor.groups.values_mut() {
            group
                .properties
                .retain(|name| field.fields.contains_key(name));
        }
    }
}
