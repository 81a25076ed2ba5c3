//! JSON Schema model and classification helpers.
//!
//! [`Schema`] covers the subset of JSON Schema the form layer understands,
//! plus two extensions: `order` (object property order) and
//! `contentMediaType` (file and media inputs). Members outside this subset
//! are ignored when deserializing.

/// `if/then/else` and `dependencies` resolution.
pub mod conditional;

use indexmap::IndexMap;
use schemars::{JsonSchema, generate::SchemaSettings};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{error::Result, value};

/// Enum cardinality above which an enumerated schema renders as a list.
pub const DEFAULT_ENUM_LIST_THRESHOLD: usize = 4;

/// Schema types handled as leaf inputs.
pub const SCALAR_TYPES: [&str; 5] = ["string", "number", "integer", "boolean", "null"];

/// A JSON Schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,

    // object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Property display order (extension).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<IndexMap<String, Dependency>>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<Schema>>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<Schema>>,

    // array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(
        default,
        deserialize_with = "schema_or_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    // string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    // number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// `type` as a single name or a union of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl SchemaType {
    /// The type a form input is built for: the first non-`null` member of a
    /// union, or `null` when nothing else is listed.
    pub fn primary(&self) -> Option<&str> {
        match self {
            SchemaType::Single(name) => Some(name),
            SchemaType::Union(names) => names
                .iter()
                .find(|name| name.as_str() != "null")
                .or_else(|| names.first())
                .map(String::as_str),
        }
    }
}

impl From<&str> for SchemaType {
    fn from(name: &str) -> Self {
        SchemaType::Single(name.to_string())
    }
}

/// `items`: one schema repeated for every index, or one schema per position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<Schema>),
    Single(Box<Schema>),
}

/// A `dependencies` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    /// Properties that become required once the trigger is filled in.
    Properties(Vec<String>),
    /// Schema fragment merged into the object once the trigger is filled in.
    Schema(Box<Schema>),
}

/// `exclusiveMinimum`/`exclusiveMaximum`: a bound (draft 6+) or a flag that
/// turns `minimum`/`maximum` exclusive (draft 4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Value(f64),
    Flag(bool),
}

fn schema_or_bool<'de, D>(deserializer: D) -> std::result::Result<Option<Box<Schema>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Bool(_)) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(|schema| Some(Box::new(schema)))
            .map_err(serde::de::Error::custom),
    }
}

impl Schema {
    /// Read a schema from a JSON document.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Schema::deserialize(value)?)
    }

    /// Generate the schema of a Rust type, with every subschema inlined so
    /// the form layer never meets a `$ref`.
    pub fn for_type<C: JsonSchema>() -> Result<Self> {
        let generated = SchemaSettings::draft07()
            .with(|settings| settings.inline_subschemas = true)
            .into_generator()
            .into_root_schema_for::<C>();
        let value = serde_json::to_value(&generated)?;
        Self::from_value(&value)
    }

    /// Shorthand for a schema with only a `type`.
    pub fn typed(name: &str) -> Self {
        Schema {
            schema_type: Some(name.into()),
            ..Default::default()
        }
    }

    /// The primary type name, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.schema_type.as_ref().and_then(SchemaType::primary)
    }

    /// Whether the node is a leaf input (string, number, integer, boolean,
    /// null) rather than a set.
    pub fn is_scalar(&self) -> bool {
        !self.is_set()
            && self
                .type_name()
                .is_some_and(|name| SCALAR_TYPES.contains(&name))
    }

    /// Whether the node owns sub-fields: objects, arrays and enumerations.
    pub fn is_set(&self) -> bool {
        self.enum_values.is_some() || matches!(self.type_name(), Some("object" | "array"))
    }

    /// Whether `key` is listed in `required`.
    pub fn requires(&self, key: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|required| required.iter().any(|r| r == key))
    }

    /// Kind implied by enum cardinality: `list` above `threshold` values,
    /// `enum` otherwise, `None` for schemas without `enum`.
    pub fn enum_kind(&self, threshold: usize) -> Option<&'static str> {
        self.enum_values.as_ref().map(|values| {
            if values.len() > threshold {
                "list"
            } else {
                "enum"
            }
        })
    }

    /// Kind a parser is picked by when nothing overrides it.
    pub fn kind(&self, threshold: usize) -> Option<&str> {
        self.enum_kind(threshold).or_else(|| self.type_name())
    }

    /// `oneOf`/`anyOf` alternatives when every one of them is a `const`,
    /// the shape schema generators emit for documented enum variants.
    fn const_alternatives(&self) -> Option<&[Schema]> {
        let alternatives = self.one_of.as_deref().or(self.any_of.as_deref())?;
        let all_const = !alternatives.is_empty() && alternatives.iter().all(|a| a.const_value.is_some());
        all_const.then_some(alternatives)
    }

    /// Fold constant alternatives into `enum` so they parse as an
    /// enumeration. The type is taken from the first alternative if missing.
    pub fn with_enum_alternatives(mut self) -> Self {
        if self.enum_values.is_some() {
            return self;
        }
        if let Some(alternatives) = self.const_alternatives() {
            let literals = alternatives
                .iter()
                .filter_map(|a| a.const_value.clone())
                .collect();
            if self.schema_type.is_none() {
                self.schema_type = alternatives[0].schema_type.clone();
            }
            self.enum_values = Some(literals);
        }
        self
    }

    /// Label of an enum literal declared as a constant alternative: its
    /// `title`, else its `description`.
    pub fn literal_label(&self, literal: &Value) -> Option<&str> {
        self.const_alternatives()?
            .iter()
            .find(|a| a.const_value.as_ref().is_some_and(|c| value::same(c, literal)))
            .and_then(|a| a.title.as_deref().or(a.description.as_deref()))
    }
}
