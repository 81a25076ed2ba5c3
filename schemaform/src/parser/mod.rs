//! Parser registry and kind dispatch.
//!
//! Every schema node becomes a field through exactly one dispatch point,
//! [`ParserRegistry::resolve`], so descriptor and caller overrides apply the
//! same way at the root, for object properties, array items and enum
//! choices.
//!
//! The per-kind parsing logic lives in the submodules as `impl FieldTree`
//! blocks; the registry only decides which of them handles a node.

/// Array parser: items, tuple schemas, checkbox groups.
pub mod array;

/// Enum (radio group) and list (select) parsers.
pub mod enums;

/// Object parser: properties, dependencies, conditional schemas.
pub mod object;

/// String, number, integer, boolean and null parsers.
pub mod scalar;

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    descriptor::Descriptor,
    error::{FormError, Result},
    schema::{DEFAULT_ENUM_LIST_THRESHOLD, Schema},
    value,
};

/// The closed set of parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Enum,
    List,
}

impl ParserKind {
    /// Whether the parser owns child fields.
    pub fn is_set(self) -> bool {
        matches!(self, ParserKind::Object | ParserKind::Array | ParserKind::Enum)
    }

    /// Coerce a raw value the way this parser stores it.
    pub fn parse_value(self, schema: &Schema, raw: Option<&Value>) -> Option<Value> {
        match self {
            ParserKind::Object => value::coerce(raw, Some("object")),
            ParserKind::Array => value::coerce(raw, Some("array")),
            ParserKind::String => value::coerce(raw, Some("string")),
            ParserKind::Number => value::coerce(raw, Some("number")),
            ParserKind::Integer => value::coerce(raw, Some("integer")),
            ParserKind::Boolean => raw.map(|v| Value::Bool(value::to_boolean(v))),
            ParserKind::Null => Some(Value::Null),
            ParserKind::Enum | ParserKind::List => match schema.type_name() {
                Some("null") => raw.cloned(),
                ty => raw.and_then(|v| value::coerce(Some(v), ty)),
            },
        }
    }
}

/// Tunables of the parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ParserConfig {
    /// Enumerations with more values than this render as a list instead of a
    /// radio group.
    pub enum_list_threshold: usize,
    /// Amount added to an exclusive minimum (and removed from an exclusive
    /// maximum) to produce the inclusive `min`/`max` input attributes.
    pub exclusive_bound_step: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            enum_list_threshold: DEFAULT_ENUM_LIST_THRESHOLD,
            exclusive_bound_step: 0.1,
        }
    }
}

/// Kind name → parser registry.
///
/// Built once and shared by reference; independent trees may use
/// independent registries.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, ParserKind>,
    config: ParserConfig,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Registry with the built-in kinds and the default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Registry with the built-in kinds.
    pub fn with_config(config: ParserConfig) -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
            config,
        };
        for (kind, parser) in [
            ("object", ParserKind::Object),
            ("array", ParserKind::Array),
            ("string", ParserKind::String),
            ("number", ParserKind::Number),
            ("integer", ParserKind::Integer),
            ("boolean", ParserKind::Boolean),
            ("null", ParserKind::Null),
            ("enum", ParserKind::Enum),
            ("list", ParserKind::List),
            ("textarea", ParserKind::String),
            ("password", ParserKind::String),
            ("image", ParserKind::String),
            ("file", ParserKind::String),
            ("checkbox", ParserKind::Boolean),
        ] {
            registry.register(kind, parser);
        }
        registry
    }

    /// Register (or replace) the parser for `kind`, returning the previous one.
    pub fn register(&mut self, kind: impl Into<String>, parser: ParserKind) -> Option<ParserKind> {
        self.parsers.insert(kind.into(), parser)
    }

    pub fn lookup(&self, kind: &str) -> Option<ParserKind> {
        self.parsers.get(kind).copied()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Pick the kind name and parser for a node.
    ///
    /// Returns `Ok(None)` when the schema has no `type` yet. Resolution
    /// order: descriptor kind, caller kind, enum cardinality, schema type.
    pub fn resolve(&self, options: &ParserOptions) -> Result<Option<(String, ParserKind)>> {
        let Some(type_name) = options.schema.type_name() else {
            return Ok(None);
        };
        if self.lookup(type_name).is_none() {
            return Err(FormError::UnsupportedType {
                type_name: type_name.to_string(),
            });
        }

        let kind = options
            .descriptor
            .as_ref()
            .and_then(|d| d.kind.clone())
            .or_else(|| options.kind.clone())
            .or_else(|| {
                options
                    .schema
                    .enum_kind(self.config.enum_list_threshold)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| type_name.to_string());

        match self.lookup(&kind) {
            Some(parser) => Ok(Some((kind, parser))),
            None => Err(FormError::UnknownKind { kind }),
        }
    }
}

/// Construction options of one field.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub schema: Schema,
    /// Current value; falls back to `const`, then `default`.
    pub model: Option<Value>,
    pub name: Option<String>,
    /// DOM id; generated from `name` when missing.
    pub id: Option<String>,
    pub required: bool,
    pub descriptor: Option<Descriptor>,
    /// Kind override from the caller.
    pub kind: Option<String>,
}

impl ParserOptions {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<Option<Value>>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}
