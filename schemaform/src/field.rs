//! The externally visible projection of a parsed schema node.
//!
//! A [`Field`] is what a view layer reads to render an input: its identity,
//! kind, value, attribute bags, resolved descriptor and tree links. Values
//! are read-only from the outside; every mutation goes through
//! [`FieldTree`](crate::tree::FieldTree) so parents stay consistent.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{descriptor::Descriptor, value};

/// Namespaced attribute bag.
pub type AttrMap = Map<String, Value>;

pub(crate) fn set_attr(attrs: &mut AttrMap, name: &str, value: impl Into<Value>) {
    attrs.insert(name.to_string(), value.into());
}

/// Handle of a field inside a [`FieldTree`](crate::tree::FieldTree).
///
/// Handles are generational: once a subtree is rebuilt, handles into the old
/// subtree stop resolving instead of aliasing new fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Resolved field category.
///
/// Distinct from the raw schema `type`: an enumerated string is an `Enum` or
/// a `List`, a string with `contentMediaType: image/png` is an `Image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Enum,
    List,
    Radio,
    Checkbox,
    Textarea,
    Image,
    File,
    /// A kind registered by the caller, e.g. `password`.
    Other(String),
}

impl FieldKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "object" => FieldKind::Object,
            "array" => FieldKind::Array,
            "string" => FieldKind::String,
            "number" => FieldKind::Number,
            "integer" => FieldKind::Integer,
            "boolean" => FieldKind::Boolean,
            "null" => FieldKind::Null,
            "enum" => FieldKind::Enum,
            "list" => FieldKind::List,
            "radio" => FieldKind::Radio,
            "checkbox" => FieldKind::Checkbox,
            "textarea" => FieldKind::Textarea,
            "image" => FieldKind::Image,
            "file" => FieldKind::File,
            other => FieldKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Null => "null",
            FieldKind::Enum => "enum",
            FieldKind::List => "list",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Textarea => "textarea",
            FieldKind::Image => "image",
            FieldKind::File => "file",
            FieldKind::Other(name) => name,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Severity of a field message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A message attached to a field by an external validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
}

/// Attributes for the input element, its label and its description.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attrs {
    pub input: AttrMap,
    pub label: AttrMap,
    pub description: AttrMap,
}

/// Enabled state of one item action button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub disabled: bool,
}

/// Action buttons attached to an array item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemActions {
    pub move_up: ButtonState,
    pub move_down: ButtonState,
    pub delete: ButtonState,
}

/// One option of a list (select) field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOption {
    pub value: Value,
    pub label: String,
}

/// Input attribute derived from the value at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum LiveAttr {
    #[default]
    None,
    /// `value`: the textual value, absent when empty.
    Value,
    /// `checked`: whether the value is `true`.
    Checked,
}

/// The externally consumed projection of a parser node.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) handle: FieldId,
    /// DOM id, unique within the tree.
    pub id: String,
    /// Render identity; regenerated whenever a re-render is requested.
    pub key: String,
    pub kind: FieldKind,
    pub name: Option<String>,
    pub is_root: bool,
    pub required: bool,
    pub(crate) value: Option<Value>,
    pub(crate) raw_value: Option<Value>,
    pub attrs: Attrs,
    pub props: Map<String, Value>,
    pub descriptor: Descriptor,
    /// Opaque renderer handle resolved from the descriptor.
    pub component: Option<String>,
    pub parent: Option<FieldId>,
    pub children: Vec<FieldId>,
    /// Object members by property name, in display order.
    pub fields: IndexMap<String, FieldId>,
    pub has_children: bool,
    pub messages: Vec<Message>,
    /// Nesting depth, the root is 0.
    pub deep: usize,
    /// Move/delete buttons when the field is an array item.
    pub actions: Option<ItemActions>,
    /// Select options of a list field.
    pub options: Vec<ListOption>,
    pub(crate) live: LiveAttr,
}

impl Field {
    pub(crate) fn new(handle: FieldId, id: String, key: String, kind: FieldKind) -> Self {
        Self {
            handle,
            id,
            key,
            kind,
            name: None,
            is_root: true,
            required: false,
            value: None,
            raw_value: None,
            attrs: Attrs::default(),
            props: Map::new(),
            descriptor: Descriptor::default(),
            component: None,
            parent: None,
            children: Vec::new(),
            fields: IndexMap::new(),
            has_children: false,
            messages: Vec::new(),
            deep: 0,
            actions: None,
            options: Vec::new(),
            live: LiveAttr::None,
        }
    }

    /// Handle of this field in its tree.
    pub fn handle(&self) -> FieldId {
        self.handle
    }

    /// Current (coerced) value. `None` means the field has no value yet.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Value before coercion, as last received.
    pub fn raw_value(&self) -> Option<&Value> {
        self.raw_value.as_ref()
    }

    /// The input `type` attribute.
    pub fn input_type(&self) -> Option<&str> {
        self.attrs.input.get("type").and_then(Value::as_str)
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    pub fn helper(&self) -> Option<&str> {
        self.descriptor.helper.as_deref()
    }

    /// Read one input attribute. `value` and `checked` of plain inputs are
    /// computed from the current value on every call.
    pub fn input_attr(&self, name: &str) -> Option<Value> {
        match (self.live, name) {
            (LiveAttr::Value, "value") => self.live_value(),
            (LiveAttr::Checked, "checked") => Some(Value::Bool(self.is_checked())),
            _ => self.attrs.input.get(name).cloned(),
        }
    }

    /// All input attributes with live ones evaluated.
    pub fn input_attrs(&self) -> AttrMap {
        let mut attrs = self.attrs.input.clone();
        match self.live {
            LiveAttr::Value => match self.live_value() {
                Some(v) => {
                    attrs.insert("value".to_string(), v);
                }
                None => {
                    attrs.remove("value");
                }
            },
            LiveAttr::Checked => {
                attrs.insert("checked".to_string(), Value::Bool(self.is_checked()));
            }
            LiveAttr::None => {}
        }
        attrs
    }

    fn live_value(&self) -> Option<Value> {
        match &self.value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(Value::String(value::to_js_string(v))),
        }
    }

    fn is_checked(&self) -> bool {
        matches!(self.value, Some(Value::Bool(true)))
    }

    /// Attach a message.
    pub fn add_message(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.messages.push(Message {
            text: text.into(),
            kind,
        });
    }

    /// Whether the list option `option` is the current value.
    pub fn is_selected(&self, option: &Value) -> bool {
        self.value.as_ref().is_some_and(|v| value::same(v, option))
    }
}
