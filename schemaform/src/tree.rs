//! The field tree.
//!
//! A [`FieldTree`] owns every node parsed from one schema in an arena. Nodes
//! refer to each other by [`FieldId`] handles: a child knows its parent's
//! handle, a parent lists its children's handles. Rebuilding a subtree frees
//! its slots and bumps their generation, so old handles stop resolving.
//!
//! Values flow both ways:
//!
//! * down, when a set field is assigned a value it hands each child its part;
//! * up, when a field commits, each ancestor absorbs the child's value into
//!   its own (object member, array slot, checked literal, chosen literal).
//!
//! While a subtree is being built, a commit only reaches the immediate
//! parent. Outside of building, a commit walks to the root and fires the
//! change callback once.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    descriptor::{DescriptorResolver, NativeDescriptor},
    error::{FormError, Result},
    field::{Attrs, Field, FieldId, FieldKind, LiveAttr, MessageKind, set_attr},
    parser::{ParserKind, ParserOptions, ParserRegistry, array::ArrayState},
    schema::Schema,
    unique_id::unique_id,
};

/// Invoked with the root value and the root field after a committed change.
pub type ChangeCallback = Arc<dyn Fn(Option<&Value>, &Field) + Send + Sync>;

/// Invoked with the fields whose render identity changed.
pub type RenderCallback = Arc<dyn Fn(&[FieldId]) + Send + Sync>;

/// How a node is attached to its parent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Link {
    Root,
    /// Object member.
    Property(String),
    /// Array slot.
    Index(usize),
    /// Checkbox of an enum-items array; the parent collects checked literals.
    Checkbox(usize),
    /// Radio choice of an enum; the parent takes the chosen literal.
    Choice(usize),
}

pub(crate) struct Node {
    pub(crate) field: Field,
    pub(crate) parser: ParserKind,
    /// Registered kind the parser was picked by, e.g. `textarea`.
    pub(crate) kind_name: String,
    /// Construction options; `schema` is the canonical schema.
    pub(crate) options: ParserOptions,
    /// Schema the node currently renders with.
    pub(crate) schema: Schema,
    pub(crate) initial_value: Option<Value>,
    /// Literal an enum choice or checkbox stands for.
    pub(crate) choice: Option<Value>,
    pub(crate) link: Link,
    pub(crate) array: Option<ArrayState>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of parser nodes rooted at one schema.
pub struct FieldTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<FieldId>,
    pub(crate) registry: Arc<ParserRegistry>,
    descriptors: Arc<dyn DescriptorResolver>,
    on_change: Option<ChangeCallback>,
    on_render: Option<RenderCallback>,
    building: usize,
}

impl Default for FieldTree {
    fn default() -> Self {
        Self::new(Arc::new(ParserRegistry::new()))
    }
}

impl FieldTree {
    pub fn new(registry: Arc<ParserRegistry>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            registry,
            descriptors: Arc::new(NativeDescriptor),
            on_change: None,
            on_render: None,
            building: 0,
        }
    }

    /// Use another descriptor resolver.
    pub fn with_descriptors(mut self, resolver: Arc<dyn DescriptorResolver>) -> Self {
        self.descriptors = resolver;
        self
    }

    /// Register the root change callback.
    pub fn on_change(
        mut self,
        callback: impl Fn(Option<&Value>, &Field) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Register the render request callback.
    pub fn on_render(mut self, callback: impl Fn(&[FieldId]) + Send + Sync + 'static) -> Self {
        self.on_render = Some(Arc::new(callback));
        self
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Parse a schema into a new root, replacing the current one.
    ///
    /// Returns `Ok(None)` when the schema has no `type`. The change callback
    /// fires once with the initial value.
    pub fn parse(&mut self, options: ParserOptions) -> Result<Option<FieldId>> {
        if let Some(previous) = self.root.take() {
            self.release(previous);
        }
        let root = self.with_building(|tree| tree.spawn(options, None, Link::Root, None))?;
        self.root = root;
        if let Some(root) = root {
            debug!(
                "parsed field tree `{}` with {} fields",
                self.node(root)?.field.id,
                self.len()
            );
            self.emit_change(root)?;
        }
        Ok(root)
    }

    /// Re-run the parser of `id` on its current value.
    ///
    /// Object members whose schema did not change keep their fields.
    pub fn reparse(&mut self, id: FieldId) -> Result<()> {
        self.with_building(|tree| tree.parse_node(id))?;
        self.commit(id)
    }

    pub fn root(&self) -> Option<FieldId> {
        self.root
    }

    pub fn root_field(&self) -> Option<&Field> {
        self.root.and_then(|id| self.field(id))
    }

    /// The root value.
    pub fn value(&self) -> Option<&Value> {
        self.root_field().and_then(Field::value)
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.node(id).ok().map(|node| &node.field)
    }

    /// Whether `id` still points at a live field.
    pub fn contains(&self, id: FieldId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live fields.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Schema `id` currently renders with.
    pub fn schema(&self, id: FieldId) -> Result<&Schema> {
        Ok(&self.node(id)?.schema)
    }

    /// Parser handling `id`.
    pub fn parser(&self, id: FieldId) -> Result<ParserKind> {
        Ok(self.node(id)?.parser)
    }

    /// Look a field up by path from the root, e.g. `address.lines[1]`.
    pub fn get_field(&self, path: &str) -> Option<&Field> {
        let root = self.root?;
        self.find(root, path).and_then(|id| self.field(id))
    }

    /// Resolve `path` relative to `from`.
    ///
    /// Segments are separated by `.`; `[n]` and bare numeric segments index
    /// array items and enum choices. An empty path is `from` itself.
    pub fn find(&self, from: FieldId, path: &str) -> Option<FieldId> {
        let mut current = from;
        for segment in segments(path)? {
            let field = &self.node(current).ok()?.field;
            current = match segment {
                Segment::Key(key) => match field.fields.get(key) {
                    Some(child) => *child,
                    None => *field.children.get(key.parse::<usize>().ok()?)?,
                },
                Segment::Index(index) => *field.children.get(index)?,
            };
        }
        Some(current)
    }

    /// Assign a value to `id` and propagate it to the root.
    ///
    /// With `emit == false` ancestors are updated silently and the change
    /// callback does not fire.
    pub fn set_value(&mut self, id: FieldId, value: Option<Value>, emit: bool) -> Result<()> {
        trace!("set {} to {:?}", self.node(id)?.field.id, value);
        self.assign(id, value)?;
        if emit {
            self.commit(id)
        } else {
            self.propagate(id).map(|_| ())
        }
    }

    /// Restore the initial value of `id` and its descendants.
    pub fn reset(&mut self, id: FieldId) -> Result<()> {
        self.reset_node(id)?;
        self.commit(id)
    }

    /// Remove the value of `id` and its descendants.
    pub fn clear(&mut self, id: FieldId) -> Result<()> {
        self.clear_node(id)?;
        self.commit(id)
    }

    /// Refresh the descriptor of `id`, give `fields` (or `id` alone) a new
    /// render key and notify the render callback.
    pub fn request_render(&mut self, id: FieldId, fields: Option<&[FieldId]>) -> Result<()> {
        let resolver = Arc::clone(&self.descriptors);
        let node = self.node_mut(id)?;
        let mut descriptor = std::mem::take(&mut node.field.descriptor);
        resolver.refresh(&mut descriptor, &node.field);
        node.field.descriptor = descriptor;

        let targets = fields.map_or_else(|| vec![id], <[FieldId]>::to_vec);
        for target in &targets {
            if let Ok(node) = self.node_mut(*target) {
                node.field.key = unique_id(Some("key"));
            }
        }
        trace!("render requested for {} field(s)", targets.len());
        if let Some(callback) = &self.on_render {
            callback(&targets);
        }
        Ok(())
    }

    pub fn add_message(&mut self, id: FieldId, text: impl Into<String>, kind: MessageKind) -> Result<()> {
        self.node_mut(id)?.field.add_message(text, kind);
        Ok(())
    }

    /// Drop the messages of `id`, and of all its descendants when
    /// `recursive`.
    pub fn clear_messages(&mut self, id: FieldId, recursive: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        node.field.messages.clear();
        if recursive {
            let children = node.field.children.clone();
            for child in children {
                self.clear_messages(child, true)?;
            }
        }
        Ok(())
    }

    pub(crate) fn node(&self, id: FieldId) -> Result<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(FormError::StaleField(id))
    }

    pub(crate) fn node_mut(&mut self, id: FieldId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(FormError::StaleField(id))
    }

    fn reserve(&mut self) -> FieldId {
        match self.free.pop() {
            Some(index) => FieldId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                FieldId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    /// Free `id` and its whole subtree.
    pub(crate) fn release(&mut self, id: FieldId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        for child in node.field.children {
            self.release(child);
        }
    }

    pub(crate) fn is_building(&self) -> bool {
        self.building > 0
    }

    /// Run `f` with commits limited to the immediate parent.
    pub(crate) fn with_building<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.building += 1;
        let result = f(self);
        self.building -= 1;
        result
    }

    /// Create the field for `options` under `parent`.
    pub(crate) fn spawn(
        &mut self,
        mut options: ParserOptions,
        parent: Option<FieldId>,
        link: Link,
        choice: Option<Value>,
    ) -> Result<Option<FieldId>> {
        options.schema = std::mem::take(&mut options.schema).with_enum_alternatives();
        let Some((kind_name, parser)) = self.registry.resolve(&options)? else {
            trace!("skip schema without type at {:?}", options.name);
            return Ok(None);
        };
        let deep = match parent {
            Some(parent) => self.node(parent)?.field.deep + 1,
            None => 0,
        };

        let initial_value = options
            .model
            .take()
            .or_else(|| options.schema.const_value.clone())
            .or_else(|| options.schema.default.clone());
        let dom_id = options
            .id
            .clone()
            .unwrap_or_else(|| unique_id(options.name.as_deref()));

        let handle = self.reserve();
        let mut field = Field::new(handle, dom_id, unique_id(Some("key")), FieldKind::from_name(&kind_name));
        field.name = options.name.clone();
        field.is_root = parent.is_none();
        field.parent = parent;
        field.deep = deep;
        field.required = options.required;
        field.has_children = parser.is_set();
        field.value = parser.parse_value(&options.schema, initial_value.as_ref());
        field.raw_value = initial_value.clone();

        self.slots[handle.index as usize].node = Some(Node {
            field,
            parser,
            kind_name,
            schema: options.schema.clone(),
            options,
            initial_value,
            choice,
            link,
            array: None,
        });

        if let Err(err) = self.parse_node(handle) {
            self.release(handle);
            return Err(err);
        }
        Ok(Some(handle))
    }

    /// Compute attributes, children and descriptor of an existing node, then
    /// commit its value.
    pub(crate) fn parse_node(&mut self, id: FieldId) -> Result<()> {
        self.base_attrs(id)?;
        match self.node(id)?.parser {
            ParserKind::Object => self.parse_object(id)?,
            ParserKind::Array => self.parse_array(id)?,
            ParserKind::Enum => self.parse_enum(id)?,
            ParserKind::List => self.parse_list(id)?,
            ParserKind::String
            | ParserKind::Number
            | ParserKind::Integer
            | ParserKind::Boolean
            | ParserKind::Null => self.parse_scalar(id)?,
        }
        self.resolve_descriptor(id)?;
        self.commit(id)
    }

    fn base_attrs(&mut self, id: FieldId) -> Result<()> {
        let node = self.node_mut(id)?;
        let read_only = node.schema.read_only == Some(true);
        let disabled = node.schema.disabled == Some(true);
        let field = &mut node.field;

        let mut input = serde_json::Map::new();
        set_attr(&mut input, "id", field.id.clone());
        if let Some(name) = &field.name {
            set_attr(&mut input, "name", name.clone());
        }
        if field.required {
            set_attr(&mut input, "required", true);
            set_attr(&mut input, "aria-required", "true");
        }
        if read_only {
            set_attr(&mut input, "readonly", true);
        }
        if disabled {
            set_attr(&mut input, "disabled", true);
        }
        field.attrs = Attrs {
            input,
            ..Default::default()
        };
        field.live = LiveAttr::None;
        Ok(())
    }

    fn resolve_descriptor(&mut self, id: FieldId) -> Result<()> {
        let resolver = Arc::clone(&self.descriptors);
        let node = self.node_mut(id)?;
        let descriptor = resolver.resolve(&node.schema, &node.field.kind, node.options.descriptor.as_ref());
        let field = &mut node.field;

        for (name, value) in &descriptor.attrs {
            field.attrs.input.insert(name.clone(), value.clone());
        }
        field.props = descriptor.props.clone();
        field.component = descriptor.component.clone();
        if descriptor.label.is_some() {
            let label_id = format!("{}-label", field.id);
            set_attr(&mut field.attrs.label, "id", label_id.clone());
            set_attr(&mut field.attrs.label, "for", field.id.clone());
            set_attr(&mut field.attrs.input, "aria-labelledby", label_id);
        }
        if descriptor.helper.is_some() {
            let helper_id = format!("{}-helper", field.id);
            set_attr(&mut field.attrs.description, "id", helper_id.clone());
            set_attr(&mut field.attrs.input, "aria-describedby", helper_id);
        }
        field.descriptor = descriptor;

        // objects render as a fieldset, not as an input
        if node.parser == ParserKind::Object {
            for name in ["required", "aria-required", "name"] {
                field.attrs.input.remove(name);
            }
        }
        Ok(())
    }

    /// Store a coerced value on `id` without touching children.
    pub(crate) fn store(&mut self, id: FieldId, raw: Option<Value>) -> Result<()> {
        let node = self.node_mut(id)?;
        node.field.value = node.parser.parse_value(&node.schema, raw.as_ref());
        node.field.raw_value = raw;
        Ok(())
    }

    /// Assign a value to `id` and its descendants, without propagating up.
    pub(crate) fn assign(&mut self, id: FieldId, raw: Option<Value>) -> Result<()> {
        match self.node(id)?.parser {
            ParserKind::Object => self.assign_object(id, raw),
            ParserKind::Array => self.assign_array(id, raw),
            ParserKind::Enum => {
                self.store(id, raw)?;
                self.update_inputs_state(id)
            }
            _ => self.store(id, raw),
        }
    }

    pub(crate) fn reset_node(&mut self, id: FieldId) -> Result<()> {
        let node = self.node(id)?;
        match node.parser {
            ParserKind::Object => self.reset_object(id),
            _ => {
                let initial = node.initial_value.clone();
                self.assign(id, initial)
            }
        }
    }

    pub(crate) fn clear_node(&mut self, id: FieldId) -> Result<()> {
        match self.node(id)?.parser {
            ParserKind::Object => self.clear_object(id),
            _ => self.assign(id, None),
        }
    }

    /// Change the required flag of `id`, keeping its input attributes in step.
    pub(crate) fn set_required(&mut self, id: FieldId, required: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        node.options.required = required;
        if node.field.required == required {
            return Ok(());
        }
        node.field.required = required;
        if node.parser != ParserKind::Object {
            let input = &mut node.field.attrs.input;
            if required {
                set_attr(input, "required", true);
                set_attr(input, "aria-required", "true");
            } else {
                input.remove("required");
                input.remove("aria-required");
            }
        }
        Ok(())
    }

    /// Publish the value of `id` to its ancestors.
    pub(crate) fn commit(&mut self, id: FieldId) -> Result<()> {
        if self.is_building() {
            if let Some(parent) = self.node(id)?.field.parent {
                self.absorb(parent, id)?;
            }
            return Ok(());
        }
        let root = self.propagate(id)?;
        self.emit_change(root)
    }

    /// Absorb `id` into every ancestor, returning the root reached.
    fn propagate(&mut self, id: FieldId) -> Result<FieldId> {
        let mut current = id;
        while let Some(parent) = self.node(current)?.field.parent {
            self.absorb(parent, current)?;
            current = parent;
        }
        Ok(current)
    }

    fn absorb(&mut self, parent: FieldId, child: FieldId) -> Result<()> {
        let node = self.node(child)?;
        let value = node.field.value.clone();
        match node.link.clone() {
            Link::Root => Ok(()),
            Link::Property(key) => self.absorb_property(parent, &key, value),
            Link::Index(index) => self.absorb_item(parent, index, value),
            Link::Checkbox(index) => self.absorb_checkbox(parent, index, value),
            Link::Choice(_) => self.absorb_choice(parent, value),
        }
    }

    fn emit_change(&self, id: FieldId) -> Result<()> {
        if let Some(callback) = &self.on_change {
            let node = self.node(id)?;
            callback(node.field.value.as_ref(), &node.field);
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut out = Vec::new();
    for part in path.split('.').filter(|part| !part.is_empty()) {
        let (head, mut rest) = match part.find('[') {
            Some(at) => part.split_at(at),
            None => (part, ""),
        };
        if !head.is_empty() {
            out.push(Segment::Key(head));
        }
        while !rest.is_empty() {
            if !rest.starts_with('[') {
                return None;
            }
            let close = rest.find(']')?;
            out.push(Segment::Index(rest[1..close].trim().parse().ok()?));
            rest = &rest[close + 1..];
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::test_utils::{build, options};

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("a.b[2].c").unwrap(),
            [
                Segment::Key("a"),
                Segment::Key("b"),
                Segment::Index(2),
                Segment::Key("c")
            ]
        );
        assert_eq!(segments("[0][1]").unwrap(), [Segment::Index(0), Segment::Index(1)]);
        assert!(segments("").unwrap().is_empty());
        assert!(segments("a[x]").is_none());
        assert!(segments("a[1]b").is_none());
    }

    #[test]
    fn test_schema_without_type() {
        let mut tree = FieldTree::default();
        assert_eq!(tree.parse(options(json!({}), None)).unwrap(), None);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_unsupported_type_is_an_error() {
        let mut tree = FieldTree::default();
        let err = tree.parse(options(json!({"type": "date"}), None)).unwrap_err();
        assert!(matches!(err, FormError::UnsupportedType { .. }));
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn test_root_identity() {
        let mut tree = FieldTree::default();
        let root = tree
            .parse(options(json!({"type": "string"}), None).with_name("email"))
            .unwrap()
            .unwrap();
        let field = tree.field(root).unwrap();
        assert!(field.is_root);
        assert_eq!(field.deep, 0);
        assert!(field.id.starts_with("email-"));
        assert_eq!(field.input_attr("name"), Some(json!("email")));

        let root = tree
            .parse(options(json!({"type": "string"}), None).with_id("custom"))
            .unwrap()
            .unwrap();
        assert_eq!(tree.field(root).unwrap().id, "custom");
    }

    #[test]
    fn test_model_const_default_precedence() {
        let (tree, root) = build(json!({"type": "string", "default": "d"}), Some(json!("m")));
        assert_eq!(tree.field(root).unwrap().value(), Some(&json!("m")));
        let (tree, root) = build(json!({"type": "string", "const": "c", "default": "d"}), None);
        assert_eq!(tree.field(root).unwrap().value(), Some(&json!("c")));
        let (tree, root) = build(json!({"type": "string", "default": "d"}), None);
        assert_eq!(tree.field(root).unwrap().value(), Some(&json!("d")));
    }

    #[test]
    fn test_parse_emits_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let mut tree = FieldTree::default().on_change(move |value, field| {
            assert!(field.is_root);
            seen.lock().unwrap().push(value.cloned());
        });
        tree.parse(options(
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "string", "default": "x"},
                    "b": {"type": "array", "items": {"type": "integer"}},
                },
            }),
            Some(json!({"b": [1, 2]})),
        ))
        .unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], Some(json!({"a": "x", "b": [1, 2]})));
    }

    #[test]
    fn test_set_value_propagates_and_emits() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let mut tree = FieldTree::default().on_change(move |value, _| {
            seen.lock().unwrap().push(value.cloned());
        });
        let root = tree
            .parse(options(
                json!({
                    "type": "object",
                    "properties": {
                        "user": {
                            "type": "object",
                            "properties": {"name": {"type": "string"}},
                        },
                    },
                }),
                None,
            ))
            .unwrap()
            .unwrap();
        let name = tree.find(root, "user.name").unwrap();
        tree.set_value(name, Some(json!("Jon")), true).unwrap();
        assert_eq!(tree.value(), Some(&json!({"user": {"name": "Jon"}})));

        tree.set_value(name, Some(json!("Arya")), false).unwrap();
        assert_eq!(tree.value(), Some(&json!({"user": {"name": "Arya"}})));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], Some(json!({"user": {"name": "Jon"}})));
    }

    #[test]
    fn test_set_value_on_set_field_pushes_down() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "boolean"}},
            }),
            None,
        );
        tree.set_value(root, Some(json!({"a": "7", "b": 1})), true).unwrap();
        assert_eq!(tree.get_field("a").unwrap().value(), Some(&json!(7)));
        assert_eq!(tree.get_field("b").unwrap().value(), Some(&json!(true)));
        assert_eq!(tree.value(), Some(&json!({"a": 7, "b": true})));
    }

    #[test]
    fn test_reset_and_clear() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "default": "anon"},
                    "age": {"type": "integer"},
                },
            }),
            Some(json!({"age": 30})),
        );
        let age = tree.find(root, "age").unwrap();
        tree.set_value(age, Some(json!(31)), true).unwrap();
        tree.reset(root).unwrap();
        assert_eq!(tree.value(), Some(&json!({"name": "anon", "age": 30})));

        tree.clear(root).unwrap();
        assert_eq!(tree.value(), Some(&json!({})));
        assert_eq!(tree.field(age).unwrap().value(), None);
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "title": "Profile",
                "properties": {
                    "name": {"type": "string", "minLength": 2},
                    "age": {"type": "integer", "minimum": 0},
                },
                "required": ["name"],
            }),
            Some(json!({"name": "Jon", "age": 3})),
        );
        let before = tree.snapshot(root).unwrap();
        tree.reparse(root).unwrap();
        assert_eq!(tree.snapshot(root).unwrap(), before);
    }

    #[test]
    fn test_descriptor_attrs() {
        let (tree, root) = build(
            json!({"type": "string", "title": "Name", "description": "Full name"}),
            None,
        );
        let field = tree.field(root).unwrap();
        let label_id = format!("{}-label", field.id);
        let helper_id = format!("{}-helper", field.id);
        assert_eq!(field.attrs.label["id"], json!(label_id));
        assert_eq!(field.attrs.label["for"], json!(field.id));
        assert_eq!(field.attrs.description["id"], json!(helper_id));
        assert_eq!(field.input_attr("aria-labelledby"), Some(json!(label_id)));
        assert_eq!(field.input_attr("aria-describedby"), Some(json!(helper_id)));
        assert_eq!(field.label(), Some("Name"));

        let (tree, root) = build(json!({"type": "string"}), None);
        let field = tree.field(root).unwrap();
        assert!(field.attrs.label.is_empty());
        assert!(field.input_attr("aria-labelledby").is_none());
    }

    #[test]
    fn test_readonly_and_disabled() {
        let (tree, root) = build(json!({"type": "string", "readOnly": true, "disabled": true}), None);
        let field = tree.field(root).unwrap();
        assert_eq!(field.input_attr("readonly"), Some(json!(true)));
        assert_eq!(field.input_attr("disabled"), Some(json!(true)));
    }

    #[test]
    fn test_messages() {
        let (mut tree, root) = build(
            json!({"type": "object", "properties": {"a": {"type": "string"}}}),
            None,
        );
        let a = tree.find(root, "a").unwrap();
        tree.add_message(root, "check the form", MessageKind::Warning).unwrap();
        tree.add_message(a, "required", MessageKind::Error).unwrap();

        tree.clear_messages(root, false).unwrap();
        assert!(tree.field(root).unwrap().messages.is_empty());
        assert_eq!(tree.field(a).unwrap().messages.len(), 1);

        tree.clear_messages(root, true).unwrap();
        assert!(tree.field(a).unwrap().messages.is_empty());
    }

    #[test]
    fn test_request_render_rotates_keys() {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&rendered);
        let mut tree = FieldTree::default().on_render(move |ids| {
            seen.lock().unwrap().extend_from_slice(ids);
        });
        let root = tree.parse(options(json!({"type": "string"}), None)).unwrap().unwrap();
        let key = tree.field(root).unwrap().key.clone();
        tree.request_render(root, None).unwrap();
        assert_ne!(tree.field(root).unwrap().key, key);
        assert_eq!(*rendered.lock().unwrap(), [root]);
    }

    fn walk(tree: &FieldTree, id: FieldId, ids: &mut Vec<String>) {
        let field = tree.field(id).unwrap();
        ids.push(field.id.clone());
        assert_eq!(field.input_attr("id"), Some(json!(field.id)));
        for child in &field.children {
            let child_field = tree.field(*child).unwrap();
            assert_eq!(child_field.parent, Some(id), "parent of {}", child_field.id);
            assert_eq!(child_field.deep, field.deep + 1, "depth of {}", child_field.id);
            assert!(!child_field.is_root);
            walk(tree, *child, ids);
        }
        for member in field.fields.values() {
            assert!(field.children.contains(member));
        }
    }

    #[test]
    fn test_tree_links_and_unique_ids() {
        let (mut tree, root) = build(
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "object", "properties": {"b": {"type": "string"}}},
                    "a-b": {"type": "string"},
                    "a b": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "size": {"type": "string", "enum": ["s", "m", "l"]},
                    "level": {"type": "string", "enum": ["1", "2", "3", "4", "5"]},
                    "colors": {
                        "type": "array",
                        "uniqueItems": true,
                        "items": {"type": "string", "enum": ["red", "blue"]},
                    },
                    "rows": {
                        "type": "array",
                        "items": {"type": "object", "properties": {"0": {"type": "integer"}}},
                    },
                },
            }),
            Some(json!({"tags": ["x", "y"], "rows": [{"0": 1}]})),
        );
        assert!(tree.root_field().unwrap().is_root);
        assert_eq!(tree.root_field().unwrap().parent, None);

        let mut ids = Vec::new();
        walk(&tree, root, &mut ids);
        assert_eq!(ids.len(), tree.len());
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "{ids:?}");

        let nested = tree.get_field("a.b").unwrap().id.clone();
        let flat = tree.get_field("a-b").unwrap().id.clone();
        assert_ne!(nested, flat);

        let tags = tree.find(root, "tags").unwrap();
        tree.push(tags).unwrap();
        let mut ids = Vec::new();
        walk(&tree, root, &mut ids);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "{ids:?}");
    }

    #[test]
    fn test_replacing_root_frees_old_handles() {
        let (mut tree, root) = build(
            json!({"type": "object", "properties": {"a": {"type": "string"}}}),
            None,
        );
        let a = tree.find(root, "a").unwrap();
        tree.parse(options(json!({"type": "integer"}), None)).unwrap();
        assert!(!tree.contains(root));
        assert!(!tree.contains(a));
        assert!(matches!(tree.set_value(a, None, true), Err(FormError::StaleField(_))));
        assert_eq!(tree.len(), 1);
    }
}
