use serde_json::Value;

use crate::{
    descriptor::Descriptor,
    error::{FormError, Result},
    field::{ButtonState, FieldId, ItemActions},
    parser::ParserOptions,
    schema::{Items, Schema},
    tree::{FieldTree, Link, Node},
    value,
};

/// Structural state of an array field.
#[derive(Debug, Clone, Default)]
pub(crate) struct ArrayState {
    /// Item schemas: one repeated schema, or the fixed tuple positions.
    pub(crate) items: Vec<Schema>,
    pub(crate) tuple: bool,
    /// Schema of tuple positions past `items`.
    pub(crate) additional: Option<Schema>,
    pub(crate) count: usize,
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
    /// Literals of an enum-items checkbox group.
    pub(crate) checkbox: Option<Vec<Value>>,
    /// Declared labels of the checkbox literals.
    pub(crate) labels: Vec<Option<String>>,
    /// Slot values; `None` is a slot with no value yet. In checkbox mode,
    /// the checked literal or `None` per enum value.
    pub(crate) raw: Vec<Option<Value>>,
}

impl ArrayState {
    fn from_schema(schema: &Schema, model: Option<&Value>) -> Self {
        let values = value::array(model);
        let mut state = ArrayState {
            min: schema.min_items.unwrap_or(0),
            max: schema.max_items,
            ..Default::default()
        };

        let single = match &schema.items {
            Some(Items::Single(item)) => Some((**item).clone().with_enum_alternatives()),
            _ => None,
        };
        match (&schema.items, single) {
            (_, Some(item)) if schema.unique_items == Some(true) && item.enum_values.is_some() => {
                let literals = item.enum_values.clone().unwrap_or_default();
                state.labels = literals
                    .iter()
                    .map(|literal| item.literal_label(literal).map(str::to_string))
                    .collect();
                let mut choice = item;
                choice.enum_values = None;
                choice.one_of = None;
                choice.any_of = None;
                choice.default = None;
                state.raw = literals
                    .iter()
                    .map(|literal| values.iter().any(|v| value::same(v, literal)).then(|| literal.clone()))
                    .collect();
                state.items = vec![choice; literals.len()];
                state.tuple = true;
                state.count = literals.len();
                state.min = literals.len();
                state.max = Some(literals.len());
                state.checkbox = Some(literals);
                return state;
            }
            (_, Some(item)) => state.items = vec![item],
            (Some(Items::Tuple(items)), _) => {
                state.items = items.clone();
                state.tuple = true;
                state.additional = schema.additional_items.as_deref().cloned();
                if state.additional.is_none() {
                    state.max = Some(state.max.map_or(items.len(), |max| max.min(items.len())));
                }
            }
            _ => {}
        }

        state.raw = values.into_iter().map(Some).collect();
        state.count = state.raw.len().max(state.min);
        if let Some(max) = state.max {
            state.count = state.count.min(max);
        }
        state.raw.resize(state.count, None);
        state
    }

    fn item_schema(&self, index: usize) -> Option<&Schema> {
        if self.tuple {
            self.items.get(index).or(self.additional.as_ref())
        } else {
            self.items.first()
        }
    }

    fn push_disabled(&self) -> bool {
        self.checkbox.is_some() || self.items.is_empty() || self.max.is_some_and(|max| self.count >= max)
    }

    fn delete_disabled(&self) -> bool {
        self.checkbox.is_some() || self.count <= self.min
    }

    /// The array value: undefined slots read as `null`; a checkbox group
    /// holds only the checked literals, in enum order.
    fn model(&self) -> Value {
        match self.checkbox {
            Some(_) => Value::Array(self.raw.iter().flatten().cloned().collect()),
            None => Value::Array(self.raw.iter().map(|v| v.clone().unwrap_or(Value::Null)).collect()),
        }
    }
}

fn array_state(node: &Node) -> Result<&ArrayState> {
    node.array
        .as_ref()
        .ok_or_else(|| FormError::kind_mismatch(&node.field.id, "an array"))
}

fn array_state_mut(node: &mut Node) -> Result<&mut ArrayState> {
    match &mut node.array {
        Some(state) => Ok(state),
        None => Err(FormError::kind_mismatch(&node.field.id, "an array")),
    }
}

impl FieldTree {
    pub(crate) fn parse_array(&mut self, id: FieldId) -> Result<()> {
        let node = self.node_mut(id)?;
        let mut state = ArrayState::from_schema(&node.schema, node.field.value.as_ref());
        // a reparse keeps the undefined slots
        if let Some(previous) = &node.array {
            if state.checkbox.is_none() && previous.checkbox.is_none() && previous.count == state.count {
                state.raw = previous.raw.clone();
            }
        }
        node.array = Some(state);
        self.build_items(id)
    }

    /// Rebuild every item of array `id` from its state.
    fn build_items(&mut self, id: FieldId) -> Result<()> {
        self.with_building(|tree| {
            let node = tree.node_mut(id)?;
            let previous = std::mem::take(&mut node.field.children);
            let parent_id = node.field.id.clone();
            let parent_name = node.field.name.clone();
            let user = node.options.descriptor.clone();
            let state = array_state(node)?.clone();
            for child in previous {
                tree.release(child);
            }

            let mut children = Vec::with_capacity(state.count);
            for index in 0..state.count {
                let Some(schema) = state.item_schema(index) else {
                    continue;
                };
                let mut options = ParserOptions {
                    schema: schema.clone(),
                    name: parent_name.as_ref().map(|name| format!("{name}[{index}]")),
                    id: Some(format!("{parent_id}-{index}")),
                    ..Default::default()
                };
                let (link, choice) = match &state.checkbox {
                    Some(literals) => {
                        let literal = literals[index].clone();
                        let text = value::to_js_string(&literal);
                        let label = state.labels.get(index).cloned().flatten().unwrap_or_else(|| text.clone());
                        options.model = Some(Value::Bool(state.raw[index].is_some()));
                        options.kind = Some("checkbox".to_string());
                        options.descriptor = Some(
                            user.as_ref()
                                .and_then(|d| d.values.get(&text).cloned())
                                .unwrap_or_else(|| Descriptor::labelled(label)),
                        );
                        (Link::Checkbox(index), Some(literal))
                    }
                    None => {
                        options.model = state.raw.get(index).cloned().flatten();
                        options.descriptor = user.as_ref().and_then(|d| d.items.as_deref().cloned());
                        (Link::Index(index), None)
                    }
                };
                if let Some(child) = tree.spawn(options, Some(id), link, choice)? {
                    children.push(child);
                }
            }

            if state.checkbox.is_none() {
                let last = children.len().saturating_sub(1);
                for (position, child) in children.iter().enumerate() {
                    tree.node_mut(*child)?.field.actions = Some(ItemActions {
                        move_up: ButtonState { disabled: position == 0 },
                        move_down: ButtonState { disabled: position == last },
                        delete: ButtonState { disabled: state.delete_disabled() },
                    });
                }
            }

            let node = tree.node_mut(id)?;
            node.field.children = children;
            let state = array_state(node)?;
            let model = state.model();
            node.field.raw_value = Some(model.clone());
            node.field.value = Some(model);
            Ok(())
        })
    }

    /// Take the value of item `index` into array `id`.
    pub(crate) fn absorb_item(&mut self, id: FieldId, index: usize, item: Option<Value>) -> Result<()> {
        let node = self.node_mut(id)?;
        let state = array_state_mut(node)?;
        if let Some(slot) = state.raw.get_mut(index) {
            *slot = item;
        }
        let model = state.model();
        node.field.raw_value = Some(model.clone());
        node.field.value = Some(model);
        Ok(())
    }

    /// Check or uncheck literal `index` of checkbox group `id`.
    pub(crate) fn absorb_checkbox(&mut self, id: FieldId, index: usize, checked: Option<Value>) -> Result<()> {
        let node = self.node_mut(id)?;
        let state = array_state_mut(node)?;
        let literal = state
            .checkbox
            .as_ref()
            .and_then(|literals| literals.get(index))
            .cloned();
        if let Some(slot) = state.raw.get_mut(index) {
            *slot = literal.filter(|_| checked == Some(Value::Bool(true)));
        }
        let model = state.model();
        node.field.raw_value = Some(model.clone());
        node.field.value = Some(model);
        Ok(())
    }

    pub(crate) fn assign_array(&mut self, id: FieldId, raw: Option<Value>) -> Result<()> {
        let node = self.node_mut(id)?;
        node.array = Some(ArrayState::from_schema(&node.schema, raw.as_ref()));
        self.build_items(id)?;
        if !self.is_building() {
            self.request_render(id, None)?;
        }
        Ok(())
    }

    /// Number of slots of array `id`.
    pub fn item_count(&self, id: FieldId) -> Result<usize> {
        Ok(array_state(self.node(id)?)?.count)
    }

    /// Slot values of array `id`, `None` for slots without a value.
    pub fn raw_items(&self, id: FieldId) -> Result<&[Option<Value>]> {
        Ok(&array_state(self.node(id)?)?.raw)
    }

    /// Whether pushing a new item is impossible: the array is full, has no
    /// item schema, or is a checkbox group.
    pub fn push_disabled(&self, id: FieldId) -> Result<bool> {
        Ok(array_state(self.node(id)?)?.push_disabled())
    }

    /// Resize array `id` to `count` slots, rebuild its items and commit.
    ///
    /// Returns `false`, leaving the array untouched, when `count` is outside
    /// `[minItems, maxItems]` or the array is a checkbox group.
    pub fn set_count(&mut self, id: FieldId, count: usize) -> Result<bool> {
        let state = array_state_mut(self.node_mut(id)?)?;
        if state.checkbox.is_some() || count < state.min || state.max.is_some_and(|max| count > max) {
            return Ok(false);
        }
        state.count = count;
        state.raw.resize(count, None);
        self.build_items(id)?;
        self.request_render(id, None)?;
        self.commit(id)?;
        Ok(true)
    }

    /// Append an empty item to array `id`.
    pub fn push(&mut self, id: FieldId) -> Result<bool> {
        let state = array_state(self.node(id)?)?;
        if state.push_disabled() {
            debug!("push on `{}` ignored", self.node(id)?.field.id);
            return Ok(false);
        }
        let count = state.count + 1;
        self.set_count(id, count)
    }

    /// Delete the array item `item`, shifting the following items down.
    pub fn delete_item(&mut self, item: FieldId) -> Result<bool> {
        let (array, index) = self.item_position(item)?;
        let state = array_state_mut(self.node_mut(array)?)?;
        if state.delete_disabled() || index >= state.raw.len() {
            return Ok(false);
        }
        state.raw.remove(index);
        let count = state.count - 1;
        state.count = count;
        self.build_items(array)?;
        self.request_render(array, None)?;
        self.commit(array)?;
        Ok(true)
    }

    /// Swap items `from` and `to` of array `id` and rebuild its items, so
    /// every descendant id and name matches its new position.
    ///
    /// Returns the handle of the moved item at its new position.
    pub fn move_item(&mut self, id: FieldId, from: usize, to: usize) -> Result<Option<FieldId>> {
        let state = array_state_mut(self.node_mut(id)?)?;
        if state.checkbox.is_some() || from >= state.raw.len() || to >= state.raw.len() {
            return Ok(None);
        }
        state.raw.swap(from, to);
        self.build_items(id)?;
        self.request_render(id, None)?;
        self.commit(id)?;
        Ok(self.node(id)?.field.children.get(to).copied())
    }

    pub fn move_up(&mut self, item: FieldId) -> Result<Option<FieldId>> {
        let (array, index) = self.item_position(item)?;
        if index == 0 {
            return Ok(None);
        }
        self.move_item(array, index, index - 1)
    }

    pub fn move_down(&mut self, item: FieldId) -> Result<Option<FieldId>> {
        let (array, index) = self.item_position(item)?;
        self.move_item(array, index, index + 1)
    }

    fn item_position(&self, item: FieldId) -> Result<(FieldId, usize)> {
        let node = self.node(item)?;
        match (node.field.parent, &node.link) {
            (Some(parent), Link::Index(index)) => Ok((parent, *index)),
            _ => Err(FormError::kind_mismatch(&node.field.id, "an array item")),
        }
    }
}
