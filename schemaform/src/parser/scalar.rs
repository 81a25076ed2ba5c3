use serde_json::Value;

use crate::{
    error::Result,
    field::{FieldId, FieldKind, LiveAttr, set_attr},
    parser::ParserKind,
    schema::Bound,
    tree::{FieldTree, Node},
    value,
};

/// Input type implied by a string `format`.
fn format_type(format: &str) -> Option<&'static str> {
    match format {
        "email" | "idn-email" => Some("email"),
        "uri" | "iri" | "url" => Some("url"),
        "date" => Some("date"),
        "date-time" => Some("datetime-local"),
        "time" => Some("time"),
        _ => None,
    }
}

impl FieldTree {
    pub(crate) fn parse_scalar(&mut self, id: FieldId) -> Result<()> {
        let step = self.registry.config().exclusive_bound_step;
        let node = self.node_mut(id)?;
        match node.parser {
            ParserKind::String => string_attrs(node),
            ParserKind::Number | ParserKind::Integer => number_attrs(node, step),
            ParserKind::Boolean => boolean_attrs(node),
            ParserKind::Null => null_attrs(node),
            _ => {}
        }
        if node.choice.is_some() && node.kind_name != "checkbox" {
            radio_attrs(node);
        }
        Ok(())
    }
}

fn string_attrs(node: &mut Node) {
    let schema = &node.schema;
    let field = &mut node.field;
    field.live = LiveAttr::Value;

    match node.kind_name.as_str() {
        "string" => {
            let media = schema.content_media_type.as_deref().filter(|m| !m.is_empty());
            if let Some(input_type) = schema.format.as_deref().and_then(format_type) {
                set_attr(&mut field.attrs.input, "type", input_type);
            } else if let Some(media) = media {
                if media.starts_with("text/") {
                    field.kind = FieldKind::Textarea;
                } else {
                    field.kind = if media.starts_with("image/") {
                        FieldKind::Image
                    } else {
                        FieldKind::File
                    };
                    set_attr(&mut field.attrs.input, "type", "file");
                    set_attr(&mut field.attrs.input, "accept", media);
                    field.live = LiveAttr::None;
                }
            } else {
                set_attr(&mut field.attrs.input, "type", "text");
            }
        }
        "textarea" => {}
        "image" | "file" => {
            set_attr(&mut field.attrs.input, "type", "file");
            if let Some(media) = &schema.content_media_type {
                set_attr(&mut field.attrs.input, "accept", media.clone());
            }
            field.live = LiveAttr::None;
        }
        other => set_attr(&mut field.attrs.input, "type", other),
    }

    if let Some(exact) = &schema.const_value {
        set_attr(
            &mut field.attrs.input,
            "pattern",
            regex::escape(&value::to_js_string(exact)),
        );
    } else if let Some(pattern) = &schema.pattern {
        set_attr(&mut field.attrs.input, "pattern", pattern.clone());
    }
    if let Some(min) = schema.min_length {
        set_attr(&mut field.attrs.input, "minlength", min);
    }
    if let Some(max) = schema.max_length {
        set_attr(&mut field.attrs.input, "maxlength", max);
    }
}

fn number_attrs(node: &mut Node, step: f64) {
    let schema = &node.schema;
    let field = &mut node.field;
    field.live = LiveAttr::Value;
    set_attr(&mut field.attrs.input, "type", "number");

    let min = match schema.exclusive_minimum {
        Some(Bound::Value(bound)) => Some(bound + step),
        Some(Bound::Flag(true)) => schema.minimum.map(|m| m + step),
        _ => schema.minimum,
    };
    let max = match schema.exclusive_maximum {
        Some(Bound::Value(bound)) => Some(bound - step),
        Some(Bound::Flag(true)) => schema.maximum.map(|m| m - step),
        _ => schema.maximum,
    };
    if let Some(min) = min.and_then(value::number) {
        field.attrs.input.insert("min".to_string(), min);
    }
    if let Some(max) = max.and_then(value::number) {
        field.attrs.input.insert("max".to_string(), max);
    }
    if let Some(step) = schema.multiple_of.and_then(value::number) {
        field.attrs.input.insert("step".to_string(), step);
    }
}

fn boolean_attrs(node: &mut Node) {
    let field = &mut node.field;
    set_attr(&mut field.attrs.input, "type", "checkbox");
    field.live = LiveAttr::Checked;
    // member of a checkbox group: submits its literal
    if let Some(literal) = &node.choice {
        set_attr(&mut field.attrs.input, "value", value::to_js_string(literal));
    }
}

fn null_attrs(node: &mut Node) {
    let field = &mut node.field;
    set_attr(&mut field.attrs.input, "type", "hidden");
    set_attr(&mut field.attrs.input, "value", "\u{0}");
    field.live = LiveAttr::None;
}

fn radio_attrs(node: &mut Node) {
    let field = &mut node.field;
    field.kind = FieldKind::Radio;
    field.live = LiveAttr::None;
    let input = &mut field.attrs.input;
    for name in ["min", "max", "step", "minlength", "maxlength", "pattern", "accept"] {
        input.remove(name);
    }
    set_attr(input, "type", "radio");
    let literal = node.choice.as_ref().map_or(Value::Null, |l| Value::String(value::to_js_string(l)));
    input.insert("value".to_string(), literal);
    set_attr(input, "checked", false);
}
