//! Effective object schemas.
//!
//! An object schema using `if/then/else` or schema-form `dependencies` has a
//! shape that depends on the current model. [`effective_schema`] derives that
//! shape from the canonical schema in a single pass; the canonical schema is
//! never modified, so switching branches back and forth needs no snapshot.

use serde_json::{Map, Value};

use super::{Dependency, Schema};
use crate::value;

/// Which branch of an `if` applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Then,
    Else,
}

/// Evaluate an `if` subschema against an object model.
///
/// A property constrained with `const` or `enum` must be present and match.
/// Names listed in `required` must be present and not `null`. A condition
/// without any of these constraints matches everything.
pub fn matches(condition: &Schema, model: &Map<String, Value>) -> bool {
    if let Some(properties) = &condition.properties {
        for (key, property) in properties {
            let current = model.get(key);
            if let Some(expected) = &property.const_value {
                if !current.is_some_and(|v| value::same(v, expected)) {
                    return false;
                }
            }
            if let Some(allowed) = &property.enum_values {
                if !current.is_some_and(|v| allowed.iter().any(|a| value::same(v, a))) {
                    return false;
                }
            }
        }
    }
    if let Some(required) = &condition.required {
        if required
            .iter()
            .any(|key| matches!(model.get(key), None | Some(Value::Null)))
        {
            return false;
        }
    }
    true
}

/// Branch of the canonical schema's `if` that applies to `model`, if the
/// schema has a condition at all.
pub fn active_branch(canonical: &Schema, model: &Map<String, Value>) -> Option<Branch> {
    canonical.if_schema.as_ref().map(|condition| {
        if matches(condition, model) {
            Branch::Then
        } else {
            Branch::Else
        }
    })
}

/// Merge a schema fragment's `properties` and `required` into `target`.
///
/// Fragment properties override same-named ones; `required` is a union that
/// keeps first-seen order.
pub fn merge_fragment(target: &mut Schema, fragment: &Schema) {
    if let Some(properties) = &fragment.properties {
        let merged = target.properties.get_or_insert_with(Default::default);
        for (key, property) in properties {
            merged.insert(key.clone(), property.clone());
        }
    }
    if let Some(required) = &fragment.required {
        let merged = target.required.get_or_insert_with(Vec::new);
        for key in required {
            if !merged.contains(key) {
                merged.push(key.clone());
            }
        }
    }
}

/// Derive the schema an object currently renders with.
///
/// Schema-form dependencies whose trigger is filled in are merged first, then
/// the active `if` branch.
pub fn effective_schema(canonical: &Schema, model: &Map<String, Value>) -> Schema {
    let mut schema = canonical.clone();

    if let Some(dependencies) = &canonical.dependencies {
        for (trigger, dependency) in dependencies {
            if let Dependency::Schema(fragment) = dependency {
                if !value::is_empty(model.get(trigger)) {
                    merge_fragment(&mut schema, fragment);
                }
            }
        }
    }

    let branch = match active_branch(canonical, model) {
        Some(Branch::Then) => canonical.then.as_deref(),
        Some(Branch::Else) => canonical.else_schema.as_deref(),
        None => None,
    };
    if let Some(fragment) = branch {
        merge_fragment(&mut schema, fragment);
    }

    schema
}

/// Whether `key` is required by an array-form dependency whose trigger is
/// filled in. Several triggers naming the same property combine with OR.
pub fn required_by_dependency(schema: &Schema, key: &str, model: &Map<String, Value>) -> bool {
    schema.dependencies.as_ref().is_some_and(|dependencies| {
        dependencies.iter().any(|(trigger, dependency)| match dependency {
            Dependency::Properties(names) => {
                names.iter().any(|name| name == key) && !value::is_empty(model.get(trigger))
            }
            Dependency::Schema(_) => false,
        })
    })
}
