//! Merging generated resources into a blueprint template.
//!
//! The merge is a shallow, ordered union on the `Resources` mapping: a
//! generated resource replaces a blueprint resource of the same name in place,
//! and new names are appended. Everything else in the blueprint is untouched.

use serde_yaml::{Mapping, Value};

use crate::error::{IacError, IacResult};
use crate::policy::{GenerationPolicy, TEMPLATE_FORMAT_VERSION};

/// Key of the resources section of a template.
pub const RESOURCES_KEY: &str = "Resources";

/// Apply `overlay` on top of `base`. Entries in `overlay` win on key collision.
///
/// Returns the keys of `base` that were replaced.
pub fn overlay_resources(base: &mut Mapping, overlay: Mapping) -> Vec<String> {
    let mut replaced = Vec::new();
    for (key, value) in overlay {
        if base.insert(key.clone(), value).is_some() {
            if let Value::String(name) = key {
                replaced.push(name);
            }
        }
    }
    replaced
}

/// Minimal template used when no blueprint is supplied.
pub fn default_template(policy: &GenerationPolicy) -> Value {
    let mut template = Mapping::new();
    template.insert(
        "AWSTemplateFormatVersion".into(),
        TEMPLATE_FORMAT_VERSION.into(),
    );
    template.insert(
        "Description".into(),
        policy.template_description.clone().into(),
    );
    template.insert(RESOURCES_KEY.into(), Value::Mapping(Mapping::new()));
    Value::Mapping(template)
}

/// Merge `resources` into the `Resources` section of `template`.
///
/// A missing or null `Resources` section is created; an existing one keeps its
/// position in the document. Returns the merged template and the blueprint
/// resource names that generated ones replaced.
pub fn merge_into_template(template: Value, resources: Mapping) -> IacResult<(Value, Vec<String>)> {
    let mut template = match template {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        other => {
            return Err(IacError::InvalidBlueprint(format!(
                "expected a mapping at the document root, found {}",
                kind(&other)
            )))
        }
    };

    let slot = template
        .entry(RESOURCES_KEY.into())
        .or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Mapping(Mapping::new());
    }

    let replaced = match slot {
        Value::Mapping(existing) => overlay_resources(existing, resources),
        other => {
            return Err(IacError::InvalidBlueprint(format!(
                "expected '{}' to be a mapping, found {}",
                RESOURCES_KEY,
                kind(other)
            )))
        }
    };

    Ok((Value::Mapping(template), replaced))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
