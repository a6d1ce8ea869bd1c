//! Query parameter resolution.
//!
//! Query parameters are forwarded from the triggering event's detail payload,
//! so every resolved parameter maps to `$.detail.<name>`.

use std::collections::HashSet;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;

use evgen_spec::{ApiSpecification, Operation, ParameterSpec, PathItem};

/// Prefix of every extraction expression into the event detail payload.
pub const DETAIL_PREFIX: &str = "$.detail.";

/// Extraction expression for a detail payload field.
pub fn detail_expression(field: &str) -> String {
    format!("{}{}", DETAIL_PREFIX, field)
}

/// A reusable query parameter from `components.parameters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReusableQueryParam {
    /// Key under `components.parameters`, the target of a `$ref`.
    pub ref_name: String,
    /// Declared query parameter name.
    pub param_name: String,
}

/// Ordered mapping of query parameter name to extraction expression.
///
/// Inserting an existing name replaces its expression but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    entries: Vec<(String, String)>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter forwarded from the detail payload field of the same name.
    pub fn insert_detail(&mut self, name: &str) {
        self.insert(name, detail_expression(name));
    }

    pub fn insert(&mut self, name: impl Into<String>, expression: impl Into<String>) {
        let name = name.into();
        let expression = expression.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = expression,
            None => self.entries.push((name, expression)),
        }
    }

    /// Apply `other` on top of `self`; entries in `other` win on name collision.
    pub fn merge(mut self, other: QueryParameters) -> Self {
        for (name, expression) in other.entries {
            self.insert(name, expression);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for QueryParameters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, expression) in &self.entries {
            map.serialize_entry(name, expression)?;
        }
        map.end()
    }
}

/// Collect the reusable parameters located in the query string.
pub fn load_reusable_query_params(spec: &ApiSpecification) -> Vec<ReusableQueryParam> {
    spec.components
        .parameters
        .iter()
        .filter(|(_, definition)| definition.is_query())
        .map(|(ref_name, definition)| ReusableQueryParam {
            ref_name: ref_name.clone(),
            param_name: definition.name.clone(),
        })
        .collect()
}

/// Resolve the query parameters among `params`.
///
/// References that do not point at a reusable query parameter are dropped.
pub fn resolve_query_params(
    params: &[ParameterSpec],
    reusable: &[ReusableQueryParam],
) -> QueryParameters {
    let mut resolved = QueryParameters::new();

    for param in params {
        match param {
            ParameterSpec::Reference { .. } => {
                let ref_name = param.reference_name().unwrap_or_default();
                if let Some(found) = reusable.iter().find(|p| p.ref_name == ref_name) {
                    resolved.insert_detail(&found.param_name);
                }
            }
            ParameterSpec::Inline(definition) => {
                if definition.is_query() && !definition.name.is_empty() {
                    resolved.insert_detail(&definition.name);
                }
            }
        }
    }

    resolved
}

/// Resolves query parameters for operations of a single specification.
pub struct ParameterResolver {
    reusable: Vec<ReusableQueryParam>,
    declared: HashSet<String>,
}

impl ParameterResolver {
    pub fn from_spec(spec: &ApiSpecification) -> Self {
        Self {
            reusable: load_reusable_query_params(spec),
            declared: spec
                .components
                .parameters
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }

    pub fn reusable(&self) -> &[ReusableQueryParam] {
        &self.reusable
    }

    /// Query parameters of `operation`, inheriting those declared on its path item.
    pub fn resolve_operation(&self, path_item: &PathItem, operation: &Operation) -> QueryParameters {
        let path_level = resolve_query_params(&path_item.parameters, &self.reusable);
        let operation_level = resolve_query_params(&operation.parameters, &self.reusable);
        path_level.merge(operation_level)
    }

    /// `$ref` targets among `params` that no reusable parameter declares.
    pub fn unresolved_references<'a>(&self, params: &'a [ParameterSpec]) -> Vec<&'a str> {
        params
            .iter()
            .filter_map(|param| match param {
                ParameterSpec::Reference { reference } => {
                    let name = param.reference_name().unwrap_or_default();
                    (!self.declared.contains(name)).then_some(reference.as_str())
                }
                ParameterSpec::Inline(_) => None,
            })
            .inspect(|reference| warn!("Parameter reference '{}' does not resolve; ignoring it", reference))
            .collect()
    }
}
