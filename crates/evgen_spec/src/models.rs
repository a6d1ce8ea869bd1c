//! OpenAPI document models.
//!
//! Only the parts of an OpenAPI document that drive routing are modelled:
//! servers, paths with their operations, and reusable parameters. Everything
//! else (schemas, responses, security) is ignored on deserialization.
//!
//! Mappings whose order is observable in the generated template (`paths`,
//! path item methods, `components.parameters`) are kept as ordered entry lists.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

/// HTTP methods recognized as operations inside a path item.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Returns true when `key` names an HTTP method (case-insensitive).
pub fn is_http_method(key: &str) -> bool {
    HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(key))
}

/// Root of an API description document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSpecification {
    #[serde(default)]
    pub info: Option<Info>,

    /// Candidate deployment endpoints.
    #[serde(default)]
    pub servers: Vec<Server>,

    /// URL template to path item, in declaration order.
    #[serde(default, deserialize_with = "path_entries")]
    pub paths: Vec<(String, PathItem)>,

    #[serde(default)]
    pub components: Components,
}

impl ApiSpecification {
    /// Display title of the API, if declared.
    pub fn title(&self) -> Option<&str> {
        self.info.as_ref().and_then(|i| i.title.as_deref())
    }

    /// Look up a path item by its URL template.
    pub fn path(&self, template: &str) -> Option<&PathItem> {
        self.paths
            .iter()
            .find(|(key, _)| key == template)
            .map(|(_, item)| item)
    }

    /// Total number of operations across all paths.
    pub fn operation_count(&self) -> usize {
        self.paths.iter().map(|(_, item)| item.operations.len()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A deployment endpoint. `description` doubles as the environment label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The URL, when present and non-empty.
    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    /// Reusable parameter name to definition, in declaration order.
    #[serde(default, deserialize_with = "ordered_entries")]
    pub parameters: Vec<(String, ParameterDefinition)>,
}

/// Operations declared on a single URL template.
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Parameters shared by every operation on this path.
    pub parameters: Vec<ParameterSpec>,
    /// HTTP method to operation, in declaration order.
    pub operations: Vec<(String, Operation)>,
}

impl PathItem {
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|(m, _)| m.eq_ignore_ascii_case(method))
            .map(|(_, op)| op)
    }
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PathItemVisitor;

        impl<'de> Visitor<'de> for PathItemVisitor {
            type Value = PathItem;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an OpenAPI path item mapping")
            }

            fn visit_map<A>(self, mut map: A) -> Result<PathItem, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut item = PathItem::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "parameters" {
                        item.parameters = map.next_value()?;
                    } else if is_http_method(&key) {
                        let operation = map.next_value()?;
                        item.operations.push((key, operation));
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(item)
            }

            fn visit_unit<E>(self) -> Result<PathItem, E> {
                Ok(PathItem::default())
            }
        }

        deserializer.deserialize_map(PathItemVisitor)
    }
}

/// A single HTTP operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Stable trigger identifier used as the event `detail-type`.
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    /// Kept opaque; only its presence is interpreted.
    #[serde(default)]
    pub request_body: Option<serde_yaml::Value>,
}

impl Operation {
    /// The trigger identifier, ignoring empty strings.
    pub fn trigger_identifier(&self) -> Option<&str> {
        self.operation_id.as_deref().filter(|id| !id.is_empty())
    }

    /// True when a request body is declared with inline content or by reference.
    pub fn has_request_body(&self) -> bool {
        match &self.request_body {
            Some(serde_yaml::Value::Mapping(body)) => {
                body.contains_key("content") || body.contains_key("$ref")
            }
            _ => false,
        }
    }
}

/// A parameter attached to a path item or operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParameterSpec {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline(ParameterDefinition),
}

impl ParameterSpec {
    /// Name of the referenced reusable parameter (last `/` segment of the `$ref`).
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            ParameterSpec::Reference { reference } => reference.rsplit('/').next(),
            ParameterSpec::Inline(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ParameterDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "in")]
    pub location: Option<ParameterLocation>,
}

impl ParameterDefinition {
    pub fn query(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Some(ParameterLocation::Query),
        }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Some(ParameterLocation::Path),
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self.location, Some(ParameterLocation::Query))
    }
}

/// Where a parameter is carried. Parsed case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Other(String),
}

impl From<String> for ParameterLocation {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "path" => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            _ => ParameterLocation::Other(value),
        }
    }
}

/// Deserialize a string-keyed mapping into an ordered list of entries.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_map(EntriesVisitor::new(false))
}

/// Like [`ordered_entries`], but skips `x-` extension keys whatever their value.
fn path_entries<'de, D>(deserializer: D) -> Result<Vec<(String, PathItem)>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(EntriesVisitor::new(true))
}

fn is_extension(key: &str) -> bool {
    key.starts_with("x-")
}

struct EntriesVisitor<T> {
    skip_extensions: bool,
    marker: PhantomData<T>,
}

impl<T> EntriesVisitor<T> {
    fn new(skip_extensions: bool) -> Self {
        Self {
            skip_extensions,
            marker: PhantomData,
        }
    }
}

impl<'de, T> Visitor<'de> for EntriesVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Vec<(String, T)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            if self.skip_extensions && is_extension(&key) {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            let value = map.next_value::<T>()?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }
}
