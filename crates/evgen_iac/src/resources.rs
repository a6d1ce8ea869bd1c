//! CloudFormation resources generated for EventBridge API destinations.
//!
//! Every endpoint produces an `AWS::Events::ApiDestination` and an
//! `AWS::Events::Rule` targeting it. The rules share one execution role, one
//! dead-letter queue and one API-key connection. Resources refer to each other
//! by logical name only, through `Fn::GetAtt` and `Ref`.

use std::collections::BTreeMap;

use serde::Serialize;

use evgen_spec::Operation;

use crate::error::IacResult;
use crate::naming::{extract_path_params, rule_name};
use crate::parameters::{detail_expression, QueryParameters};
use crate::policy::GenerationPolicy;

/// `{"Fn::GetAtt": [resource, attribute]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    pub target: [String; 2],
}

impl GetAtt {
    pub fn arn(resource: impl Into<String>) -> Self {
        Self {
            target: [resource.into(), "Arn".to_string()],
        }
    }

    /// Logical name of the referenced resource.
    pub fn resource(&self) -> &str {
        &self.target[0]
    }
}

/// `{"Ref": parameter}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    #[serde(rename = "Ref")]
    pub name: String,
}

/// `{"Fn::Sub": template}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sub {
    #[serde(rename = "Fn::Sub")]
    pub template: String,
}

/// A resource emitted by the compiler, serialized as `{Type, Properties}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum GeneratedResource {
    #[serde(rename = "AWS::Events::ApiDestination")]
    ApiDestination(ApiDestination),

    #[serde(rename = "AWS::Events::Rule")]
    Rule(Rule),

    #[serde(rename = "AWS::IAM::Role")]
    ExecutionRole(ExecutionRole),

    #[serde(rename = "AWS::SQS::Queue")]
    DeadLetterQueue,

    #[serde(rename = "AWS::Events::Connection")]
    Connection(Connection),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiDestination {
    pub connection_arn: GetAtt,
    pub http_method: String,
    pub invocation_endpoint: String,
    pub invocation_rate_limit_per_second: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub event_bus_name: Ref,
    pub event_pattern: EventPattern,
    pub state: String,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPattern {
    #[serde(rename = "detail-type")]
    pub detail_type: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Target {
    pub id: String,
    pub arn: GetAtt,
    pub role_arn: GetAtt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_transformer: Option<InputTransformer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_parameters: Option<HttpParameters>,
    pub dead_letter_config: DeadLetterConfig,
}

/// Forwards the event's `message` field as the literal request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputTransformer {
    pub input_paths_map: BTreeMap<String, String>,
    pub input_template: String,
}

impl InputTransformer {
    pub fn message_body() -> Self {
        let mut input_paths_map = BTreeMap::new();
        input_paths_map.insert("message".to_string(), detail_expression("message"));
        Self {
            input_paths_map,
            input_template: "\"<message>\"".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpParameters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path_parameter_values: Vec<String>,
    #[serde(skip_serializing_if = "QueryParameters::is_empty")]
    pub query_string_parameters: QueryParameters,
}

impl HttpParameters {
    pub fn is_empty(&self) -> bool {
        self.path_parameter_values.is_empty() && self.query_string_parameters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeadLetterConfig {
    pub arn: GetAtt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionRole {
    pub assume_role_policy_document: PolicyDocument<TrustStatement>,
    pub path: String,
    pub policies: Vec<InlinePolicy>,
}

impl ExecutionRole {
    /// Role assumable by EventBridge, allowed to invoke no destination yet.
    pub fn for_events() -> Self {
        Self {
            assume_role_policy_document: PolicyDocument::new(vec![TrustStatement {
                effect: "Allow".to_string(),
                principal: Principal {
                    service: "events.amazonaws.com".to_string(),
                },
                action: "sts:AssumeRole".to_string(),
            }]),
            path: "/service-role/".to_string(),
            policies: vec![InlinePolicy {
                policy_name: "destinationinvoke".to_string(),
                policy_document: PolicyDocument::new(vec![PermissionStatement {
                    effect: "Allow".to_string(),
                    action: vec!["events:InvokeApiDestination".to_string()],
                    resource: Vec::new(),
                }]),
            }],
        }
    }

    /// Replace the invoke permission's resources with the given destinations, in order.
    pub fn grant_invoke(&mut self, destinations: &[String]) {
        let resources: Vec<GetAtt> = destinations.iter().map(GetAtt::arn).collect();
        if let Some(statement) = self
            .policies
            .first_mut()
            .and_then(|policy| policy.policy_document.statement.first_mut())
        {
            statement.resource = resources;
        }
    }

    /// Destinations the role may invoke.
    pub fn invocable(&self) -> Vec<&str> {
        self.policies
            .iter()
            .flat_map(|policy| &policy.policy_document.statement)
            .flat_map(|statement| &statement.resource)
            .map(GetAtt::resource)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument<S> {
    pub version: String,
    pub statement: Vec<S>,
}

impl<S> PolicyDocument<S> {
    pub fn new(statement: Vec<S>) -> Self {
        Self {
            version: "2012-10-17".to_string(),
            statement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustStatement {
    pub effect: String,
    pub principal: Principal,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionStatement {
    pub effect: String,
    pub action: Vec<String>,
    pub resource: Vec<GetAtt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument<PermissionStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    pub authorization_type: String,
    pub auth_parameters: AuthParameters,
}

impl Connection {
    /// API-key authorization whose value comes from a template parameter.
    pub fn api_key(key_name: impl Into<String>, credential_parameter: &str) -> Self {
        Self {
            authorization_type: "API_KEY".to_string(),
            auth_parameters: AuthParameters {
                api_key_auth_parameters: ApiKeyAuthParameters {
                    api_key_name: key_name.into(),
                    api_key_value: Sub {
                        template: format!("${{{}}}", credential_parameter),
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthParameters {
    pub api_key_auth_parameters: ApiKeyAuthParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiKeyAuthParameters {
    pub api_key_name: String,
    pub api_key_value: Sub,
}

/// Ordered set of generated resources keyed by logical name.
///
/// Inserting an existing name replaces the resource in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    entries: Vec<(String, GeneratedResource)>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        resource: GeneratedResource,
    ) -> Option<GeneratedResource> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, resource)),
            None => {
                self.entries.push((name, resource));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&GeneratedResource> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut GeneratedResource> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Grant the execution role named `role_name` invoke permission on `destinations`.
    ///
    /// Returns false when no execution role exists under that name.
    pub fn grant_invoke(&mut self, role_name: &str, destinations: &[String]) -> bool {
        match self.get_mut(role_name) {
            Some(GeneratedResource::ExecutionRole(role)) => {
                role.grant_invoke(destinations);
                true
            }
            _ => false,
        }
    }

    /// Serialize into a template `Resources` mapping.
    pub fn to_mapping(&self) -> IacResult<serde_yaml::Mapping> {
        let mut mapping = serde_yaml::Mapping::with_capacity(self.entries.len());
        for (name, resource) in &self.entries {
            mapping.insert(
                serde_yaml::Value::String(name.clone()),
                serde_yaml::to_value(resource)?,
            );
        }
        Ok(mapping)
    }
}

/// The execution role, dead-letter queue and connection shared by all rules.
pub fn static_resources(policy: &GenerationPolicy) -> ResourceSet {
    let mut resources = ResourceSet::new();
    resources.insert(
        &policy.role_name,
        GeneratedResource::ExecutionRole(ExecutionRole::for_events()),
    );
    resources.insert(&policy.dead_letter_queue_name, GeneratedResource::DeadLetterQueue);
    resources.insert(
        &policy.connection_name,
        GeneratedResource::Connection(Connection::api_key(
            &policy.api_key_name,
            &policy.credential_parameter,
        )),
    );
    resources
}

/// Everything needed to generate the resources of one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDefinition<'a> {
    /// Logical name of the destination.
    pub resource_name: &'a str,
    /// Path as declared, with `{param}` segments.
    pub raw_path: &'a str,
    /// Path with templated segments replaced by wildcards.
    pub wildcard_path: &'a str,
    pub method: &'a str,
    /// Must carry a trigger identifier.
    pub operation: &'a Operation,
    pub query_params: &'a QueryParameters,
    pub base_url: &'a str,
}

/// Build the destination and its rule for one endpoint.
pub fn synthesize(
    endpoint: &EndpointDefinition<'_>,
    policy: &GenerationPolicy,
) -> Vec<(String, GeneratedResource)> {
    let trigger = endpoint.operation.trigger_identifier().unwrap_or_default();

    let destination = ApiDestination {
        connection_arn: GetAtt::arn(&policy.connection_name),
        http_method: endpoint.method.to_uppercase(),
        invocation_endpoint: format!("{}{}", endpoint.base_url, endpoint.wildcard_path),
        invocation_rate_limit_per_second: policy.invocation_rate_limit_per_second,
    };

    let http_parameters = HttpParameters {
        path_parameter_values: extract_path_params(endpoint.raw_path)
            .iter()
            .map(|name| detail_expression(name))
            .collect(),
        query_string_parameters: endpoint.query_params.clone(),
    };

    let target = Target {
        id: format!("{}-rule", trigger),
        arn: GetAtt::arn(endpoint.resource_name),
        role_arn: GetAtt::arn(&policy.role_name),
        input_transformer: endpoint
            .operation
            .has_request_body()
            .then(InputTransformer::message_body),
        http_parameters: (!http_parameters.is_empty()).then_some(http_parameters),
        dead_letter_config: DeadLetterConfig {
            arn: GetAtt::arn(&policy.dead_letter_queue_name),
        },
    };

    let rule = Rule {
        event_bus_name: Ref {
            name: policy.event_bus_parameter.clone(),
        },
        event_pattern: EventPattern {
            detail_type: vec![trigger.to_string()],
        },
        state: "ENABLED".to_string(),
        targets: vec![target],
    };

    vec![
        (
            endpoint.resource_name.to_string(),
            GeneratedResource::ApiDestination(destination),
        ),
        (
            rule_name(endpoint.resource_name, &policy.rule_suffix),
            GeneratedResource::Rule(rule),
        ),
    ]
}
