//! Template compilation: API specification in, CloudFormation template out.
//!
//! A compilation is a single pass over the specification's paths and methods in
//! declaration order. The order in which destinations are generated is
//! observable: it is the order of the execution role's permission list.

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use evgen_spec::ApiSpecification;

use crate::error::IacResult;
use crate::merge::{default_template, merge_into_template, RESOURCES_KEY};
use crate::naming::{resource_name, rule_name, to_wildcard_path};
use crate::parameters::ParameterResolver;
use crate::policy::GenerationPolicy;
use crate::resources::{static_resources, synthesize, EndpointDefinition};
use crate::server::resolve_base_url;

/// Methods accepted when none are configured.
pub const DEFAULT_HTTP_METHODS: &str = "PUT,POST,PATCH,DELETE";

const SHARED_ORIGIN: &str = "shared resource";

/// Case-insensitive set of accepted HTTP methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSet {
    methods: BTreeSet<String>,
}

impl MethodSet {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| m.as_ref().trim().to_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list such as `"put, post"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains(&method.to_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Default for MethodSet {
    fn default() -> Self {
        Self::parse(DEFAULT_HTTP_METHODS)
    }
}

impl FromStr for MethodSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.methods.iter().map(String::as_str).collect();
        write!(f, "{}", methods.join(","))
    }
}

/// Caller configuration for a compilation run.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub methods: MethodSet,
    /// Prepended to every generated resource name.
    pub prefix: String,
    /// Server description selecting the base URL.
    pub environment: Option<String>,
    /// Template the generated resources are merged into.
    pub blueprint: Option<Value>,
    pub policy: GenerationPolicy,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_methods(mut self, methods: MethodSet) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_blueprint(mut self, blueprint: Value) -> Self {
        self.blueprint = Some(blueprint);
        self
    }

    pub fn with_policy(mut self, policy: GenerationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A destination and rule pair produced for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDestination {
    pub name: String,
    pub rule_name: String,
    pub path: String,
    pub method: String,
    pub trigger: String,
}

/// Why an accepted operation produced no resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTriggerIdentifier,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTriggerIdentifier => write!(f, "no 'operationId' defined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOperation {
    pub path: String,
    pub method: String,
    pub resource_name: String,
    pub reason: SkipReason,
}

/// Two sources generated the same resource name; the replacement won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    pub existing: String,
    pub replacement: String,
}

/// A `$ref` parameter that no reusable parameter declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub path: String,
    /// None for references declared on the path item.
    pub method: Option<String>,
    pub reference: String,
}

/// Result of a compilation run.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// The merged template, ready for serialization.
    pub template: Value,
    pub base_url: String,
    /// Generated destinations in generation order.
    pub destinations: Vec<GeneratedDestination>,
    pub skipped: Vec<SkippedOperation>,
    pub collisions: Vec<NameCollision>,
    pub unresolved_references: Vec<UnresolvedReference>,
    /// Blueprint resources overwritten by generated ones.
    pub replaced_blueprint_resources: Vec<String>,
}

impl Compilation {
    pub fn resources(&self) -> Option<&Mapping> {
        self.template.get(RESOURCES_KEY).and_then(Value::as_mapping)
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.resources().and_then(|resources| resources.get(name))
    }

    pub fn destination_names(&self) -> Vec<&str> {
        self.destinations.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

/// Compiles API specifications into EventBridge templates.
pub struct TemplateCompiler {
    options: CompileOptions,
}

impl TemplateCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `spec` into a template.
    ///
    /// Fails without producing output when the policy is invalid, the base
    /// URL cannot be resolved, or the blueprint is not a template mapping.
    pub fn compile(&self, spec: &ApiSpecification) -> IacResult<Compilation> {
        let options = &self.options;
        let policy = &options.policy;
        policy.validate()?;

        let resolver = ParameterResolver::from_spec(spec);
        let base_url = resolve_base_url(spec, options.environment.as_deref())?;

        let mut resources = static_resources(policy);
        let mut origins: HashMap<String, String> = resources
            .names()
            .map(|name| (name.to_string(), SHARED_ORIGIN.to_string()))
            .collect();

        let mut destinations = Vec::new();
        let mut skipped = Vec::new();
        let mut collisions = Vec::new();
        let mut unresolved_references = Vec::new();

        for (raw_path, item) in &spec.paths {
            let wildcard_path = to_wildcard_path(raw_path);

            for reference in resolver.unresolved_references(&item.parameters) {
                unresolved_references.push(UnresolvedReference {
                    path: raw_path.clone(),
                    method: None,
                    reference: reference.to_string(),
                });
            }

            for (method, operation) in &item.operations {
                if !options.methods.contains(method) {
                    continue;
                }

                let name = resource_name(&options.prefix, &wildcard_path, method);
                let Some(trigger) = operation.trigger_identifier() else {
                    warn!(
                        "Resource {} does not have an 'operationId' defined. Skipping creation.",
                        name
                    );
                    skipped.push(SkippedOperation {
                        path: raw_path.clone(),
                        method: method.clone(),
                        resource_name: name,
                        reason: SkipReason::MissingTriggerIdentifier,
                    });
                    continue;
                };

                info!("Creating API destination {} with trigger '{}'", name, trigger);

                for reference in resolver.unresolved_references(&operation.parameters) {
                    unresolved_references.push(UnresolvedReference {
                        path: raw_path.clone(),
                        method: Some(method.clone()),
                        reference: reference.to_string(),
                    });
                }

                let query_params = resolver.resolve_operation(item, operation);
                let endpoint = EndpointDefinition {
                    resource_name: &name,
                    raw_path,
                    wildcard_path: &wildcard_path,
                    method,
                    operation,
                    query_params: &query_params,
                    base_url: &base_url,
                };

                let origin = format!("{} {}", method.to_uppercase(), raw_path);
                for (resource, generated) in synthesize(&endpoint, policy) {
                    if let Some(existing) = origins.insert(resource.clone(), origin.clone()) {
                        warn!(
                            "Resource name {} generated by {} replaces the one from {}",
                            resource, origin, existing
                        );
                        collisions.push(NameCollision {
                            name: resource.clone(),
                            existing,
                            replacement: origin.clone(),
                        });
                    }
                    resources.insert(resource, generated);
                }

                destinations.push(GeneratedDestination {
                    rule_name: rule_name(&name, &policy.rule_suffix),
                    name,
                    path: raw_path.clone(),
                    method: method.clone(),
                    trigger: trigger.to_string(),
                });
            }
        }

        let destination_names: Vec<String> = destinations.iter().map(|d| d.name.clone()).collect();
        if !resources.grant_invoke(&policy.role_name, &destination_names) {
            warn!(
                "Execution role {} was replaced by a generated resource; invoke permissions were not granted",
                policy.role_name
            );
        }

        let template = options
            .blueprint
            .clone()
            .unwrap_or_else(|| default_template(policy));
        let (template, replaced_blueprint_resources) =
            merge_into_template(template, resources.to_mapping()?)?;

        for name in &replaced_blueprint_resources {
            debug!("Generated resource {} replaces the blueprint resource of the same name", name);
        }

        info!(
            "Generated {} API destinations ({} operations skipped)",
            destinations.len(),
            skipped.len()
        );

        Ok(Compilation {
            template,
            base_url,
            destinations,
            skipped,
            collisions,
            unresolved_references,
            replaced_blueprint_resources,
        })
    }
}
