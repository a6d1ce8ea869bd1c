//! Generation policy: the fixed names and limits baked into every template.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IacError, IacResult};

/// CloudFormation template format version of the default template.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Invocation ceiling applied to every destination.
pub const DEFAULT_INVOCATION_RATE_LIMIT: u32 = 300;

/// Policy constants used while generating resources.
///
/// Every field has a default, so a TOML override file only needs the keys it
/// changes:
///
/// ```toml
/// invocation_rate_limit_per_second = 50
/// credential_parameter = "ServiceAuthToken"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationPolicy {
    pub invocation_rate_limit_per_second: u32,
    /// Shared execution role assumed by every rule target.
    pub role_name: String,
    pub dead_letter_queue_name: String,
    pub connection_name: String,
    /// Header carrying the API key.
    pub api_key_name: String,
    /// Template parameter holding the API key value.
    pub credential_parameter: String,
    /// Template parameter naming the event bus the rules attach to.
    pub event_bus_parameter: String,
    pub rule_suffix: String,
    pub template_description: String,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            invocation_rate_limit_per_second: DEFAULT_INVOCATION_RATE_LIMIT,
            role_name: "ApiDestinationsTargetRole".to_string(),
            dead_letter_queue_name: "FailedDeliveryDLQ".to_string(),
            connection_name: "ApiConnection".to_string(),
            api_key_name: "Authorization".to_string(),
            credential_parameter: "MomentoAuthToken".to_string(),
            event_bus_parameter: "EventBusName".to_string(),
            rule_suffix: "Rule".to_string(),
            template_description:
                "CloudFormation template that deploys EventBridge rules and API destinations for my API"
                    .to_string(),
        }
    }
}

impl GenerationPolicy {
    /// Parse and validate a policy from TOML.
    pub fn from_toml_str(content: &str) -> IacResult<Self> {
        let policy: GenerationPolicy = toml::from_str(content)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy override file.
    pub fn load(path: impl AsRef<Path>) -> IacResult<Self> {
        let path = path.as_ref();
        debug!("Loading generation policy from {:?}", path);
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.invocation_rate_limit_per_second = per_second;
        self
    }

    pub fn with_credential_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.credential_parameter = parameter.into();
        self
    }

    /// Names of the resources shared by every destination.
    pub fn shared_resource_names(&self) -> [&str; 3] {
        [
            self.role_name.as_str(),
            self.dead_letter_queue_name.as_str(),
            self.connection_name.as_str(),
        ]
    }

    /// Reject policies that would produce an invalid or self-conflicting template.
    pub fn validate(&self) -> IacResult<()> {
        if self.invocation_rate_limit_per_second == 0 {
            return Err(IacError::InvalidPolicy(
                "invocation_rate_limit_per_second must be at least 1".to_string(),
            ));
        }

        let required = [
            ("role_name", &self.role_name),
            ("dead_letter_queue_name", &self.dead_letter_queue_name),
            ("connection_name", &self.connection_name),
            ("api_key_name", &self.api_key_name),
            ("credential_parameter", &self.credential_parameter),
            ("event_bus_parameter", &self.event_bus_parameter),
            ("rule_suffix", &self.rule_suffix),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(IacError::InvalidPolicy(format!("{} cannot be empty", field)));
        }

        let mut seen = HashSet::new();
        for name in self.shared_resource_names() {
            if !seen.insert(name) {
                return Err(IacError::InvalidPolicy(format!(
                    "shared resource name '{}' is used more than once",
                    name
                )));
            }
        }

        Ok(())
    }
}
