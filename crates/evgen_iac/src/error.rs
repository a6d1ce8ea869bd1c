//! Error types for template compilation.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while compiling a template.
///
/// Every variant is fatal: compilation stops before any template is produced.
/// Operations without an `operationId` and unresolved parameter references are
/// not errors; they are reported on [`crate::Compilation`] instead.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("An environment with the name '{0}' does not exist in the servers object of the API spec")]
    EnvironmentNotFound(String),

    #[error("The API spec does not contain any valid servers; add one or more or provide the environment name")]
    NoServersDefined,

    #[error("Invalid blueprint template: {0}")]
    InvalidBlueprint(String),

    #[error("Invalid generation policy: {0}")]
    InvalidPolicy(String),

    #[error("Spec error: {0}")]
    Spec(#[from] evgen_spec::SpecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
