//! CLI command definitions.
//!
//! Both subcommands read the same API specification arguments; every argument
//! falls back to the `INPUT_*` environment variable a CI action would set.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use evgen_iac::{CompileOptions, GenerationPolicy, MethodSet, DEFAULT_HTTP_METHODS};
use evgen_spec::{ApiSpecification, DocumentReader};

pub mod generate;
pub mod validate;

/// evgen - OpenAPI to EventBridge template compiler
#[derive(Parser)]
#[command(name = "evgen")]
#[command(version, about = "evgen - OpenAPI to EventBridge template compiler")]
#[command(long_about = r#"
evgen reads an OpenAPI document and generates a CloudFormation template with
one EventBridge API destination and rule per selected operation.

COMMANDS:
  generate  → Compile the API spec and write the template
  validate  → Compile without writing and report problems

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  5 - IaC error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit log records as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a template from an API spec
    Generate(generate::GenerateArgs),

    /// Check an API spec without writing a template
    Validate(validate::ValidateArgs),
}

/// Arguments describing what to compile.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Path to the OpenAPI document (YAML or JSON)
    #[arg(short, long, env = "INPUT_SPECPATH")]
    pub spec: PathBuf,

    /// Prefix for every generated resource name
    #[arg(short, long, env = "INPUT_RESOURCEPREFIX", default_value = "")]
    pub prefix: String,

    /// Server description selecting the base URL (defaults to the first server)
    #[arg(short, long, env = "INPUT_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Comma-separated HTTP methods to generate destinations for
    #[arg(short, long, env = "INPUT_HTTPMETHODS", default_value = DEFAULT_HTTP_METHODS)]
    pub methods: String,

    /// TOML file overriding generation defaults
    #[arg(long, env = "INPUT_POLICY")]
    pub policy: Option<PathBuf>,
}

impl SourceArgs {
    pub fn load_spec(&self) -> Result<ApiSpecification> {
        DocumentReader::read_spec(&self.spec)
            .with_context(|| format!("Failed to read API spec {}", self.spec.display()))
    }

    pub fn compile_options(&self) -> Result<CompileOptions> {
        let policy = match &self.policy {
            Some(path) => GenerationPolicy::load(path)
                .with_context(|| format!("Failed to load policy {}", path.display()))?,
            None => GenerationPolicy::default(),
        };

        let mut options = CompileOptions::new()
            .with_methods(MethodSet::parse(&self.methods))
            .with_prefix(&self.prefix)
            .with_policy(policy);

        if let Some(environment) = self.environment.as_deref().filter(|e| !e.is_empty()) {
            options = options.with_environment(environment);
        }

        Ok(options)
    }
}

/// Validation found problems that do not stop generation.
#[derive(Error, Debug)]
#[error("Validation failed with {problems} problem(s)")]
pub struct ValidationFailed {
    pub problems: usize,
}
