//! # evgen_iac
//!
//! Compiles an OpenAPI document into a CloudFormation template that routes
//! EventBridge events to the API.
//!
//! For every accepted operation with an `operationId`, the compiler emits an
//! `AWS::Events::ApiDestination` calling the operation and an `AWS::Events::Rule`
//! matching events whose `detail-type` is the operation id. All rules share an
//! execution role, a dead-letter queue and an API-key connection.
//!
//! ## Features
//!
//! - Path parameters forwarded from `$.detail.<name>`
//! - Query parameters declared inline or through `components.parameters`
//! - Request bodies forwarded from `$.detail.message`
//! - Base URL selection per environment from the `servers` list
//! - Merging into a caller-supplied blueprint template
//!
//! ## Example
//!
//! ```rust,no_run
//! use evgen_iac::{CompileOptions, MethodSet, TemplateCompiler};
//! use evgen_spec::{DocumentReader, DocumentWriter};
//!
//! let spec = DocumentReader::read_spec("openapi.yaml").unwrap();
//! let options = CompileOptions::new()
//!     .with_methods(MethodSet::parse("PUT,POST,DELETE"))
//!     .with_prefix("CacheApi")
//!     .with_environment("Production");
//!
//! let compilation = TemplateCompiler::new(options).compile(&spec).unwrap();
//! DocumentWriter::write("template.yaml", &compilation.template).unwrap();
//! ```

pub mod compiler;
pub mod error;
pub mod merge;
pub mod naming;
pub mod parameters;
pub mod policy;
pub mod resources;
pub mod server;

pub use compiler::{
    Compilation, CompileOptions, GeneratedDestination, MethodSet, NameCollision, SkipReason,
    SkippedOperation, TemplateCompiler, UnresolvedReference, DEFAULT_HTTP_METHODS,
};
pub use error::{IacError, IacResult};
pub use merge::{default_template, merge_into_template, overlay_resources};
pub use naming::{resource_name, to_name_fragment, to_wildcard_path};
pub use parameters::{load_reusable_query_params, resolve_query_params, QueryParameters, ReusableQueryParam};
pub use policy::GenerationPolicy;
pub use resources::{GeneratedResource, ResourceSet};
pub use server::resolve_base_url;
