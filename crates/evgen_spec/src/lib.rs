//! # evgen_spec
//!
//! OpenAPI document model and document I/O for evgen.
//!
//! This crate reads the API description that drives template generation and
//! writes the generated template back out. It deliberately models only the
//! routing-relevant parts of an OpenAPI document:
//!
//! - **Servers**: candidate base URLs, labelled by environment
//! - **Paths**: URL templates with their operations, in declaration order
//! - **Parameters**: inline or `$ref` parameters, plus reusable definitions
//!
//! ## Example
//!
//! ```rust,no_run
//! use evgen_spec::{DocumentReader, DocumentWriter};
//!
//! let spec = DocumentReader::read_spec("openapi.yaml").unwrap();
//! for (path, item) in &spec.paths {
//!     println!("{} has {} operations", path, item.operations.len());
//! }
//!
//! let blueprint = DocumentReader::read_document("blueprint.yaml").unwrap();
//! DocumentWriter::write("template.yaml", &blueprint).unwrap();
//! ```

pub mod error;
pub mod models;
pub mod reader;
pub mod writer;

pub use error::{SpecError, SpecResult};
pub use models::*;
pub use reader::DocumentReader;
pub use writer::{DocumentFormat, DocumentWriter};
