//! JSON Structure schema validation.
//!
//! This library parses JSON Structure schema documents, links their type
//! graphs ($ref, $extends inheritance, add-ins), validates the schemas
//! themselves, and validates JSON instances against them.
//!
//! # Example
//!
//! ```
//! use json_structure::{validate_instance, ValidatorOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "$schema": "https://json-structure.org/meta/core/v0/#",
//!     "$id": "https://example.com/person.json",
//!     "name": "Person",
//!     "type": "object",
//!     "properties": {
//!         "firstName": { "type": "string" },
//!         "lastName": { "type": "string" }
//!     },
//!     "required": ["firstName", "lastName"]
//! });
//!
//! let instance = json!({ "firstName": "Ada" });
//! let diagnostics =
//!     validate_instance(&instance, &schema, &ValidatorOptions::new()).unwrap();
//!
//! // The missing lastName is reported with a JSON pointer into the instance.
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].path, "/lastName");
//! ```
//!
//! # Pipeline
//!
//! | Stage | Failure mode |
//! |-------|--------------|
//! | import expansion | fatal `ParseError` |
//! | document parsing | fatal `ParseError` |
//! | reference resolution | fatal `ResolveError` |
//! | schema checks | accumulated `Diagnostic`s |
//! | instance validation | accumulated `Diagnostic`s |
//!
//! Companion extension features (`JSONStructureValidation` and friends)
//! gate keyword legality only; their semantics are out of scope here.

mod checker;
mod diagnostics;
mod document;
mod error;
mod imports;
mod instance;
mod linter;
mod loader;
mod resolver;
mod types;
mod validate;

pub use diagnostics::{has_errors, Diagnostic, DiagnosticKind, Severity};
pub use document::{
    parse, AdditionalProperties, Namespace, NamespaceEntry, NodeKind, SchemaDocument, SchemaNode,
    UnionMember,
};
pub use error::{ParseError, ResolveError, StructureError};
pub use imports::{process_imports, ImportOptions};
pub use instance::validate as validate_instance_against_graph;
pub use linter::{lint, lint_file, FileResult, FileStatus, LintResult};
pub use loader::{is_url, load_json, load_json_str};
pub use resolver::{
    resolve, ChoiceShape, PropertyDef, PropertyOrigin, ResolvedAdditional, ResolvedGraph,
    ResolvedKind, ResolvedType, TypeRef,
};
pub use types::{Activation, Feature, Primitive, MAX_DEPTH};
pub use validate::{
    compile_schema, validate_instance, validate_instance_file, validate_schema,
    validate_schema_file, CompiledSchema, ValidatorOptions,
};

#[cfg(feature = "remote")]
pub use loader::load_json_url;

pub use checker::check as check_schema;
