//! Error types for JSON Structure parsing, resolution and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while building the schema document model.
///
/// Parse errors abort the pipeline before resolution; no partial document
/// is handed downstream.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("schema root must be a JSON object, got {actual}")]
    RootNotObject { actual: &'static str },

    #[error("missing required '{field}' at {path}")]
    MissingRequiredField { field: &'static str, path: String },

    #[error("invalid identifier \"{value}\" at {path}")]
    InvalidIdentifier { value: String, path: String },

    #[error("unknown type keyword \"{value}\" at {path}")]
    UnknownTypeKeyword { value: String, path: String },

    #[error("invalid schema construct at {path}: {message}")]
    InvalidNode { path: String, message: String },

    #[error("import keyword '{keyword}' at {path} requires allow_import")]
    ImportNotEnabled { keyword: String, path: String },

    #[error("failed to fetch import {uri} at {path}: {message}")]
    ImportFetchFailed {
        uri: String,
        path: String,
        message: String,
    },
}

/// Fatal errors while linking the type graph.
///
/// All resolution failures halt before schema or instance validation runs;
/// validating against an inconsistent graph would produce meaningless
/// diagnostics.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve $ref {pointer} at {path}")]
    UnresolvedRef { pointer: String, path: String },

    #[error("$ref {pointer} at {path} does not address a named type")]
    RefTargetNotNamedType { pointer: String, path: String },

    #[error("cyclic $extends chain: {}", cycle.join(" -> "))]
    CyclicInheritance { cycle: Vec<String> },

    #[error("abstract type '{name}' used directly as a value type at {path}")]
    AbstractTypeMisuse { name: String, path: String },

    #[error("add-in '{name}' is not offered by the schema's $offers")]
    UnknownAddIn { name: String },

    #[error("add-in '{name}' target {pointer} is not an abstract type")]
    AddInNotAbstract { name: String, pointer: String },

    #[error("add-in '{name}' target {pointer} has no $extends target to augment")]
    AddInMissingTarget { name: String, pointer: String },

    #[error("maximum nesting depth exceeded at {path}")]
    MaxDepthExceeded { path: String },
}

/// Top-level error for the validation pipeline, including document loading.
#[derive(Debug, Error)]
pub enum StructureError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Schema errors (exit code 2)
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("schema is invalid: {0} error(s) reported")]
    InvalidSchema(usize),
}

impl StructureError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StructureError::FileNotFound { .. } | StructureError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            StructureError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
