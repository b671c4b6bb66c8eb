//! High-level validation pipeline: imports, parse, resolve, check.
//!
//! These entry points wire the stages together the way the CLI uses them;
//! library callers can also drive the individual modules directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::checker;
use crate::diagnostics::{has_errors, Diagnostic};
use crate::document::{self, SchemaDocument};
use crate::error::StructureError;
use crate::imports::{self, ImportOptions};
use crate::instance;
use crate::loader;
use crate::resolver::{self, ResolvedGraph};
use crate::types::Activation;

/// Options for the validation pipeline.
///
/// Built in fluent style:
///
/// ```
/// use json_structure::ValidatorOptions;
///
/// let options = ValidatorOptions::new()
///     .activate("JSONStructureValidation")
///     .allow_import(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// Admit `$`-prefixed identifiers, for validating meta-schemas.
    pub allow_meta_keywords: bool,
    /// Names activated by the caller in addition to the document's `$uses`.
    pub activated: Vec<String>,
    /// Permit `$import`/`$importdefs` processing.
    pub allow_import: bool,
    /// URI to local file redirections for imports.
    pub import_map: HashMap<String, PathBuf>,
}

impl ValidatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metaschema(mut self, allow: bool) -> Self {
        self.allow_meta_keywords = allow;
        self
    }

    pub fn activate(mut self, name: impl Into<String>) -> Self {
        self.activated.push(name.into());
        self
    }

    pub fn allow_import(mut self, allow: bool) -> Self {
        self.allow_import = allow;
        self
    }

    pub fn map_uri(mut self, uri: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.import_map.insert(uri.into(), file.into());
        self
    }

    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            allow_import: self.allow_import,
            import_map: self.import_map.clone(),
        }
    }

    fn activation(&self, doc: &SchemaDocument) -> Activation {
        let mut activation = Activation::from_names(self.activated.iter().cloned());
        for name in &doc.uses {
            activation.insert(name.clone());
        }
        activation
    }
}

/// A schema taken through the full pipeline, ready for instance validation.
pub struct CompiledSchema {
    pub document: SchemaDocument,
    pub graph: ResolvedGraph,
    pub diagnostics: Vec<Diagnostic>,
    activation: Activation,
}

/// Run imports, parsing, resolution and schema checks on a raw document.
///
/// Fatal problems (malformed JSON shape, unresolvable references, cycles)
/// come back as `Err`; rule violations accumulate in `diagnostics`.
pub fn compile_schema(
    raw: &Value,
    options: &ValidatorOptions,
) -> Result<CompiledSchema, StructureError> {
    let mut value = raw.clone();
    imports::process_imports(&mut value, &options.import_options())?;

    let document = document::parse(&value, options.allow_meta_keywords)?;
    let activation = options.activation(&document);
    let graph = resolver::resolve(&document, &activation)?;
    let diagnostics = checker::check(&document, &graph, &activation);

    Ok(CompiledSchema {
        document,
        graph,
        diagnostics,
        activation,
    })
}

/// Validate a schema document, returning its diagnostics.
pub fn validate_schema(
    raw: &Value,
    options: &ValidatorOptions,
) -> Result<Vec<Diagnostic>, StructureError> {
    Ok(compile_schema(raw, options)?.diagnostics)
}

/// Validate an instance against a schema document.
///
/// The schema must check out first: schema-level error diagnostics abort
/// with `StructureError::InvalidSchema`. An instance may activate add-ins
/// with a root-level `$uses` array, which triggers re-resolution before
/// validation.
pub fn validate_instance(
    instance: &Value,
    schema: &Value,
    options: &ValidatorOptions,
) -> Result<Vec<Diagnostic>, StructureError> {
    let compiled = compile_schema(schema, options)?;
    if has_errors(&compiled.diagnostics) {
        let count = compiled
            .diagnostics
            .iter()
            .filter(|d| d.severity == crate::diagnostics::Severity::Error)
            .count();
        return Err(StructureError::InvalidSchema(count));
    }

    let (body, graph) = match instance_uses(instance) {
        Some((stripped, uses)) => {
            let mut activation = compiled.activation.clone();
            for name in uses {
                activation.insert(name);
            }
            let graph = resolver::resolve(&compiled.document, &activation)?;
            (stripped, graph)
        }
        None => (instance.clone(), compiled.graph),
    };

    Ok(instance::validate(&body, &graph))
}

/// Split off a root-level `$uses` activation list, if the instance has one.
fn instance_uses(instance: &Value) -> Option<(Value, Vec<String>)> {
    let map = instance.as_object()?;
    let uses = map.get("$uses")?.as_array()?;
    let names: Vec<String> = uses
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    let mut stripped = map.clone();
    stripped.remove("$uses");
    Some((Value::Object(stripped), names))
}

/// Validate a schema file.
pub fn validate_schema_file(
    path: &Path,
    options: &ValidatorOptions,
) -> Result<Vec<Diagnostic>, StructureError> {
    let raw = loader::load_json(path)?;
    validate_schema(&raw, options)
}

/// Validate an instance file against a schema file.
pub fn validate_instance_file(
    instance_path: &Path,
    schema_path: &Path,
    options: &ValidatorOptions,
) -> Result<Vec<Diagnostic>, StructureError> {
    let instance = loader::load_json(instance_path)?;
    let schema = loader::load_json(schema_path)?;
    validate_instance(&instance, &schema, options)
}
