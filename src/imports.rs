//! `$import` / `$importdefs` preprocessing.
//!
//! Imports are expanded on the raw JSON document before the document model
//! is built, so the rest of the pipeline never sees import keywords. Each
//! import names an absolute URI; an import map can redirect URIs to local
//! files, and anything not mapped is fetched over HTTP when the `remote`
//! feature is enabled.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::{ParseError, StructureError};
use crate::loader;
use crate::types::ABSOLUTE_URI_REGEX;

/// Keywords that describe the importing document itself and must not leak
/// into the importing namespace when a root type is imported.
const DOCUMENT_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "$root",
    "$offers",
    "$uses",
    "definitions",
    "$import",
    "$importdefs",
];

/// Nested imports deeper than this indicate a cycle between documents.
const MAX_IMPORT_DEPTH: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Whether `$import`/`$importdefs` are permitted at all.
    pub allow_import: bool,
    /// URI to local file redirections, consulted before any network fetch.
    pub import_map: HashMap<String, PathBuf>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_import(mut self, allow: bool) -> Self {
        self.allow_import = allow;
        self
    }

    pub fn map_uri(mut self, uri: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.import_map.insert(uri.into(), file.into());
        self
    }
}

/// Expand all imports in `doc` in place.
///
/// At the document root, imported types land in `definitions`; inside a
/// namespace object they land in that namespace. Names already declared
/// locally are never overwritten, so local declarations silently shadow
/// imports.
pub fn process_imports(doc: &mut Value, options: &ImportOptions) -> Result<(), StructureError> {
    let Some(root) = doc.as_object_mut() else {
        // Not an object; the document parser reports this properly.
        return Ok(());
    };

    if root.contains_key("$import") || root.contains_key("$importdefs") {
        let mut imported = Map::new();
        expand_scope_imports(root, "", options, 0, &mut imported)?;
        if !imported.is_empty() {
            let definitions = root
                .entry("definitions")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(definitions) = definitions.as_object_mut() {
                merge_preserving_local(definitions, imported);
            }
        }
    }

    if let Some(Value::Object(definitions)) = root.get_mut("definitions") {
        process_namespace(definitions, "/definitions", options, 0)?;
    }
    Ok(())
}

fn process_namespace(
    scope: &mut Map<String, Value>,
    path: &str,
    options: &ImportOptions,
    depth: usize,
) -> Result<(), StructureError> {
    if scope.contains_key("$import") || scope.contains_key("$importdefs") {
        let mut imported = Map::new();
        expand_scope_imports(scope, path, options, depth, &mut imported)?;
        merge_preserving_local(scope, imported);
    }

    // Nested namespaces are object entries without a type declaration.
    for (key, value) in scope.iter_mut() {
        if let Value::Object(entry) = value {
            if !entry.contains_key("type") && !entry.contains_key("$ref") {
                process_namespace(entry, &format!("{}/{}", path, key), options, depth)?;
            }
        }
    }
    Ok(())
}

/// Resolve the import keywords found directly on `scope`, collecting the
/// imported declarations into `imported` and removing the keywords.
fn expand_scope_imports(
    scope: &mut Map<String, Value>,
    path: &str,
    options: &ImportOptions,
    depth: usize,
    imported: &mut Map<String, Value>,
) -> Result<(), StructureError> {
    for keyword in ["$import", "$importdefs"] {
        let Some(uri_value) = scope.remove(keyword) else {
            continue;
        };
        if !options.allow_import {
            return Err(ParseError::ImportNotEnabled {
                keyword: keyword.to_string(),
                path: path.to_string(),
            }
            .into());
        }
        let uri = uri_value
            .as_str()
            .ok_or_else(|| ParseError::InvalidNode {
                path: format!("{}/{}", path, keyword),
                message: format!("'{}' must be a URI string", keyword),
            })?;
        if !ABSOLUTE_URI_REGEX.is_match(uri) {
            return Err(ParseError::InvalidNode {
                path: format!("{}/{}", path, keyword),
                message: format!("'{}' requires an absolute URI, got \"{}\"", keyword, uri),
            }
            .into());
        }

        let mut fetched = fetch_schema(uri, path, options)?;

        // The fetched document may import in turn.
        if let Some(fetched_root) = fetched.as_object_mut() {
            if depth >= MAX_IMPORT_DEPTH {
                return Err(ParseError::ImportFetchFailed {
                    uri: uri.to_string(),
                    path: path.to_string(),
                    message: "import nesting exceeds maximum depth".into(),
                }
                .into());
            }
            let mut nested = Map::new();
            expand_scope_imports(fetched_root, path, options, depth + 1, &mut nested)?;
            if !nested.is_empty() {
                let definitions = fetched_root
                    .entry("definitions")
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Some(definitions) = definitions.as_object_mut() {
                    merge_preserving_local(definitions, nested);
                }
            }
        }

        let Some(fetched_root) = fetched.as_object() else {
            return Err(ParseError::ImportFetchFailed {
                uri: uri.to_string(),
                path: path.to_string(),
                message: "imported document is not a JSON object".into(),
            }
            .into());
        };

        if let Some(Value::Object(definitions)) = fetched_root.get("definitions") {
            for (name, value) in definitions {
                imported.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }

        // `$import` additionally brings in the document's root type.
        if keyword == "$import" {
            if let (Some(_), Some(Value::String(name))) =
                (fetched_root.get("type"), fetched_root.get("name"))
            {
                let mut root_type = fetched_root.clone();
                for doc_keyword in DOCUMENT_KEYWORDS {
                    root_type.remove(*doc_keyword);
                }
                imported
                    .entry(name.clone())
                    .or_insert_with(|| Value::Object(root_type));
            }
        }
    }
    Ok(())
}

fn fetch_schema(uri: &str, path: &str, options: &ImportOptions) -> Result<Value, StructureError> {
    if let Some(file) = options.import_map.get(uri) {
        return loader::load_json(file);
    }

    #[cfg(feature = "remote")]
    {
        if loader::is_url(uri) {
            return loader::load_json_url(uri);
        }
    }

    Err(ParseError::ImportFetchFailed {
        uri: uri.to_string(),
        path: path.to_string(),
        message: "URI is not in the import map and cannot be fetched".into(),
    }
    .into())
}

fn merge_preserving_local(target: &mut Map<String, Value>, imported: Map<String, Value>) {
    for (name, value) in imported {
        target.entry(name).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_schema(value: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(value).unwrap()).unwrap();
        file
    }

    #[test]
    fn import_requires_enablement() {
        let mut doc = json!({
            "$import": "https://example.com/people.json",
            "definitions": {}
        });
        let err = process_imports(&mut doc, &ImportOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            StructureError::Parse(ParseError::ImportNotEnabled { .. })
        ));
    }

    #[test]
    fn import_merges_definitions_and_root_type() {
        let file = write_schema(&json!({
            "$schema": "https://json-structure.org/meta/core/v0/#",
            "$id": "https://example.com/people.json",
            "name": "Person",
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "definitions": {
                "Address": {
                    "name": "Address",
                    "type": "object",
                    "properties": { "street": { "type": "string" } }
                }
            }
        }));
        let options = ImportOptions::new()
            .allow_import(true)
            .map_uri("https://example.com/people.json", file.path());

        let mut doc = json!({
            "$import": "https://example.com/people.json"
        });
        process_imports(&mut doc, &options).unwrap();

        let defs = doc["definitions"].as_object().unwrap();
        assert!(defs.contains_key("Person"));
        assert!(defs.contains_key("Address"));
        // Document-level keywords are stripped from the imported root type.
        assert!(defs["Person"].get("$id").is_none());
        assert!(doc.get("$import").is_none());
    }

    #[test]
    fn importdefs_skips_root_type() {
        let file = write_schema(&json!({
            "name": "Person",
            "type": "object",
            "properties": {},
            "definitions": {
                "Address": { "name": "Address", "type": "object", "properties": {} }
            }
        }));
        let options = ImportOptions::new()
            .allow_import(true)
            .map_uri("https://example.com/people.json", file.path());

        let mut doc = json!({
            "$importdefs": "https://example.com/people.json"
        });
        process_imports(&mut doc, &options).unwrap();

        let defs = doc["definitions"].as_object().unwrap();
        assert!(defs.contains_key("Address"));
        assert!(!defs.contains_key("Person"));
    }

    #[test]
    fn local_declarations_shadow_imports() {
        let file = write_schema(&json!({
            "definitions": {
                "Address": {
                    "name": "Address",
                    "type": "object",
                    "properties": { "imported": { "type": "string" } }
                }
            }
        }));
        let options = ImportOptions::new()
            .allow_import(true)
            .map_uri("https://example.com/defs.json", file.path());

        let mut doc = json!({
            "$importdefs": "https://example.com/defs.json",
            "definitions": {
                "Address": {
                    "name": "Address",
                    "type": "object",
                    "properties": { "local": { "type": "string" } }
                }
            }
        });
        process_imports(&mut doc, &options).unwrap();

        let address = &doc["definitions"]["Address"];
        assert!(address["properties"].get("local").is_some());
        assert!(address["properties"].get("imported").is_none());
    }

    #[test]
    fn namespace_scoped_import() {
        let file = write_schema(&json!({
            "definitions": {
                "Country": { "name": "Country", "type": "string" }
            }
        }));
        let options = ImportOptions::new()
            .allow_import(true)
            .map_uri("https://example.com/geo.json", file.path());

        let mut doc = json!({
            "definitions": {
                "Geo": {
                    "$importdefs": "https://example.com/geo.json"
                }
            }
        });
        process_imports(&mut doc, &options).unwrap();
        assert!(doc["definitions"]["Geo"].get("Country").is_some());
    }

    #[test]
    fn relative_uri_rejected() {
        let mut doc = json!({ "$import": "schemas/people.json" });
        let options = ImportOptions::new().allow_import(true);
        let err = process_imports(&mut doc, &options).unwrap_err();
        assert!(matches!(
            err,
            StructureError::Parse(ParseError::InvalidNode { .. })
        ));
    }

    #[test]
    fn unmapped_uri_fails_without_network() {
        let mut doc = json!({ "$import": "unknown-scheme://example.com/x.json" });
        let options = ImportOptions::new().allow_import(true);
        let err = process_imports(&mut doc, &options).unwrap_err();
        assert!(matches!(
            err,
            StructureError::Parse(ParseError::ImportFetchFailed { .. })
        ));
    }
}
