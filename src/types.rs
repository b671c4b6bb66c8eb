//! Core vocabulary for JSON Structure validation.
//!
//! Primitive type table, extension identifiers, keyword gating tables and
//! the lexical patterns shared by the document model and the validators.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum nesting depth for reference resolution and instance descent.
pub const MAX_DEPTH: usize = 64;

/// Identifier pattern for type and property names.
pub static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Identifier pattern when meta-schema keywords (`$`-prefixed names) are allowed.
pub static META_IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Map keys admit a wider charset than identifiers and may start with a digit.
pub static MAP_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:-]+$").unwrap());

/// Absolute URI: scheme followed by `://`.
pub static ABSOLUTE_URI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+\-.]*://").unwrap());

pub static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

pub static DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+\-]\d{2}:\d{2})$").unwrap()
});

pub static TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(?:\.\d+)?$").unwrap());

pub static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

pub static JSONPOINTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#(/[^/]+)*$").unwrap());

/// ISO 8601 duration. The pattern alone admits bare "P"/trailing "T";
/// callers must reject those separately.
pub static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(?:\d+Y)?(?:\d+M)?(?:\d+W)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?$")
        .unwrap()
});

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extended primitive types of JSON Structure Core.
///
/// `any` is not listed here; it is a distinct node kind since it bypasses
/// representation checks entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    String,
    Number,
    Boolean,
    Null,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int128,
    Uint128,
    Float8,
    Float,
    Double,
    Decimal,
    Date,
    Datetime,
    Time,
    Duration,
    Uuid,
    Uri,
    Binary,
    Jsonpointer,
}

impl Primitive {
    /// Parse a `type` keyword value. Returns `None` for unknown names
    /// (caller should error) and for compound type names.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "string" => Primitive::String,
            "number" => Primitive::Number,
            "boolean" => Primitive::Boolean,
            "null" => Primitive::Null,
            "int8" => Primitive::Int8,
            "uint8" => Primitive::Uint8,
            "int16" => Primitive::Int16,
            "uint16" => Primitive::Uint16,
            "int32" => Primitive::Int32,
            "uint32" => Primitive::Uint32,
            "int64" => Primitive::Int64,
            "uint64" => Primitive::Uint64,
            "int128" => Primitive::Int128,
            "uint128" => Primitive::Uint128,
            "float8" => Primitive::Float8,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "decimal" => Primitive::Decimal,
            "date" => Primitive::Date,
            "datetime" => Primitive::Datetime,
            "time" => Primitive::Time,
            "duration" => Primitive::Duration,
            "uuid" => Primitive::Uuid,
            "uri" => Primitive::Uri,
            "binary" => Primitive::Binary,
            "jsonpointer" => Primitive::Jsonpointer,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Null => "null",
            Primitive::Int8 => "int8",
            Primitive::Uint8 => "uint8",
            Primitive::Int16 => "int16",
            Primitive::Uint16 => "uint16",
            Primitive::Int32 => "int32",
            Primitive::Uint32 => "uint32",
            Primitive::Int64 => "int64",
            Primitive::Uint64 => "uint64",
            Primitive::Int128 => "int128",
            Primitive::Uint128 => "uint128",
            Primitive::Float8 => "float8",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Decimal => "decimal",
            Primitive::Date => "date",
            Primitive::Datetime => "datetime",
            Primitive::Time => "time",
            Primitive::Duration => "duration",
            Primitive::Uuid => "uuid",
            Primitive::Uri => "uri",
            Primitive::Binary => "binary",
            Primitive::Jsonpointer => "jsonpointer",
        }
    }
}

/// Compound type names, used for diagnostics about misplaced keywords.
pub const COMPOUND_TYPES: &[&str] = &["object", "array", "set", "map", "tuple", "choice"];

/// Companion extension features the core recognizes as capability flags.
///
/// The core gates keyword legality on these; it never implements their
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "JSONStructureAlternateNames")]
    AlternateNames,
    #[serde(rename = "JSONStructureUnits")]
    Units,
    #[serde(rename = "JSONStructureImports")]
    Imports,
    #[serde(rename = "JSONStructureValidation")]
    Validation,
    #[serde(rename = "JSONStructureConditionalComposition")]
    ConditionalComposition,
}

impl Feature {
    /// Parse a `$uses` identifier. Returns `None` for names that are not
    /// known features (they may still be add-in names).
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "JSONStructureAlternateNames" => Feature::AlternateNames,
            "JSONStructureUnits" => Feature::Units,
            "JSONStructureImports" => Feature::Imports,
            "JSONStructureValidation" => Feature::Validation,
            "JSONStructureConditionalComposition" => Feature::ConditionalComposition,
            _ => return None,
        })
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Feature::AlternateNames => "JSONStructureAlternateNames",
            Feature::Units => "JSONStructureUnits",
            Feature::Imports => "JSONStructureImports",
            Feature::Validation => "JSONStructureValidation",
            Feature::ConditionalComposition => "JSONStructureConditionalComposition",
        }
    }

    /// The feature a schema keyword is gated behind, if any.
    pub fn gating(keyword: &str) -> Option<Feature> {
        match keyword {
            "altnames" => Some(Feature::AlternateNames),
            "unit" | "currency" => Some(Feature::Units),
            "$import" | "$importdefs" => Some(Feature::Imports),
            "allOf" | "anyOf" | "oneOf" | "not" | "if" | "then" | "else" => {
                Some(Feature::ConditionalComposition)
            }
            "minimum" | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" | "multipleOf"
            | "minLength" | "pattern" | "format" | "minItems" | "maxItems" | "uniqueItems"
            | "contains" | "minContains" | "maxContains" | "minProperties" | "maxProperties"
            | "minEntries" | "maxEntries" | "dependentRequired" | "patternProperties"
            | "patternKeys" | "propertyNames" | "keyNames" | "has" | "default" => {
                Some(Feature::Validation)
            }
            _ => None,
        }
    }
}

/// An ordered activation set: feature identifiers and add-in names from
/// `$uses` (or a caller-supplied fixed list).
///
/// Order matters for add-in application; duplicates are dropped on insert.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    names: Vec<String>,
}

impl Activation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut activation = Self::new();
        for name in names {
            activation.insert(name.into());
        }
        activation
    }

    pub fn insert(&mut self, name: String) {
        if !self.names.iter().any(|n| *n == name) {
            self.names.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.contains(feature.identifier())
    }

    /// Activated names that are not known feature identifiers, in
    /// activation order. These are candidate add-in names.
    pub fn addin_names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(|n| Feature::parse(n).is_none())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
