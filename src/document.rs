//! Schema document model - parses raw JSON into a typed, immutable
//! representation of a JSON Structure document.
//!
//! Parsing enforces the core syntax rules (strict `type` declaration,
//! required `name` on named positions, identifier patterns) and preserves
//! declaration order. It does not resolve references; that is the
//! resolver's job.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{json_type_name, Feature, Primitive, IDENTIFIER_REGEX, META_IDENTIFIER_REGEX};

/// Keywords consumed by the document model itself. Everything else is
/// either a feature-gated extension keyword (collected for legality
/// checking) or ignored, matching the original validator's tolerance for
/// unknown annotations.
const CORE_KEYWORDS: &[&str] = &[
    "type",
    "$ref",
    "name",
    "abstract",
    "$extends",
    "properties",
    "required",
    "additionalProperties",
    "items",
    "values",
    "choices",
    "selector",
    "tuple",
    "enum",
    "const",
    "description",
    "examples",
    "maxLength",
    "precision",
    "scale",
    "$schema",
    "$id",
    "$root",
    "$uses",
    "$offers",
    "definitions",
];

/// A parsed schema document: root type, namespace tree, add-in offers.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// `$schema` meta-schema URI, if declared.
    pub schema_uri: Option<String>,
    /// `$id` document URI, if declared.
    pub id: Option<String>,
    /// Root type declared with `type` at the document root.
    pub root: Option<SchemaNode>,
    /// `$root` pointer selecting a definition as the root type.
    pub root_ref: Option<String>,
    /// The `definitions` namespace tree.
    pub definitions: Namespace,
    /// `$offers`: add-in name to list of JSON pointers at abstract types.
    pub offers: IndexMap<String, Vec<String>>,
    /// Document-level `$uses` activation list.
    pub uses: Vec<String>,
}

/// A scope owning a mapping from local name to type or nested namespace.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    entries: IndexMap<String, NamespaceEntry>,
}

#[derive(Debug, Clone)]
pub enum NamespaceEntry {
    Type(SchemaNode),
    Namespace(Namespace),
}

impl Namespace {
    pub fn get(&self, name: &str) -> Option<&NamespaceEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NamespaceEntry)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A single (possibly inline) type declaration.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub name: Option<String>,
    pub is_abstract: bool,
    /// `$extends` base-type pointers, in declaration order.
    pub extends: Vec<String>,
    pub kind: NodeKind,
    /// `required` keyword as written; legality is checked later.
    pub required: Option<Vec<String>>,
    pub additional: Option<AdditionalProperties>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub description: Option<String>,
    /// Feature-gated keywords found on this node, kept raw for the
    /// schema validator's activation-legality check.
    pub extensions: IndexMap<String, Value>,
}

/// The structural shape of a schema node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// `$ref` to a named type in the same document.
    Ref(String),
    Primitive(Primitive),
    /// `any`: matches every instance.
    Any,
    /// `type: [...]` union of primitives and references.
    Union(Vec<UnionMember>),
    Object {
        properties: IndexMap<String, SchemaNode>,
    },
    Array {
        items: Box<SchemaNode>,
    },
    Set {
        items: Box<SchemaNode>,
    },
    Map {
        values: Box<SchemaNode>,
    },
    Tuple {
        properties: IndexMap<String, SchemaNode>,
        order: Vec<String>,
    },
    Choice {
        choices: IndexMap<String, SchemaNode>,
        selector: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub enum UnionMember {
    Primitive(Primitive),
    Ref(String),
}

#[derive(Debug, Clone)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

impl NodeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Ref(_) => "$ref",
            NodeKind::Primitive(p) => p.as_str(),
            NodeKind::Any => "any",
            NodeKind::Union(_) => "union",
            NodeKind::Object { .. } => "object",
            NodeKind::Array { .. } => "array",
            NodeKind::Set { .. } => "set",
            NodeKind::Map { .. } => "map",
            NodeKind::Tuple { .. } => "tuple",
            NodeKind::Choice { .. } => "choice",
        }
    }
}

/// Parse a raw JSON value into a schema document.
///
/// `allow_meta_keywords` admits `$`-prefixed identifiers in names and
/// property keys, as meta-schema documents require.
///
/// # Errors
///
/// All parse failures are fatal; resolution never sees a partial document.
pub fn parse(value: &Value, allow_meta_keywords: bool) -> Result<SchemaDocument, ParseError> {
    let root_map = value.as_object().ok_or(ParseError::RootNotObject {
        actual: json_type_name(value),
    })?;

    if root_map.contains_key("type") && root_map.contains_key("$root") {
        return Err(ParseError::InvalidNode {
            path: "".into(),
            message: "document cannot declare both a root 'type' and '$root'".into(),
        });
    }

    let parser = Parser {
        allow_meta_keywords,
    };

    let schema_uri = optional_string(root_map, "$schema", "")?;
    let id = optional_string(root_map, "$id", "")?;
    let root_ref = optional_string(root_map, "$root", "")?;

    let root = if root_map.contains_key("type") {
        let node = parser.parse_node(root_map, "", true)?;
        Some(node)
    } else {
        None
    };

    let definitions = match root_map.get("definitions") {
        None => Namespace::default(),
        Some(Value::Object(defs)) => parser.parse_namespace(defs, "/definitions")?,
        Some(other) => {
            return Err(ParseError::InvalidNode {
                path: "/definitions".into(),
                message: format!("definitions must be an object, got {}", json_type_name(other)),
            })
        }
    };

    let offers = parse_offers(root_map.get("$offers"))?;
    let uses = parse_uses(root_map.get("$uses"))?;

    Ok(SchemaDocument {
        schema_uri,
        id,
        root,
        root_ref,
        definitions,
        offers,
        uses,
    })
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, ParseError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ParseError::InvalidNode {
            path: format!("{}/{}", path, key),
            message: format!("'{}' must be a string, got {}", key, json_type_name(other)),
        }),
    }
}

fn parse_offers(value: Option<&Value>) -> Result<IndexMap<String, Vec<String>>, ParseError> {
    let mut offers = IndexMap::new();
    let Some(value) = value else {
        return Ok(offers);
    };
    let map = value.as_object().ok_or_else(|| ParseError::InvalidNode {
        path: "/$offers".into(),
        message: format!("$offers must be an object, got {}", json_type_name(value)),
    })?;
    for (name, entry) in map {
        let pointers = match entry {
            Value::String(ptr) => vec![ptr.clone()],
            Value::Array(items) => {
                let mut pointers = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let ptr = item.as_str().ok_or_else(|| ParseError::InvalidNode {
                        path: format!("/$offers/{}/{}", name, idx),
                        message: "offer entries must be JSON pointer strings".into(),
                    })?;
                    pointers.push(ptr.to_string());
                }
                pointers
            }
            other => {
                return Err(ParseError::InvalidNode {
                    path: format!("/$offers/{}", name),
                    message: format!(
                        "offer must be a pointer or array of pointers, got {}",
                        json_type_name(other)
                    ),
                })
            }
        };
        offers.insert(name.clone(), pointers);
    }
    Ok(offers)
}

fn parse_uses(value: Option<&Value>) -> Result<Vec<String>, ParseError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value.as_array().ok_or_else(|| ParseError::InvalidNode {
        path: "/$uses".into(),
        message: format!("$uses must be an array, got {}", json_type_name(value)),
    })?;
    let mut uses = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let name = item.as_str().ok_or_else(|| ParseError::InvalidNode {
            path: format!("/$uses/{}", idx),
            message: "$uses entries must be strings".into(),
        })?;
        uses.push(name.to_string());
    }
    Ok(uses)
}

struct Parser {
    allow_meta_keywords: bool,
}

impl Parser {
    fn identifier_ok(&self, name: &str) -> bool {
        if self.allow_meta_keywords {
            META_IDENTIFIER_REGEX.is_match(name)
        } else {
            IDENTIFIER_REGEX.is_match(name)
        }
    }

    fn parse_namespace(
        &self,
        map: &Map<String, Value>,
        path: &str,
    ) -> Result<Namespace, ParseError> {
        let mut entries = IndexMap::new();
        for (key, value) in map {
            let entry_path = format!("{}/{}", path, key);
            if !self.identifier_ok(key) {
                return Err(ParseError::InvalidIdentifier {
                    value: key.clone(),
                    path: entry_path,
                });
            }
            let obj = value.as_object().ok_or_else(|| ParseError::InvalidNode {
                path: entry_path.clone(),
                message: format!(
                    "definition entry must be a type or namespace object, got {}",
                    json_type_name(value)
                ),
            })?;
            let entry = if obj.contains_key("type") || obj.contains_key("$ref") {
                NamespaceEntry::Type(self.parse_node(obj, &entry_path, true)?)
            } else {
                NamespaceEntry::Namespace(self.parse_namespace(obj, &entry_path)?)
            };
            entries.insert(key.clone(), entry);
        }
        Ok(Namespace { entries })
    }

    /// Parse one schema node. `named_position` is true for the document
    /// root and definitions-table entries, where `name` is mandatory.
    fn parse_node(
        &self,
        map: &Map<String, Value>,
        path: &str,
        named_position: bool,
    ) -> Result<SchemaNode, ParseError> {
        let has_type = map.contains_key("type");
        let has_ref = map.contains_key("$ref");
        if has_type && has_ref {
            return Err(ParseError::InvalidNode {
                path: path.into(),
                message: "cannot declare both 'type' and '$ref'".into(),
            });
        }
        if !has_type && !has_ref {
            return Err(ParseError::MissingRequiredField {
                field: "type",
                path: path.into(),
            });
        }

        let name = optional_string(map, "name", path)?;
        if let Some(name) = &name {
            if !self.identifier_ok(name) {
                return Err(ParseError::InvalidIdentifier {
                    value: name.clone(),
                    path: format!("{}/name", path),
                });
            }
        }

        let is_abstract = match map.get("abstract") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(ParseError::InvalidNode {
                    path: format!("{}/abstract", path),
                    message: format!("'abstract' must be a boolean, got {}", json_type_name(other)),
                })
            }
        };

        let extends = self.parse_extends(map, path)?;

        let kind = if has_ref {
            let pointer = map
                .get("$ref")
                .and_then(Value::as_str)
                .ok_or_else(|| ParseError::InvalidNode {
                    path: format!("{}/$ref", path),
                    message: "'$ref' must be a JSON pointer string".into(),
                })?;
            NodeKind::Ref(pointer.to_string())
        } else {
            self.parse_type(map, path)?
        };

        // Tuples always carry a name; other inline nodes only in named positions.
        let name_mandatory = named_position || matches!(kind, NodeKind::Tuple { .. });
        if name_mandatory && name.is_none() {
            return Err(ParseError::MissingRequiredField {
                field: "name",
                path: path.into(),
            });
        }

        let required = match map.get("required") {
            None => None,
            Some(Value::Array(items)) => {
                let mut required = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let prop = item.as_str().ok_or_else(|| ParseError::InvalidNode {
                        path: format!("{}/required/{}", path, idx),
                        message: "'required' entries must be property names".into(),
                    })?;
                    required.push(prop.to_string());
                }
                Some(required)
            }
            Some(other) => {
                return Err(ParseError::InvalidNode {
                    path: format!("{}/required", path),
                    message: format!("'required' must be an array, got {}", json_type_name(other)),
                })
            }
        };

        let additional = match map.get("additionalProperties") {
            None => None,
            Some(Value::Bool(b)) => Some(AdditionalProperties::Allowed(*b)),
            Some(Value::Object(obj)) => Some(AdditionalProperties::Schema(Box::new(
                self.parse_node(obj, &format!("{}/additionalProperties", path), false)?,
            ))),
            Some(other) => {
                return Err(ParseError::InvalidNode {
                    path: format!("{}/additionalProperties", path),
                    message: format!(
                        "'additionalProperties' must be a boolean or schema, got {}",
                        json_type_name(other)
                    ),
                })
            }
        };

        let enum_values = match map.get("enum") {
            None => None,
            Some(Value::Array(items)) => Some(items.clone()),
            Some(other) => {
                return Err(ParseError::InvalidNode {
                    path: format!("{}/enum", path),
                    message: format!("'enum' must be an array, got {}", json_type_name(other)),
                })
            }
        };

        let precision = parse_count(map, "precision", path)?;
        let scale = parse_count(map, "scale", path)?;

        let mut extensions = IndexMap::new();
        for (key, value) in map {
            if CORE_KEYWORDS.contains(&key.as_str()) {
                continue;
            }
            if Feature::gating(key).is_some() {
                extensions.insert(key.clone(), value.clone());
            }
            // Other unknown keywords are ignored, as in the original.
        }

        Ok(SchemaNode {
            name,
            is_abstract,
            extends,
            kind,
            required,
            additional,
            enum_values,
            const_value: map.get("const").cloned(),
            precision,
            scale,
            description: optional_string(map, "description", path)?,
            extensions,
        })
    }

    fn parse_extends(&self, map: &Map<String, Value>, path: &str) -> Result<Vec<String>, ParseError> {
        match map.get("$extends") {
            None => Ok(Vec::new()),
            Some(Value::String(ptr)) => Ok(vec![ptr.clone()]),
            Some(Value::Array(items)) => {
                let mut extends = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let ptr = item.as_str().ok_or_else(|| ParseError::InvalidNode {
                        path: format!("{}/$extends/{}", path, idx),
                        message: "'$extends' entries must be JSON pointer strings".into(),
                    })?;
                    extends.push(ptr.to_string());
                }
                if extends.is_empty() {
                    return Err(ParseError::InvalidNode {
                        path: format!("{}/$extends", path),
                        message: "'$extends' list cannot be empty".into(),
                    });
                }
                Ok(extends)
            }
            Some(other) => Err(ParseError::InvalidNode {
                path: format!("{}/$extends", path),
                message: format!(
                    "'$extends' must be a pointer or array of pointers, got {}",
                    json_type_name(other)
                ),
            }),
        }
    }

    fn parse_type(&self, map: &Map<String, Value>, path: &str) -> Result<NodeKind, ParseError> {
        let type_value = &map["type"];
        match type_value {
            Value::String(s) => self.parse_named_type(s, map, path),
            Value::Array(items) => self.parse_union(items, path),
            Value::Object(obj) => {
                let pointer =
                    obj.get("$ref")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ParseError::InvalidNode {
                            path: format!("{}/type", path),
                            message: "a 'type' object must contain '$ref'".into(),
                        })?;
                Ok(NodeKind::Ref(pointer.to_string()))
            }
            other => Err(ParseError::InvalidNode {
                path: format!("{}/type", path),
                message: format!(
                    "'type' must be a string, array or $ref object, got {}",
                    json_type_name(other)
                ),
            }),
        }
    }

    fn parse_named_type(
        &self,
        type_name: &str,
        map: &Map<String, Value>,
        path: &str,
    ) -> Result<NodeKind, ParseError> {
        if type_name == "any" {
            return Ok(NodeKind::Any);
        }
        if let Some(primitive) = Primitive::parse(type_name) {
            return Ok(NodeKind::Primitive(primitive));
        }
        match type_name {
            "object" => {
                let properties = match map.get("properties") {
                    Some(value) => self.parse_properties(value, path)?,
                    // Objects extending a base may omit their own properties.
                    None if !map.get("$extends").map_or(true, Value::is_null) => IndexMap::new(),
                    None => {
                        return Err(ParseError::MissingRequiredField {
                            field: "properties",
                            path: path.into(),
                        })
                    }
                };
                Ok(NodeKind::Object { properties })
            }
            "array" => Ok(NodeKind::Array {
                items: Box::new(self.parse_element(map, "items", path)?),
            }),
            "set" => Ok(NodeKind::Set {
                items: Box::new(self.parse_element(map, "items", path)?),
            }),
            "map" => Ok(NodeKind::Map {
                values: Box::new(self.parse_element(map, "values", path)?),
            }),
            "tuple" => {
                let properties = match map.get("properties") {
                    Some(value) => self.parse_properties(value, path)?,
                    None => {
                        return Err(ParseError::MissingRequiredField {
                            field: "properties",
                            path: path.into(),
                        })
                    }
                };
                let order = match map.get("tuple") {
                    Some(Value::Array(items)) => {
                        let mut order = Vec::with_capacity(items.len());
                        for (idx, item) in items.iter().enumerate() {
                            let element =
                                item.as_str().ok_or_else(|| ParseError::InvalidNode {
                                    path: format!("{}/tuple/{}", path, idx),
                                    message: "'tuple' entries must be property names".into(),
                                })?;
                            order.push(element.to_string());
                        }
                        order
                    }
                    Some(other) => {
                        return Err(ParseError::InvalidNode {
                            path: format!("{}/tuple", path),
                            message: format!(
                                "'tuple' must be an array of property names, got {}",
                                json_type_name(other)
                            ),
                        })
                    }
                    None => {
                        return Err(ParseError::MissingRequiredField {
                            field: "tuple",
                            path: path.into(),
                        })
                    }
                };
                Ok(NodeKind::Tuple { properties, order })
            }
            "choice" => {
                let choices_value = map.get("choices").ok_or(ParseError::MissingRequiredField {
                    field: "choices",
                    path: path.into(),
                })?;
                let choices_map =
                    choices_value
                        .as_object()
                        .ok_or_else(|| ParseError::InvalidNode {
                            path: format!("{}/choices", path),
                            message: format!(
                                "'choices' must be an object, got {}",
                                json_type_name(choices_value)
                            ),
                        })?;
                let mut choices = IndexMap::new();
                for (key, value) in choices_map {
                    let choice_path = format!("{}/choices/{}", path, key);
                    if !self.identifier_ok(key) {
                        return Err(ParseError::InvalidIdentifier {
                            value: key.clone(),
                            path: choice_path,
                        });
                    }
                    let obj = value.as_object().ok_or_else(|| ParseError::InvalidNode {
                        path: choice_path.clone(),
                        message: "choice entries must be schema objects".into(),
                    })?;
                    choices.insert(key.clone(), self.parse_node(obj, &choice_path, false)?);
                }
                let selector = optional_string(map, "selector", path)?;
                Ok(NodeKind::Choice { choices, selector })
            }
            other => Err(ParseError::UnknownTypeKeyword {
                value: other.to_string(),
                path: format!("{}/type", path),
            }),
        }
    }

    fn parse_properties(
        &self,
        value: &Value,
        path: &str,
    ) -> Result<IndexMap<String, SchemaNode>, ParseError> {
        let map = value.as_object().ok_or_else(|| ParseError::InvalidNode {
            path: format!("{}/properties", path),
            message: format!("'properties' must be an object, got {}", json_type_name(value)),
        })?;
        let mut properties = IndexMap::new();
        for (key, prop_value) in map {
            let prop_path = format!("{}/properties/{}", path, key);
            if !self.identifier_ok(key) {
                return Err(ParseError::InvalidIdentifier {
                    value: key.clone(),
                    path: prop_path,
                });
            }
            let obj = prop_value
                .as_object()
                .ok_or_else(|| ParseError::InvalidNode {
                    path: prop_path.clone(),
                    message: format!(
                        "property '{}' must be a schema object, got {}",
                        key,
                        json_type_name(prop_value)
                    ),
                })?;
            properties.insert(key.clone(), self.parse_node(obj, &prop_path, false)?);
        }
        Ok(properties)
    }

    fn parse_element(
        &self,
        map: &Map<String, Value>,
        keyword: &'static str,
        path: &str,
    ) -> Result<SchemaNode, ParseError> {
        let value = map.get(keyword).ok_or(ParseError::MissingRequiredField {
            field: keyword,
            path: path.into(),
        })?;
        let obj = value.as_object().ok_or_else(|| ParseError::InvalidNode {
            path: format!("{}/{}", path, keyword),
            message: format!("'{}' must be a schema object, got {}", keyword, json_type_name(value)),
        })?;
        self.parse_node(obj, &format!("{}/{}", path, keyword), false)
    }

    fn parse_union(&self, items: &[Value], path: &str) -> Result<NodeKind, ParseError> {
        if items.is_empty() {
            return Err(ParseError::InvalidNode {
                path: format!("{}/type", path),
                message: "type union cannot be empty".into(),
            });
        }
        let mut members = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let member_path = format!("{}/type/{}", path, idx);
            match item {
                Value::String(s) => {
                    if s == "any" || Primitive::parse(s).is_some() {
                        if s == "any" {
                            return Err(ParseError::InvalidNode {
                                path: member_path,
                                message: "'any' is not permitted in a type union".into(),
                            });
                        }
                        members.push(UnionMember::Primitive(Primitive::parse(s).unwrap()));
                    } else if crate::types::COMPOUND_TYPES.contains(&s.as_str()) {
                        return Err(ParseError::InvalidNode {
                            path: member_path,
                            message: format!(
                                "inline compound type '{}' is not permitted in a union; use a $ref",
                                s
                            ),
                        });
                    } else {
                        return Err(ParseError::UnknownTypeKeyword {
                            value: s.clone(),
                            path: member_path,
                        });
                    }
                }
                Value::Object(obj) => {
                    let pointer = obj.get("$ref").and_then(Value::as_str).ok_or_else(|| {
                        ParseError::InvalidNode {
                            path: member_path.clone(),
                            message: "union members must be primitive names or $ref objects".into(),
                        }
                    })?;
                    members.push(UnionMember::Ref(pointer.to_string()));
                }
                other => {
                    return Err(ParseError::InvalidNode {
                        path: member_path,
                        message: format!(
                            "union member must be a string or $ref object, got {}",
                            json_type_name(other)
                        ),
                    })
                }
            }
        }
        Ok(NodeKind::Union(members))
    }
}

fn parse_count(
    map: &Map<String, Value>,
    keyword: &str,
    path: &str,
) -> Result<Option<u32>, ParseError> {
    match map.get(keyword) {
        None => Ok(None),
        Some(value) => {
            let n = value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ParseError::InvalidNode {
                    path: format!("{}/{}", path, keyword),
                    message: format!("'{}' must be a non-negative integer", keyword),
                })?;
            Ok(Some(n))
        }
    }
}
