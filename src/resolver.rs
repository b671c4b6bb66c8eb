//! Reference resolution - links a parsed document into a closed type graph.
//!
//! Resolution indexes every named type under its dot-qualified name
//! (`Shipping.Address`), expands `$extends` chains into flattened property
//! tables, applies activated add-ins, and rewrites `$ref` pointers into
//! symbolic references into the graph. All failures here are fatal;
//! validation never runs against a partially linked graph.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{
    AdditionalProperties, Namespace, NamespaceEntry, NodeKind, SchemaDocument, SchemaNode,
    UnionMember,
};
use crate::error::ResolveError;
use crate::types::{Activation, Primitive, MAX_DEPTH};

/// A fully linked type graph, keyed by dot-qualified type name.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    pub types: IndexMap<String, ResolvedType>,
    /// Qualified name of the document's root type, if any.
    pub root: Option<String>,
}

impl ResolvedGraph {
    pub fn get(&self, name: &str) -> Option<&ResolvedType> {
        self.types.get(name)
    }

    pub fn root_type(&self) -> Option<&ResolvedType> {
        self.root.as_deref().and_then(|name| self.types.get(name))
    }

    /// True if `name` transitively extends `base`.
    pub fn derives_from(&self, name: &str, base: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![name];
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(ty) = self.types.get(current) else {
                continue;
            };
            for parent in &ty.bases {
                if parent == base {
                    return true;
                }
                pending.push(parent);
            }
        }
        false
    }
}

/// A named or inline type after resolution.
///
/// Object types carry their full property table: declared properties,
/// properties flattened in from `$extends` bases, and properties merged in
/// by activated add-ins, each tagged with its origin.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub name: String,
    pub is_abstract: bool,
    /// Direct `$extends` bases, as qualified names.
    pub bases: Vec<String>,
    pub kind: ResolvedKind,
    pub required: Vec<String>,
    pub additional: Option<ResolvedAdditional>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl ResolvedType {
    fn primitive(p: Primitive) -> Self {
        ResolvedType {
            name: p.as_str().to_string(),
            is_abstract: false,
            bases: Vec::new(),
            kind: ResolvedKind::Primitive(p),
            required: Vec::new(),
            additional: None,
            enum_values: None,
            const_value: None,
            precision: None,
            scale: None,
        }
    }
}

/// A reference to a type: either a named graph entry or an inline schema.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Named(String),
    Inline(Box<ResolvedType>),
}

#[derive(Debug, Clone)]
pub enum ResolvedKind {
    /// A named alias (`$ref` used in a named position, e.g. via `$root`).
    Ref(String),
    Primitive(Primitive),
    Any,
    Union(Vec<TypeRef>),
    Object {
        properties: IndexMap<String, PropertyDef>,
    },
    Array {
        items: TypeRef,
    },
    Set {
        items: TypeRef,
    },
    Map {
        values: TypeRef,
    },
    Tuple {
        properties: IndexMap<String, TypeRef>,
        order: Vec<String>,
    },
    Choice(ChoiceShape),
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub ty: TypeRef,
    pub origin: PropertyOrigin,
}

/// Where an object property came from, for precedence and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOrigin {
    Declared,
    /// Flattened in from the named `$extends` base.
    Inherited(String),
    /// Merged in by the named activated add-in.
    AddIn(String),
}

#[derive(Debug, Clone)]
pub enum ResolvedAdditional {
    Allowed(bool),
    Schema(Box<ResolvedType>),
}

/// The two forms a choice type can take.
#[derive(Debug, Clone)]
pub enum ChoiceShape {
    /// Instances are single-key wrapper objects keyed by variant name.
    Tagged { choices: IndexMap<String, TypeRef> },
    /// Instances are flat objects carrying a selector property.
    Inline {
        selector: String,
        /// The abstract base named by `$extends`, when present and resolvable.
        base: Option<String>,
        choices: IndexMap<String, TypeRef>,
    },
}

/// Resolve a document into a closed type graph.
///
/// `activation` is the combined activation set (document `$uses` plus any
/// caller-supplied names); entries that are not feature identifiers are
/// treated as add-in names and applied in activation order.
pub fn resolve(doc: &SchemaDocument, activation: &Activation) -> Result<ResolvedGraph, ResolveError> {
    let mut resolver = Resolver::index(doc);
    resolver.apply_addins(doc, activation)?;

    let names: Vec<String> = resolver.table.keys().cloned().collect();
    for name in names {
        resolver.ensure_resolved(&name)?;
    }

    let root = match &doc.root_ref {
        Some(pointer) => Some(resolver.resolve_pointer(pointer, "/$root")?),
        None => resolver.root_name.clone(),
    };
    if let Some(root) = &root {
        let target = follow_alias(&resolver.done, root);
        if resolver.done.get(&target).is_some_and(|t| t.is_abstract) {
            return Err(ResolveError::AbstractTypeMisuse {
                name: target,
                path: "".into(),
            });
        }
    }

    Ok(ResolvedGraph {
        types: resolver.done,
        root,
    })
}

fn follow_alias(types: &IndexMap<String, ResolvedType>, name: &str) -> String {
    let mut current = name.to_string();
    for _ in 0..MAX_DEPTH {
        match types.get(&current).map(|t| &t.kind) {
            Some(ResolvedKind::Ref(target)) => current = target.clone(),
            _ => break,
        }
    }
    current
}

struct Resolver {
    /// Working copies of every named type, post add-in merge.
    table: IndexMap<String, SchemaNode>,
    /// `#/definitions/...` pointer to qualified name.
    pointer_index: HashMap<String, String>,
    /// Pointers that address namespaces rather than types.
    namespace_pointers: HashSet<String>,
    /// Add-in property origins: qualified type to (property to add-in name).
    addin_origin: HashMap<String, HashMap<String, String>>,
    root_name: Option<String>,
    done: IndexMap<String, ResolvedType>,
    /// Types currently being flattened, for `$extends` cycle detection.
    stack: Vec<String>,
}

impl Resolver {
    fn index(doc: &SchemaDocument) -> Self {
        let mut resolver = Resolver {
            table: IndexMap::new(),
            pointer_index: HashMap::new(),
            namespace_pointers: HashSet::new(),
            addin_origin: HashMap::new(),
            root_name: None,
            done: IndexMap::new(),
            stack: Vec::new(),
        };
        resolver.index_namespace(&doc.definitions, "#/definitions", "");
        if let Some(root) = &doc.root {
            // The parser guarantees root types carry a name.
            if let Some(name) = &root.name {
                resolver
                    .table
                    .entry(name.clone())
                    .or_insert_with(|| root.clone());
                resolver.root_name = Some(name.clone());
            }
        }
        resolver
    }

    fn index_namespace(&mut self, namespace: &Namespace, pointer_prefix: &str, qualified_prefix: &str) {
        for (key, entry) in namespace.iter() {
            let pointer = format!("{}/{}", pointer_prefix, key);
            let qualified = if qualified_prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", qualified_prefix, key)
            };
            match entry {
                NamespaceEntry::Type(node) => {
                    self.pointer_index.insert(pointer, qualified.clone());
                    self.table.insert(qualified, node.clone());
                }
                NamespaceEntry::Namespace(inner) => {
                    self.namespace_pointers.insert(pointer.clone());
                    self.index_namespace(inner, &pointer, &qualified);
                }
            }
        }
    }

    fn resolve_pointer(&self, pointer: &str, path: &str) -> Result<String, ResolveError> {
        if pointer == "#" {
            return self.root_name.clone().ok_or_else(|| ResolveError::UnresolvedRef {
                pointer: pointer.to_string(),
                path: path.to_string(),
            });
        }
        if let Some(qualified) = self.pointer_index.get(pointer) {
            return Ok(qualified.clone());
        }
        if self.namespace_pointers.contains(pointer) {
            return Err(ResolveError::RefTargetNotNamedType {
                pointer: pointer.to_string(),
                path: path.to_string(),
            });
        }
        Err(ResolveError::UnresolvedRef {
            pointer: pointer.to_string(),
            path: path.to_string(),
        })
    }

    /// A `$ref` in a value position: the target must exist and be concrete.
    fn named_ref(&self, pointer: &str, path: &str) -> Result<String, ResolveError> {
        let target = self.resolve_pointer(pointer, path)?;
        if self.table.get(&target).is_some_and(|n| n.is_abstract) {
            return Err(ResolveError::AbstractTypeMisuse {
                name: target,
                path: path.to_string(),
            });
        }
        Ok(target)
    }

    fn apply_addins(&mut self, doc: &SchemaDocument, activation: &Activation) -> Result<(), ResolveError> {
        for addin_name in activation.addin_names() {
            let pointers = doc
                .offers
                .get(addin_name)
                .ok_or_else(|| ResolveError::UnknownAddIn {
                    name: addin_name.to_string(),
                })?;
            for pointer in pointers {
                let addin_qualified = self.resolve_pointer(pointer, "/$offers")?;
                let addin = self.table[&addin_qualified].clone();
                if !addin.is_abstract {
                    return Err(ResolveError::AddInNotAbstract {
                        name: addin_name.to_string(),
                        pointer: pointer.clone(),
                    });
                }
                if addin.extends.is_empty() {
                    return Err(ResolveError::AddInMissingTarget {
                        name: addin_name.to_string(),
                        pointer: pointer.clone(),
                    });
                }
                let NodeKind::Object {
                    properties: addin_properties,
                } = &addin.kind
                else {
                    // Only object add-ins contribute properties.
                    continue;
                };
                for target_pointer in &addin.extends {
                    let target_qualified = self.resolve_pointer(target_pointer, pointer)?;
                    let origins = self.addin_origin.entry(target_qualified.clone()).or_default();
                    let target = self
                        .table
                        .get_mut(&target_qualified)
                        .ok_or_else(|| ResolveError::UnresolvedRef {
                            pointer: target_pointer.clone(),
                            path: pointer.clone(),
                        })?;
                    let NodeKind::Object { properties } = &mut target.kind else {
                        continue;
                    };
                    for (prop, node) in addin_properties {
                        // Natively declared properties always win over add-ins;
                        // among add-ins the one activated last wins.
                        let native = properties.contains_key(prop) && !origins.contains_key(prop);
                        if native {
                            continue;
                        }
                        properties.insert(prop.clone(), node.clone());
                        origins.insert(prop.clone(), addin_name.to_string());
                    }
                    if let Some(addin_required) = &addin.required {
                        let required = target.required.get_or_insert_with(Vec::new);
                        for name in addin_required {
                            if !required.contains(name) {
                                required.push(name.clone());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn ensure_resolved(&mut self, name: &str) -> Result<(), ResolveError> {
        if self.done.contains_key(name) {
            return Ok(());
        }
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut cycle: Vec<String> = self.stack[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(ResolveError::CyclicInheritance { cycle });
        }
        self.stack.push(name.to_string());
        let node = self.table[name].clone();
        let resolved = self.resolve_node(&node, name, &format!("/{}", name), 0)?;
        self.stack.pop();
        self.done.insert(name.to_string(), resolved);
        Ok(())
    }

    fn resolve_node(
        &mut self,
        node: &SchemaNode,
        qualified: &str,
        path: &str,
        depth: usize,
    ) -> Result<ResolvedType, ResolveError> {
        if depth > MAX_DEPTH {
            return Err(ResolveError::MaxDepthExceeded {
                path: path.to_string(),
            });
        }

        let mut bases = Vec::with_capacity(node.extends.len());
        for pointer in &node.extends {
            bases.push(self.resolve_pointer(pointer, path)?);
        }
        // Bases go through the in-progress stack regardless of the node's
        // kind, so an `$extends` cycle is caught even without an object in
        // the chain.
        for base in &bases {
            self.ensure_resolved(base)?;
        }

        let mut required: Vec<String> = node.required.clone().unwrap_or_default();

        let kind = match &node.kind {
            NodeKind::Ref(pointer) => ResolvedKind::Ref(self.named_ref(pointer, path)?),
            NodeKind::Primitive(p) => ResolvedKind::Primitive(*p),
            NodeKind::Any => ResolvedKind::Any,
            NodeKind::Union(members) => {
                let mut refs = Vec::with_capacity(members.len());
                for member in members {
                    refs.push(match member {
                        UnionMember::Primitive(p) => {
                            TypeRef::Inline(Box::new(ResolvedType::primitive(*p)))
                        }
                        UnionMember::Ref(pointer) => TypeRef::Named(self.named_ref(pointer, path)?),
                    });
                }
                ResolvedKind::Union(refs)
            }
            NodeKind::Object { properties } => {
                let mut resolved = IndexMap::new();
                for (key, prop) in properties {
                    let prop_path = format!("{}/properties/{}", path, key);
                    let origin = self
                        .addin_origin
                        .get(qualified)
                        .and_then(|m| m.get(key))
                        .map(|addin| PropertyOrigin::AddIn(addin.clone()))
                        .unwrap_or(PropertyOrigin::Declared);
                    let ty = self.type_ref(prop, &prop_path, depth + 1)?;
                    resolved.insert(key.clone(), PropertyDef { ty, origin });
                }
                // Flatten inherited properties in base declaration order;
                // the first declaration of a property name wins.
                for base in &bases {
                    let base_type = self.done[base].clone();
                    if let ResolvedKind::Object {
                        properties: base_properties,
                    } = &base_type.kind
                    {
                        for (key, def) in base_properties {
                            if !resolved.contains_key(key) {
                                resolved.insert(
                                    key.clone(),
                                    PropertyDef {
                                        ty: def.ty.clone(),
                                        origin: PropertyOrigin::Inherited(base.clone()),
                                    },
                                );
                            }
                        }
                    }
                    for name in &base_type.required {
                        if !required.contains(name) {
                            required.push(name.clone());
                        }
                    }
                }
                ResolvedKind::Object {
                    properties: resolved,
                }
            }
            NodeKind::Array { items } => ResolvedKind::Array {
                items: self.type_ref(items, &format!("{}/items", path), depth + 1)?,
            },
            NodeKind::Set { items } => ResolvedKind::Set {
                items: self.type_ref(items, &format!("{}/items", path), depth + 1)?,
            },
            NodeKind::Map { values } => ResolvedKind::Map {
                values: self.type_ref(values, &format!("{}/values", path), depth + 1)?,
            },
            NodeKind::Tuple { properties, order } => {
                let mut resolved = IndexMap::new();
                for (key, prop) in properties {
                    let prop_path = format!("{}/properties/{}", path, key);
                    resolved.insert(key.clone(), self.type_ref(prop, &prop_path, depth + 1)?);
                }
                ResolvedKind::Tuple {
                    properties: resolved,
                    order: order.clone(),
                }
            }
            NodeKind::Choice { choices, selector } => {
                let mut resolved = IndexMap::new();
                for (key, choice) in choices {
                    let choice_path = format!("{}/choices/{}", path, key);
                    resolved.insert(key.clone(), self.type_ref(choice, &choice_path, depth + 1)?);
                }
                let shape = match selector {
                    Some(selector) => ChoiceShape::Inline {
                        selector: selector.clone(),
                        base: bases.first().cloned(),
                        choices: resolved,
                    },
                    None => ChoiceShape::Tagged { choices: resolved },
                };
                ResolvedKind::Choice(shape)
            }
        };

        let additional = match &node.additional {
            None => None,
            Some(AdditionalProperties::Allowed(allowed)) => {
                Some(ResolvedAdditional::Allowed(*allowed))
            }
            Some(AdditionalProperties::Schema(schema)) => {
                Some(ResolvedAdditional::Schema(Box::new(self.resolve_node(
                    schema,
                    "",
                    &format!("{}/additionalProperties", path),
                    depth + 1,
                )?)))
            }
        };

        Ok(ResolvedType {
            name: node.name.clone().unwrap_or_default(),
            is_abstract: node.is_abstract,
            bases,
            kind,
            required,
            additional,
            enum_values: node.enum_values.clone(),
            const_value: node.const_value.clone(),
            precision: node.precision,
            scale: node.scale,
        })
    }

    /// Convert a value-position node into a reference: plain `$ref` nodes
    /// become symbolic links, everything else resolves inline.
    fn type_ref(
        &mut self,
        node: &SchemaNode,
        path: &str,
        depth: usize,
    ) -> Result<TypeRef, ResolveError> {
        if let NodeKind::Ref(pointer) = &node.kind {
            let plain = node.enum_values.is_none()
                && node.const_value.is_none()
                && node.extends.is_empty();
            if plain {
                return Ok(TypeRef::Named(self.named_ref(pointer, path)?));
            }
        }
        Ok(TypeRef::Inline(Box::new(
            self.resolve_node(node, "", path, depth)?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;
    use serde_json::{json, Value};

    fn graph(value: Value) -> ResolvedGraph {
        graph_with(value, &Activation::new())
    }

    fn graph_with(value: Value, activation: &Activation) -> ResolvedGraph {
        let doc = document::parse(&value, false).unwrap();
        resolve(&doc, activation).unwrap()
    }

    fn graph_err(value: Value) -> ResolveError {
        graph_err_with(value, &Activation::new())
    }

    fn graph_err_with(value: Value, activation: &Activation) -> ResolveError {
        let doc = document::parse(&value, false).unwrap();
        resolve(&doc, activation).unwrap_err()
    }

    fn object_properties(ty: &ResolvedType) -> &IndexMap<String, PropertyDef> {
        match &ty.kind {
            ResolvedKind::Object { properties } => properties,
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn qualified_names_for_nested_namespaces() {
        let g = graph(json!({
            "definitions": {
                "Shipping": {
                    "Address": {
                        "name": "Address",
                        "type": "object",
                        "properties": { "street": { "type": "string" } }
                    }
                }
            }
        }));
        assert!(g.get("Shipping.Address").is_some());
        assert!(g.get("Address").is_none());
    }

    #[test]
    fn ref_links_to_named_type() {
        let g = graph(json!({
            "name": "Order",
            "type": "object",
            "properties": {
                "shipTo": { "$ref": "#/definitions/Address" }
            },
            "definitions": {
                "Address": {
                    "name": "Address",
                    "type": "object",
                    "properties": { "street": { "type": "string" } }
                }
            }
        }));
        let order = g.root_type().unwrap();
        let ship_to = &object_properties(order)["shipTo"];
        assert!(matches!(&ship_to.ty, TypeRef::Named(name) if name == "Address"));
    }

    #[test]
    fn unresolved_ref_is_fatal() {
        let err = graph_err(json!({
            "name": "Order",
            "type": "object",
            "properties": { "shipTo": { "$ref": "#/definitions/Missing" } }
        }));
        assert!(matches!(err, ResolveError::UnresolvedRef { pointer, .. }
            if pointer == "#/definitions/Missing"));
    }

    #[test]
    fn ref_to_namespace_is_rejected() {
        let err = graph_err(json!({
            "name": "Order",
            "type": "object",
            "properties": { "shipTo": { "$ref": "#/definitions/Shipping" } },
            "definitions": {
                "Shipping": {
                    "Address": {
                        "name": "Address",
                        "type": "object",
                        "properties": {}
                    }
                }
            }
        }));
        assert!(matches!(err, ResolveError::RefTargetNotNamedType { .. }));
    }

    #[test]
    fn extends_flattens_base_properties_and_required() {
        let g = graph(json!({
            "definitions": {
                "Vehicle": {
                    "name": "Vehicle",
                    "abstract": true,
                    "type": "object",
                    "properties": { "make": { "type": "string" } },
                    "required": ["make"]
                },
                "Car": {
                    "name": "Car",
                    "type": "object",
                    "$extends": "#/definitions/Vehicle",
                    "properties": { "doors": { "type": "int32" } },
                    "required": ["doors"]
                }
            }
        }));
        let car = g.get("Car").unwrap();
        let props = object_properties(car);
        assert!(matches!(props["doors"].origin, PropertyOrigin::Declared));
        assert!(matches!(&props["make"].origin, PropertyOrigin::Inherited(b) if b == "Vehicle"));
        assert_eq!(car.required, vec!["doors", "make"]);
    }

    #[test]
    fn multiple_inheritance_first_base_wins() {
        let g = graph(json!({
            "definitions": {
                "Car": {
                    "name": "Car",
                    "abstract": true,
                    "type": "object",
                    "properties": {
                        "wheels": { "type": "int32" },
                        "maxSpeed": { "type": "int32" }
                    }
                },
                "Aircraft": {
                    "name": "Aircraft",
                    "abstract": true,
                    "type": "object",
                    "properties": {
                        "wingspan": { "type": "double" },
                        "maxSpeed": { "type": "double" }
                    },
                    "required": ["wingspan"]
                },
                "FlyingCar": {
                    "name": "FlyingCar",
                    "type": "object",
                    "$extends": ["#/definitions/Car", "#/definitions/Aircraft"],
                    "properties": {}
                }
            }
        }));
        let flying_car = g.get("FlyingCar").unwrap();
        let props = object_properties(flying_car);
        // maxSpeed comes from Car, the earlier base.
        assert!(matches!(&props["maxSpeed"].origin, PropertyOrigin::Inherited(b) if b == "Car"));
        assert!(props.contains_key("wingspan"));
        assert_eq!(flying_car.required, vec!["wingspan"]);
    }

    #[test]
    fn child_declaration_overrides_base() {
        let g = graph(json!({
            "definitions": {
                "Base": {
                    "name": "Base",
                    "abstract": true,
                    "type": "object",
                    "properties": { "id": { "type": "string" } }
                },
                "Derived": {
                    "name": "Derived",
                    "type": "object",
                    "$extends": "#/definitions/Base",
                    "properties": { "id": { "type": "uuid" } }
                }
            }
        }));
        let derived = g.get("Derived").unwrap();
        let id = &object_properties(derived)["id"];
        assert!(matches!(id.origin, PropertyOrigin::Declared));
        match &id.ty {
            TypeRef::Inline(ty) => {
                assert!(matches!(ty.kind, ResolvedKind::Primitive(Primitive::Uuid)))
            }
            other => panic!("expected inline, got {:?}", other),
        }
    }

    #[test]
    fn cyclic_extends_is_fatal() {
        let err = graph_err(json!({
            "definitions": {
                "A": {
                    "name": "A", "type": "object",
                    "$extends": "#/definitions/B", "properties": {}
                },
                "B": {
                    "name": "B", "type": "object",
                    "$extends": "#/definitions/A", "properties": {}
                }
            }
        }));
        let ResolveError::CyclicInheritance { cycle } = err else {
            panic!("expected cycle, got {:?}", err);
        };
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.len() >= 3);
    }

    #[test]
    fn cyclic_extends_between_string_types_is_fatal() {
        let err = graph_err(json!({
            "definitions": {
                "A": { "name": "A", "type": "string", "$extends": "#/definitions/B" },
                "B": { "name": "B", "type": "string", "$extends": "#/definitions/A" }
            }
        }));
        let ResolveError::CyclicInheritance { cycle } = err else {
            panic!("expected cycle, got {:?}", err);
        };
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn cyclic_extends_between_choice_types_is_fatal() {
        let err = graph_err(json!({
            "definitions": {
                "A": {
                    "name": "A", "type": "choice",
                    "$extends": "#/definitions/B",
                    "choices": { "text": { "type": "string" } }
                },
                "B": {
                    "name": "B", "type": "choice",
                    "$extends": "#/definitions/A",
                    "choices": { "text": { "type": "string" } }
                }
            }
        }));
        assert!(matches!(err, ResolveError::CyclicInheritance { .. }));
    }

    #[test]
    fn abstract_type_cannot_be_referenced_as_value() {
        let err = graph_err(json!({
            "name": "Garage",
            "type": "object",
            "properties": { "vehicle": { "$ref": "#/definitions/Vehicle" } },
            "definitions": {
                "Vehicle": {
                    "name": "Vehicle",
                    "abstract": true,
                    "type": "object",
                    "properties": {}
                }
            }
        }));
        assert!(matches!(err, ResolveError::AbstractTypeMisuse { name, .. } if name == "Vehicle"));
    }

    #[test]
    fn abstract_root_is_rejected() {
        let err = graph_err(json!({
            "$root": "#/definitions/Vehicle",
            "definitions": {
                "Vehicle": {
                    "name": "Vehicle",
                    "abstract": true,
                    "type": "object",
                    "properties": {}
                }
            }
        }));
        assert!(matches!(err, ResolveError::AbstractTypeMisuse { .. }));
    }

    #[test]
    fn root_pointer_selects_definition() {
        let g = graph(json!({
            "$root": "#/definitions/Person",
            "definitions": {
                "Person": {
                    "name": "Person",
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                }
            }
        }));
        assert_eq!(g.root.as_deref(), Some("Person"));
        assert!(g.root_type().is_some());
    }

    #[test]
    fn inline_choice_records_selector_and_base() {
        let g = graph(json!({
            "definitions": {
                "Animal": {
                    "name": "Animal",
                    "abstract": true,
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                },
                "Dog": {
                    "name": "Dog", "type": "object",
                    "$extends": "#/definitions/Animal",
                    "properties": { "barks": { "type": "boolean" } }
                },
                "Pet": {
                    "name": "Pet",
                    "type": "choice",
                    "$extends": "#/definitions/Animal",
                    "selector": "kind",
                    "choices": {
                        "dog": { "$ref": "#/definitions/Dog" }
                    }
                }
            }
        }));
        let pet = g.get("Pet").unwrap();
        let ResolvedKind::Choice(ChoiceShape::Inline { selector, base, choices }) = &pet.kind
        else {
            panic!("expected inline choice");
        };
        assert_eq!(selector, "kind");
        assert_eq!(base.as_deref(), Some("Animal"));
        assert!(matches!(&choices["dog"], TypeRef::Named(n) if n == "Dog"));
        assert!(g.derives_from("Dog", "Animal"));
    }

    #[test]
    fn tagged_choice_has_no_selector() {
        let g = graph(json!({
            "name": "Value",
            "type": "choice",
            "choices": {
                "text": { "type": "string" },
                "count": { "type": "int32" }
            }
        }));
        let value = g.root_type().unwrap();
        assert!(matches!(
            &value.kind,
            ResolvedKind::Choice(ChoiceShape::Tagged { choices }) if choices.len() == 2
        ));
    }

    mod addins {
        use super::*;

        fn offer_doc() -> Value {
            json!({
                "$offers": {
                    "DeliveryInfo": "#/definitions/DeliveryAddIn"
                },
                "definitions": {
                    "Address": {
                        "name": "Address",
                        "type": "object",
                        "properties": { "street": { "type": "string" } }
                    },
                    "DeliveryAddIn": {
                        "name": "DeliveryAddIn",
                        "abstract": true,
                        "type": "object",
                        "$extends": "#/definitions/Address",
                        "properties": { "instructions": { "type": "string" } },
                        "required": ["instructions"]
                    }
                }
            })
        }

        #[test]
        fn inactive_addin_contributes_nothing() {
            let g = graph(offer_doc());
            let address = g.get("Address").unwrap();
            assert!(!object_properties(address).contains_key("instructions"));
        }

        #[test]
        fn active_addin_merges_into_target() {
            let activation = Activation::from_names(["DeliveryInfo"]);
            let g = graph_with(offer_doc(), &activation);
            let address = g.get("Address").unwrap();
            let props = object_properties(address);
            assert!(
                matches!(&props["instructions"].origin, PropertyOrigin::AddIn(n) if n == "DeliveryInfo")
            );
            assert_eq!(address.required, vec!["instructions"]);
        }

        #[test]
        fn unknown_addin_is_fatal() {
            let activation = Activation::from_names(["Nonexistent"]);
            let err = graph_err_with(offer_doc(), &activation);
            assert!(matches!(err, ResolveError::UnknownAddIn { name } if name == "Nonexistent"));
        }

        #[test]
        fn addin_must_be_abstract() {
            let mut doc = offer_doc();
            doc["definitions"]["DeliveryAddIn"]["abstract"] = json!(false);
            let activation = Activation::from_names(["DeliveryInfo"]);
            let err = graph_err_with(doc, &activation);
            assert!(matches!(err, ResolveError::AddInNotAbstract { .. }));
        }

        #[test]
        fn addin_must_extend_a_target() {
            let mut doc = offer_doc();
            doc["definitions"]["DeliveryAddIn"]
                .as_object_mut()
                .unwrap()
                .remove("$extends");
            let activation = Activation::from_names(["DeliveryInfo"]);
            let err = graph_err_with(doc, &activation);
            assert!(matches!(err, ResolveError::AddInMissingTarget { .. }));
        }

        #[test]
        fn native_property_wins_over_addin() {
            let mut doc = offer_doc();
            doc["definitions"]["Address"]["properties"]["instructions"] =
                json!({ "type": "int32" });
            let activation = Activation::from_names(["DeliveryInfo"]);
            let g = graph_with(doc, &activation);
            let props = object_properties(g.get("Address").unwrap());
            assert!(matches!(props["instructions"].origin, PropertyOrigin::Declared));
            match &props["instructions"].ty {
                TypeRef::Inline(ty) => {
                    assert!(matches!(ty.kind, ResolvedKind::Primitive(Primitive::Int32)))
                }
                other => panic!("expected inline, got {:?}", other),
            }
        }

        #[test]
        fn later_addin_wins_over_earlier() {
            let doc = json!({
                "$offers": {
                    "First": "#/definitions/FirstAddIn",
                    "Second": "#/definitions/SecondAddIn"
                },
                "definitions": {
                    "Target": {
                        "name": "Target", "type": "object", "properties": {}
                    },
                    "FirstAddIn": {
                        "name": "FirstAddIn", "abstract": true, "type": "object",
                        "$extends": "#/definitions/Target",
                        "properties": { "extra": { "type": "string" } }
                    },
                    "SecondAddIn": {
                        "name": "SecondAddIn", "abstract": true, "type": "object",
                        "$extends": "#/definitions/Target",
                        "properties": { "extra": { "type": "int32" } }
                    }
                }
            });
            let activation = Activation::from_names(["First", "Second"]);
            let g = graph_with(doc, &activation);
            let props = object_properties(g.get("Target").unwrap());
            assert!(matches!(&props["extra"].origin, PropertyOrigin::AddIn(n) if n == "Second"));
            match &props["extra"].ty {
                TypeRef::Inline(ty) => {
                    assert!(matches!(ty.kind, ResolvedKind::Primitive(Primitive::Int32)))
                }
                other => panic!("expected inline, got {:?}", other),
            }
        }
    }

    #[test]
    fn deep_inline_nesting_exceeds_depth_cap() {
        let mut node = json!({ "type": "string" });
        for _ in 0..(MAX_DEPTH + 1) {
            node = json!({ "type": "array", "items": node });
        }
        let mut doc = json!({ "name": "Deep" });
        doc.as_object_mut()
            .unwrap()
            .extend(node.as_object().unwrap().clone());
        let err = graph_err(doc);
        assert!(matches!(err, ResolveError::MaxDepthExceeded { .. }));
    }
}
