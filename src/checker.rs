//! Schema validation - structural diagnostics for a parsed and resolved
//! schema document.
//!
//! Unlike parse and resolve failures, these checks accumulate: one pass
//! reports every defect. Structural keyword rules are checked against the
//! document model; rules that need flattened inheritance (required-property
//! coverage, tuple order, choice derivation) run against the resolved graph.

use std::collections::HashSet;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::document::{AdditionalProperties, NamespaceEntry, NodeKind, SchemaDocument, SchemaNode};
use crate::resolver::{
    ChoiceShape, ResolvedAdditional, ResolvedGraph, ResolvedKind, ResolvedType, TypeRef,
};
use crate::types::{Activation, Feature, ABSOLUTE_URI_REGEX};

/// Check a document against the core structural rules.
///
/// `activation` is the combined activation set used during resolution; it
/// drives the keyword-gating checks.
pub fn check(
    doc: &SchemaDocument,
    graph: &ResolvedGraph,
    activation: &Activation,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    check_document_header(doc, &mut diagnostics);
    check_uses(doc, &mut diagnostics);

    if let Some(root) = &doc.root {
        check_node(root, "", activation, &mut diagnostics);
    }
    check_namespace_nodes(doc, activation, &mut diagnostics);

    for (qualified, ty) in &graph.types {
        let path = graph_path(doc, qualified);
        check_resolved(ty, graph, &path, &mut diagnostics);
    }

    diagnostics
}

fn graph_path(doc: &SchemaDocument, qualified: &str) -> String {
    // Root types live at the document root; definitions under their
    // namespace chain.
    if doc.root.is_some() && doc.definitions.get(qualified).is_none() && !qualified.contains('.') {
        return String::new();
    }
    format!("/definitions/{}", qualified.replace('.', "/"))
}

fn check_document_header(doc: &SchemaDocument, diagnostics: &mut Vec<Diagnostic>) {
    match &doc.schema_uri {
        None => diagnostics.push(Diagnostic::warning(
            DiagnosticKind::MissingSchemaUri,
            "",
            "schema does not declare $schema",
        )),
        Some(uri) if !ABSOLUTE_URI_REGEX.is_match(uri) => diagnostics.push(Diagnostic::error(
            DiagnosticKind::InvalidSchemaDocument,
            "/$schema",
            format!("$schema must be an absolute URI, got \"{}\"", uri),
        )),
        Some(_) => {}
    }
    match &doc.id {
        None => diagnostics.push(Diagnostic::warning(
            DiagnosticKind::MissingId,
            "",
            "schema does not declare $id",
        )),
        Some(uri) if !ABSOLUTE_URI_REGEX.is_match(uri) => diagnostics.push(Diagnostic::error(
            DiagnosticKind::InvalidSchemaDocument,
            "/$id",
            format!("$id must be an absolute URI, got \"{}\"", uri),
        )),
        Some(_) => {}
    }
}

fn check_uses(doc: &SchemaDocument, diagnostics: &mut Vec<Diagnostic>) {
    for name in &doc.uses {
        if Feature::parse(name).is_none() && !doc.offers.contains_key(name) {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::UnknownExtension,
                "/$uses",
                format!("\"{}\" is neither a known feature nor an offered add-in", name),
            ));
        }
    }
}

fn check_namespace_nodes(
    doc: &SchemaDocument,
    activation: &Activation,
    diagnostics: &mut Vec<Diagnostic>,
) {
    fn walk(
        entries: &crate::document::Namespace,
        path: &str,
        activation: &Activation,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for (key, entry) in entries.iter() {
            let entry_path = format!("{}/{}", path, key);
            match entry {
                NamespaceEntry::Type(node) => check_node(node, &entry_path, activation, diagnostics),
                NamespaceEntry::Namespace(inner) => walk(inner, &entry_path, activation, diagnostics),
            }
        }
    }
    walk(&doc.definitions, "/definitions", activation, diagnostics);
}

/// Keyword legality on a single document node, recursing into children.
fn check_node(
    node: &SchemaNode,
    path: &str,
    activation: &Activation,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (keyword, _) in &node.extensions {
        if let Some(feature) = Feature::gating(keyword) {
            if !activation.has_feature(feature) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::FeatureNotActivated,
                    format!("{}/{}", path, keyword),
                    format!(
                        "keyword '{}' requires {} to be activated via $uses",
                        keyword,
                        feature.identifier()
                    ),
                ));
            }
        }
    }

    let is_object = matches!(node.kind, NodeKind::Object { .. });
    if node.required.is_some() && !is_object {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::RequiredOnNonObject,
            format!("{}/required", path),
            format!("'required' is not valid on a {} type", node.kind.kind_name()),
        ));
    }
    if node.additional.is_some() && !is_object {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::AdditionalPropertiesOnNonObject,
            format!("{}/additionalProperties", path),
            format!(
                "'additionalProperties' is not valid on a {} type",
                node.kind.kind_name()
            ),
        ));
    }

    let compound = matches!(
        node.kind,
        NodeKind::Object { .. }
            | NodeKind::Array { .. }
            | NodeKind::Set { .. }
            | NodeKind::Map { .. }
            | NodeKind::Tuple { .. }
            | NodeKind::Choice { .. }
    );
    if compound {
        if node.enum_values.is_some() {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::EnumOnCompoundType,
                format!("{}/enum", path),
                format!("'enum' is not valid on a {} type", node.kind.kind_name()),
            ));
        }
        if node.const_value.is_some() {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::ConstOnCompoundType,
                format!("{}/const", path),
                format!("'const' is not valid on a {} type", node.kind.kind_name()),
            ));
        }
    }

    match &node.kind {
        NodeKind::Object { properties } => {
            for (key, prop) in properties {
                check_node(prop, &format!("{}/properties/{}", path, key), activation, diagnostics);
            }
            if let Some(AdditionalProperties::Schema(schema)) = &node.additional {
                check_node(
                    schema,
                    &format!("{}/additionalProperties", path),
                    activation,
                    diagnostics,
                );
            }
        }
        NodeKind::Array { items } | NodeKind::Set { items } => {
            check_node(items, &format!("{}/items", path), activation, diagnostics);
        }
        NodeKind::Map { values } => {
            check_node(values, &format!("{}/values", path), activation, diagnostics);
        }
        NodeKind::Tuple { properties, .. } => {
            for (key, prop) in properties {
                check_node(prop, &format!("{}/properties/{}", path, key), activation, diagnostics);
            }
        }
        NodeKind::Choice { choices, .. } => {
            for (key, choice) in choices {
                check_node(choice, &format!("{}/choices/{}", path, key), activation, diagnostics);
            }
        }
        NodeKind::Ref(_) | NodeKind::Primitive(_) | NodeKind::Any | NodeKind::Union(_) => {}
    }
}

/// Rules that need flattened inheritance, checked on the resolved graph.
fn check_resolved(
    ty: &ResolvedType,
    graph: &ResolvedGraph,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match &ty.kind {
        ResolvedKind::Object { properties } => {
            for base in &ty.bases {
                let contributes = graph.get(base).map_or(true, |b| {
                    matches!(b.kind, ResolvedKind::Object { .. } | ResolvedKind::Ref(_))
                });
                if !contributes {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::ExtendsNonObject,
                        format!("{}/$extends", path),
                        format!(
                            "$extends base '{}' is not an object type and contributes no properties",
                            base
                        ),
                    ));
                }
            }
            for name in &ty.required {
                if !properties.contains_key(name) {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::UnknownRequiredProperty,
                        format!("{}/required", path),
                        format!("required property '{}' is not declared or inherited", name),
                    ));
                }
            }
            for (key, def) in properties {
                if let TypeRef::Inline(inline) = &def.ty {
                    check_resolved(
                        inline,
                        graph,
                        &format!("{}/properties/{}", path, key),
                        diagnostics,
                    );
                }
            }
        }
        ResolvedKind::Tuple {
            properties, order, ..
        } => {
            let mut seen = HashSet::new();
            for name in order {
                if !seen.insert(name) {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::TupleOrderMismatch,
                        format!("{}/tuple", path),
                        format!("tuple element '{}' appears more than once in the order", name),
                    ));
                } else if !properties.contains_key(name) {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::TupleOrderMismatch,
                        format!("{}/tuple", path),
                        format!("tuple element '{}' is not declared in properties", name),
                    ));
                }
            }
            for name in properties.keys() {
                if !order.contains(name) {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::TupleOrderMismatch,
                        format!("{}/tuple", path),
                        format!("property '{}' is missing from the tuple order", name),
                    ));
                }
            }
            for (key, element) in properties {
                if let TypeRef::Inline(inline) = element {
                    check_resolved(
                        inline,
                        graph,
                        &format!("{}/properties/{}", path, key),
                        diagnostics,
                    );
                }
            }
        }
        ResolvedKind::Choice(shape) => check_choice(ty, shape, graph, path, diagnostics),
        ResolvedKind::Array { items } | ResolvedKind::Set { items } => {
            if let TypeRef::Inline(inline) = items {
                check_resolved(inline, graph, &format!("{}/items", path), diagnostics);
            }
        }
        ResolvedKind::Map { values } => {
            if let TypeRef::Inline(inline) = values {
                check_resolved(inline, graph, &format!("{}/values", path), diagnostics);
            }
        }
        ResolvedKind::Union(members) => {
            for (idx, member) in members.iter().enumerate() {
                if let TypeRef::Inline(inline) = member {
                    check_resolved(inline, graph, &format!("{}/type/{}", path, idx), diagnostics);
                }
            }
        }
        ResolvedKind::Ref(_) | ResolvedKind::Primitive(_) | ResolvedKind::Any => {}
    }

    if let Some(ResolvedAdditional::Schema(schema)) = &ty.additional {
        check_resolved(
            schema,
            graph,
            &format!("{}/additionalProperties", path),
            diagnostics,
        );
    }
}

fn check_choice(
    ty: &ResolvedType,
    shape: &ChoiceShape,
    graph: &ResolvedGraph,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ChoiceShape::Inline {
        base, choices, ..
    } = shape
    else {
        return;
    };

    let Some(base) = base else {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::ChoiceMissingBase,
            path,
            format!(
                "inline choice '{}' declares a selector but no $extends base",
                ty.name
            ),
        ));
        return;
    };

    if !graph.get(base).is_some_and(|b| b.is_abstract) {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::ChoiceBaseNotAbstract,
            path,
            format!("inline choice base '{}' must be an abstract type", base),
        ));
    }

    for (variant, ty_ref) in choices {
        let derived = match ty_ref {
            TypeRef::Named(name) => graph.derives_from(name, base),
            TypeRef::Inline(inline) => inline
                .bases
                .iter()
                .any(|b| b == base || graph.derives_from(b, base)),
        };
        if !derived {
            diagnostics.push(Diagnostic::error(
                DiagnosticKind::ChoiceVariantNotDerived,
                format!("{}/choices/{}", path, variant),
                format!("choice variant '{}' does not extend '{}'", variant, base),
            ));
        }
    }
}
