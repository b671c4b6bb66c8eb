//! Instance validation - checks JSON documents against a resolved type graph.
//!
//! Validation accumulates diagnostics: a failed check records its finding
//! and stops descending into that value, but siblings are still examined.
//! Paths in diagnostics are JSON pointers into the instance document.

use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::resolver::{
    ChoiceShape, PropertyDef, ResolvedAdditional, ResolvedGraph, ResolvedKind, ResolvedType,
    TypeRef,
};
use crate::types::{
    json_type_name, Primitive, ABSOLUTE_URI_REGEX, DATETIME_REGEX, DATE_REGEX, DURATION_REGEX,
    JSONPOINTER_REGEX, MAP_KEY_REGEX, MAX_DEPTH, TIME_REGEX, UUID_REGEX,
};

/// Validate an instance against the graph's root type.
pub fn validate(instance: &Value, graph: &ResolvedGraph) -> Vec<Diagnostic> {
    let mut checker = Checker {
        graph,
        diagnostics: Vec::new(),
    };
    match graph.root_type() {
        Some(ty) => {
            let ty = ty.clone();
            checker.check_type(instance, &ty, "", 0);
        }
        None => checker.diagnostics.push(Diagnostic::error(
            DiagnosticKind::InvalidSchemaDocument,
            "",
            "schema declares no root type to validate against",
        )),
    }
    checker.diagnostics
}

struct Checker<'a> {
    graph: &'a ResolvedGraph,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn error(&mut self, kind: DiagnosticKind, path: &str, message: String) {
        self.diagnostics.push(Diagnostic::error(kind, path, message));
    }

    fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    fn check_ref(&mut self, value: &Value, ty_ref: &TypeRef, path: &str, depth: usize) {
        match ty_ref {
            TypeRef::Named(name) => {
                // Resolution guarantees named references exist.
                if let Some(ty) = self.graph.get(name) {
                    let ty = ty.clone();
                    self.check_type(value, &ty, path, depth);
                }
            }
            TypeRef::Inline(ty) => self.check_type(value, ty, path, depth),
        }
    }

    /// True if `value` satisfies `ty_ref` without producing any errors.
    fn matches(&self, value: &Value, ty_ref: &TypeRef, depth: usize) -> bool {
        let mut probe = Checker {
            graph: self.graph,
            diagnostics: Vec::new(),
        };
        probe.check_ref(value, ty_ref, "", depth);
        probe.error_count() == 0
    }

    fn check_type(&mut self, value: &Value, ty: &ResolvedType, path: &str, depth: usize) {
        if depth > MAX_DEPTH {
            self.error(
                DiagnosticKind::MaxDepthExceeded,
                path,
                "maximum validation depth exceeded".into(),
            );
            return;
        }

        let before = self.error_count();
        match &ty.kind {
            ResolvedKind::Ref(target) => {
                if let Some(target) = self.graph.get(target) {
                    let target = target.clone();
                    self.check_type(value, &target, path, depth + 1);
                }
            }
            ResolvedKind::Any => {}
            ResolvedKind::Primitive(p) => self.check_primitive(value, *p, ty, path),
            ResolvedKind::Union(members) => {
                if !members.iter().any(|m| self.matches(value, m, depth + 1)) {
                    self.error(
                        DiagnosticKind::NoUnionVariantMatched,
                        path,
                        format!("{} does not match any union member", json_type_name(value)),
                    );
                }
            }
            ResolvedKind::Object { properties } => {
                self.check_object(value, ty, properties, path, depth)
            }
            ResolvedKind::Array { items } => {
                let Some(elements) = value.as_array() else {
                    self.type_mismatch(path, "array", value);
                    return;
                };
                for (idx, element) in elements.iter().enumerate() {
                    self.check_ref(element, items, &format!("{}/{}", path, idx), depth + 1);
                }
            }
            ResolvedKind::Set { items } => self.check_set(value, items, path, depth),
            ResolvedKind::Map { values } => self.check_map(value, values, path, depth),
            ResolvedKind::Tuple { properties, order } => {
                self.check_tuple(value, properties, order, path, depth)
            }
            ResolvedKind::Choice(shape) => self.check_choice(value, shape, path, depth),
        }

        // Representation failures make enum/const checks meaningless.
        if self.error_count() > before {
            return;
        }

        if let Some(enum_values) = &ty.enum_values {
            if !enum_values.contains(value) {
                self.error(
                    DiagnosticKind::NotInEnum,
                    path,
                    format!("value is not one of the {} enum entries", enum_values.len()),
                );
            }
        }
        if let Some(const_value) = &ty.const_value {
            if value != const_value {
                self.error(
                    DiagnosticKind::ConstMismatch,
                    path,
                    "value does not equal the declared const".into(),
                );
            }
        }
    }

    fn type_mismatch(&mut self, path: &str, expected: &str, value: &Value) {
        self.error(
            DiagnosticKind::TypeMismatch,
            path,
            format!("expected {}, got {}", expected, json_type_name(value)),
        );
    }

    fn check_object(
        &mut self,
        value: &Value,
        ty: &ResolvedType,
        properties: &indexmap::IndexMap<String, PropertyDef>,
        path: &str,
        depth: usize,
    ) {
        let Some(map) = value.as_object() else {
            self.type_mismatch(path, "object", value);
            return;
        };

        for name in &ty.required {
            if !map.contains_key(name) {
                self.error(
                    DiagnosticKind::MissingRequiredProperty,
                    &format!("{}/{}", path, name),
                    format!("missing required property '{}'", name),
                );
            }
        }

        for (key, entry) in map {
            let entry_path = format!("{}/{}", path, key);
            if let Some(def) = properties.get(key) {
                self.check_ref(entry, &def.ty, &entry_path, depth + 1);
                continue;
            }
            match &ty.additional {
                Some(ResolvedAdditional::Allowed(true)) => {}
                Some(ResolvedAdditional::Schema(schema)) => {
                    let schema = (**schema).clone();
                    self.check_type(entry, &schema, &entry_path, depth + 1);
                }
                // Undeclared properties are rejected unless explicitly opened up.
                Some(ResolvedAdditional::Allowed(false)) | None => {
                    self.error(
                        DiagnosticKind::UnexpectedProperty,
                        &entry_path,
                        format!("property '{}' is not declared by the schema", key),
                    );
                }
            }
        }
    }

    fn check_set(&mut self, value: &Value, items: &TypeRef, path: &str, depth: usize) {
        let Some(elements) = value.as_array() else {
            self.type_mismatch(path, "set", value);
            return;
        };
        let mut seen = std::collections::HashSet::new();
        for (idx, element) in elements.iter().enumerate() {
            let element_path = format!("{}/{}", path, idx);
            if !seen.insert(canonical(element)) {
                self.error(
                    DiagnosticKind::DuplicateSetElement,
                    &element_path,
                    "duplicate element in set".into(),
                );
            }
            self.check_ref(element, items, &element_path, depth + 1);
        }
    }

    fn check_map(&mut self, value: &Value, values: &TypeRef, path: &str, depth: usize) {
        let Some(map) = value.as_object() else {
            self.type_mismatch(path, "map", value);
            return;
        };
        for (key, entry) in map {
            let entry_path = format!("{}/{}", path, key);
            if !MAP_KEY_REGEX.is_match(key) {
                self.error(
                    DiagnosticKind::InvalidMapKey,
                    &entry_path,
                    format!("map key \"{}\" contains characters outside [A-Za-z0-9._:-]", key),
                );
            }
            self.check_ref(entry, values, &entry_path, depth + 1);
        }
    }

    fn check_tuple(
        &mut self,
        value: &Value,
        properties: &indexmap::IndexMap<String, TypeRef>,
        order: &[String],
        path: &str,
        depth: usize,
    ) {
        let Some(elements) = value.as_array() else {
            self.type_mismatch(path, "tuple", value);
            return;
        };
        if elements.len() != order.len() {
            self.error(
                DiagnosticKind::TupleArityMismatch,
                path,
                format!("expected {} elements, got {}", order.len(), elements.len()),
            );
            return;
        }
        for (idx, (element, name)) in elements.iter().zip(order).enumerate() {
            if let Some(element_ty) = properties.get(name) {
                self.check_ref(element, element_ty, &format!("{}/{}", path, idx), depth + 1);
            }
        }
    }

    fn check_choice(&mut self, value: &Value, shape: &ChoiceShape, path: &str, depth: usize) {
        match shape {
            ChoiceShape::Tagged { choices } => {
                let Some(map) = value.as_object() else {
                    self.type_mismatch(path, "choice object", value);
                    return;
                };
                if map.len() != 1 {
                    self.error(
                        DiagnosticKind::AmbiguousChoice,
                        path,
                        format!("choice instance must have exactly one key, got {}", map.len()),
                    );
                    return;
                }
                let (key, inner) = map.iter().next().unwrap();
                let Some(variant) = choices.get(key) else {
                    self.error(
                        DiagnosticKind::UnknownChoiceKey,
                        &format!("{}/{}", path, key),
                        format!("\"{}\" is not a declared choice", key),
                    );
                    return;
                };
                self.check_ref(inner, variant, &format!("{}/{}", path, key), depth + 1);
            }
            ChoiceShape::Inline {
                selector, choices, ..
            } => {
                let Some(map) = value.as_object() else {
                    self.type_mismatch(path, "choice object", value);
                    return;
                };
                let Some(selected) = map.get(selector) else {
                    self.error(
                        DiagnosticKind::MissingRequiredProperty,
                        &format!("{}/{}", path, selector),
                        format!("missing selector property '{}'", selector),
                    );
                    return;
                };
                let Some(selected) = selected.as_str() else {
                    self.type_mismatch(&format!("{}/{}", path, selector), "string", selected);
                    return;
                };
                let Some(variant) = choices.get(selected) else {
                    self.error(
                        DiagnosticKind::UnknownDiscriminatorValue,
                        &format!("{}/{}", path, selector),
                        format!("\"{}\" does not select a declared choice", selected),
                    );
                    return;
                };
                // The selector is part of the envelope, not the variant shape.
                let mut body = map.clone();
                body.remove(selector);
                self.check_ref(&Value::Object(body), variant, path, depth + 1);
            }
        }
    }

    fn check_primitive(&mut self, value: &Value, p: Primitive, ty: &ResolvedType, path: &str) {
        match p {
            Primitive::String => {
                if !value.is_string() {
                    self.type_mismatch(path, "string", value);
                }
            }
            Primitive::Boolean => {
                if !value.is_boolean() {
                    self.type_mismatch(path, "boolean", value);
                }
            }
            Primitive::Null => {
                if !value.is_null() {
                    self.type_mismatch(path, "null", value);
                }
            }
            Primitive::Number | Primitive::Float8 | Primitive::Float | Primitive::Double => {
                if !value.is_number() {
                    self.type_mismatch(path, p.as_str(), value);
                }
            }
            Primitive::Int8 => self.check_small_int(value, path, "int8", -128, 127),
            Primitive::Uint8 => self.check_small_int(value, path, "uint8", 0, 255),
            Primitive::Int16 => self.check_small_int(value, path, "int16", -32768, 32767),
            Primitive::Uint16 => self.check_small_int(value, path, "uint16", 0, 65535),
            Primitive::Int32 => {
                self.check_small_int(value, path, "int32", i64::from(i32::MIN), i64::from(i32::MAX))
            }
            Primitive::Uint32 => {
                self.check_small_int(value, path, "uint32", 0, i64::from(u32::MAX))
            }
            // Wide integers are carried as strings to survive JSON parsers
            // that round to double.
            Primitive::Int64 => self.check_string_int(value, path, "int64", |s| {
                s.parse::<i64>().is_ok()
            }),
            Primitive::Uint64 => self.check_string_int(value, path, "uint64", |s| {
                s.parse::<u64>().is_ok()
            }),
            Primitive::Int128 => self.check_string_int(value, path, "int128", |s| {
                s.parse::<i128>().is_ok()
            }),
            Primitive::Uint128 => self.check_string_int(value, path, "uint128", |s| {
                s.parse::<u128>().is_ok()
            }),
            Primitive::Decimal => self.check_decimal(value, ty, path),
            Primitive::Date => self.check_lexical(value, path, "date", &DATE_REGEX),
            Primitive::Datetime => self.check_lexical(value, path, "datetime", &DATETIME_REGEX),
            Primitive::Time => self.check_lexical(value, path, "time", &TIME_REGEX),
            Primitive::Duration => {
                let ok = value.as_str().is_some_and(|s| {
                    DURATION_REGEX.is_match(s) && s != "P" && s != "-P" && !s.ends_with('T')
                });
                if !ok {
                    self.type_mismatch(path, "duration", value);
                }
            }
            Primitive::Uuid => self.check_lexical(value, path, "uuid", &UUID_REGEX),
            Primitive::Uri => {
                if !value.as_str().is_some_and(|s| ABSOLUTE_URI_REGEX.is_match(s)) {
                    self.type_mismatch(path, "uri", value);
                }
            }
            Primitive::Jsonpointer => {
                self.check_lexical(value, path, "jsonpointer", &JSONPOINTER_REGEX)
            }
            Primitive::Binary => {
                if !value.is_string() {
                    self.type_mismatch(path, "binary", value);
                }
            }
        }
    }

    fn check_small_int(&mut self, value: &Value, path: &str, name: &str, min: i64, max: i64) {
        let in_range = value
            .as_i64()
            .map(|n| n >= min && n <= max)
            .unwrap_or(false);
        if !in_range {
            self.error(
                DiagnosticKind::TypeMismatch,
                path,
                format!("expected {} in [{}, {}]", name, min, max),
            );
        }
    }

    fn check_string_int(
        &mut self,
        value: &Value,
        path: &str,
        name: &str,
        parses: impl Fn(&str) -> bool,
    ) {
        if !value.as_str().is_some_and(parses) {
            self.error(
                DiagnosticKind::TypeMismatch,
                path,
                format!("expected {} as a decimal string", name),
            );
        }
    }

    fn check_lexical(
        &mut self,
        value: &Value,
        path: &str,
        name: &str,
        pattern: &once_cell::sync::Lazy<regex::Regex>,
    ) {
        if !value.as_str().is_some_and(|s| pattern.is_match(s)) {
            self.type_mismatch(path, name, value);
        }
    }

    fn check_decimal(&mut self, value: &Value, ty: &ResolvedType, path: &str) {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                self.type_mismatch(path, "decimal", other);
                return;
            }
        };
        let Some((precision, scale)) = decimal_digits(&text) else {
            self.error(
                DiagnosticKind::TypeMismatch,
                path,
                format!("\"{}\" is not a valid decimal", text),
            );
            return;
        };
        if let Some(max_precision) = ty.precision {
            if precision > max_precision {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    path,
                    format!("decimal has {} significant digits, precision is {}", precision, max_precision),
                );
            }
        }
        if let Some(max_scale) = ty.scale {
            if scale > max_scale {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    path,
                    format!("decimal has {} fractional digits, scale is {}", scale, max_scale),
                );
            }
        }
    }
}

/// Significant and fractional digit counts of a decimal literal, after
/// dropping the sign, the exponent and trailing fractional zeros.
fn decimal_digits(text: &str) -> Option<(u32, u32)> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mantissa = unsigned.split(['e', 'E']).next().unwrap_or("");
    if let Some(exponent) = unsigned.split(['e', 'E']).nth(1) {
        let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exponent.is_empty() || !exponent.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let frac = frac_part.trim_end_matches('0');
    let int_trimmed = int_part.trim_start_matches('0');
    let significant = if int_trimmed.is_empty() {
        frac.trim_start_matches('0').len().max(1)
    } else {
        int_trimmed.len() + frac.len()
    };
    Some((significant as u32, frac.len() as u32))
}

/// Canonical serialization for set-element identity: object keys sorted,
/// everything else in JSON form.
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let mut out = String::from("{");
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                out.push_str(&canonical(&map[*key]));
            }
            out.push('}');
            out
        }
        Value::Array(items) => {
            let mut out = String::from("[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&canonical(item));
            }
            out.push(']');
            out
        }
        other => other.to_string(),
    }
}
