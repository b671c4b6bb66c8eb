//! Diagnostic records produced by schema and instance validation.
//!
//! Validation accumulates diagnostics instead of stopping at the first
//! problem, so one run surfaces as many defects as possible. Each record
//! carries a machine-readable kind, a JSON-pointer path and a
//! human-readable message.

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Machine-readable diagnostic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    // Schema validation
    UnknownRequiredProperty,
    RequiredOnNonObject,
    AdditionalPropertiesOnNonObject,
    TupleOrderMismatch,
    ChoiceBaseNotAbstract,
    ChoiceMissingBase,
    ChoiceVariantNotDerived,
    EnumOnCompoundType,
    ConstOnCompoundType,
    ExtendsNonObject,
    FeatureNotActivated,
    UnknownExtension,
    MissingSchemaUri,
    MissingId,
    InvalidSchemaDocument,

    // Instance validation
    TypeMismatch,
    MissingRequiredProperty,
    UnexpectedProperty,
    DuplicateSetElement,
    InvalidMapKey,
    TupleArityMismatch,
    AmbiguousChoice,
    UnknownChoiceKey,
    UnknownDiscriminatorValue,
    NoUnionVariantMatched,
    NotInEnum,
    ConstMismatch,
    MaxDepthExceeded,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownRequiredProperty => "UnknownRequiredProperty",
            DiagnosticKind::RequiredOnNonObject => "RequiredOnNonObject",
            DiagnosticKind::AdditionalPropertiesOnNonObject => "AdditionalPropertiesOnNonObject",
            DiagnosticKind::TupleOrderMismatch => "TupleOrderMismatch",
            DiagnosticKind::ChoiceBaseNotAbstract => "ChoiceBaseNotAbstract",
            DiagnosticKind::ChoiceMissingBase => "ChoiceMissingBase",
            DiagnosticKind::ChoiceVariantNotDerived => "ChoiceVariantNotDerived",
            DiagnosticKind::EnumOnCompoundType => "EnumOnCompoundType",
            DiagnosticKind::ConstOnCompoundType => "ConstOnCompoundType",
            DiagnosticKind::ExtendsNonObject => "ExtendsNonObject",
            DiagnosticKind::FeatureNotActivated => "FeatureNotActivated",
            DiagnosticKind::UnknownExtension => "UnknownExtension",
            DiagnosticKind::MissingSchemaUri => "MissingSchemaUri",
            DiagnosticKind::MissingId => "MissingId",
            DiagnosticKind::InvalidSchemaDocument => "InvalidSchemaDocument",
            DiagnosticKind::TypeMismatch => "TypeMismatch",
            DiagnosticKind::MissingRequiredProperty => "MissingRequiredProperty",
            DiagnosticKind::UnexpectedProperty => "UnexpectedProperty",
            DiagnosticKind::DuplicateSetElement => "DuplicateSetElement",
            DiagnosticKind::InvalidMapKey => "InvalidMapKey",
            DiagnosticKind::TupleArityMismatch => "TupleArityMismatch",
            DiagnosticKind::AmbiguousChoice => "AmbiguousChoice",
            DiagnosticKind::UnknownChoiceKey => "UnknownChoiceKey",
            DiagnosticKind::UnknownDiscriminatorValue => "UnknownDiscriminatorValue",
            DiagnosticKind::NoUnionVariantMatched => "NoUnionVariantMatched",
            DiagnosticKind::NotInEnum => "NotInEnum",
            DiagnosticKind::ConstMismatch => "ConstMismatch",
            DiagnosticKind::MaxDepthExceeded => "MaxDepthExceeded",
        }
    }
}

/// A single validation finding with path context.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// JSON Pointer to the offending location (`""` for the document root).
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "[{}] {}: {}", self.kind.as_str(), path, self.message)
    }
}

/// True if any diagnostic in the slice has error severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}
