//! Error and result types for the mapping layer.
//!
//! Failures are grouped along the lifecycle of a model: [`DefinitionError`]
//! for invalid model declarations (raised once, when a descriptor is built),
//! [`CoercionError`] for per-value wire conversions, [`ParsingError`] for
//! whole-document parsing, and [`QueryError`] for invalid query
//! construction. [`MappingError`] is the umbrella type returned by the
//! fallible entry points; use [`MappingResult<T>`] as the return type of
//! operations that may fail for more than one of these reasons.
//!
//! All failures are local and synchronous: nothing is retried or suppressed
//! by this crate.

use std::convert::Infallible;
use std::fmt;

use bson::Document;
use thiserror::Error;

/// An invalid model declaration, reported when a descriptor is built.
///
/// These are programming errors in the model definition itself and are
/// raised before any instance is constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Two fields are both declared as the primary field.
    #[error("{model}: fields '{first}' and '{second}' are both declared primary")]
    DuplicatePrimaryField {
        model: &'static str,
        first: String,
        second: String,
    },
    /// No primary field was declared, but a field named `id` already exists
    /// so an implicit one cannot be generated.
    #[error("{model}: cannot generate an implicit primary field, an 'id' field already exists")]
    ImplicitIdCollision { model: &'static str },
    /// Two fields resolve to the same wire key.
    #[error("{model}: duplicated wire key '{key_name}'")]
    DuplicateKeyName {
        model: &'static str,
        key_name: String,
    },
    /// A non-primary field claims the reserved `_id` wire key.
    #[error("{model}: field '{field}' cannot use the reserved '_id' wire key without being declared primary")]
    ReservedKeyName {
        model: &'static str,
        field: &'static str,
    },
    /// A primary field declares a custom wire key; `_id` is enforced.
    #[error("{model}: primary field '{field}' cannot use a custom wire key, '_id' is enforced")]
    PrimaryKeyRenamed {
        model: &'static str,
        field: &'static str,
    },
    /// A wire key violates the store's naming restrictions.
    #[error("{model}: invalid wire key '{key_name}': {reason}")]
    InvalidKeyName {
        model: &'static str,
        key_name: String,
        reason: &'static str,
    },
    /// The derived or configured collection name is not storable.
    #[error("invalid collection name for {model}: {reason}")]
    InvalidCollectionName {
        model: &'static str,
        reason: &'static str,
    },
    /// The field's declared type cannot be mapped to a document.
    #[error("{model}: field '{field}' has an unsupported type: {reason}")]
    UnsupportedFieldType {
        model: &'static str,
        field: &'static str,
        reason: &'static str,
    },
    /// A field declares both a literal default and a default factory.
    #[error("{model}: field '{field}' declares both a default and a default factory")]
    ConflictingDefaults {
        model: &'static str,
        field: &'static str,
    },
    /// Embedded models cannot carry a primary field.
    #[error("{model}: cannot declare a primary field in an embedded model")]
    PrimaryFieldInEmbedded { model: &'static str },
    /// Two declared indexes share a name.
    #[error("{model}: duplicated index name '{name}'")]
    IndexNameCollision { model: &'static str, name: String },
    /// An explicit index declaration names an attribute path that does not
    /// resolve against the model's fields.
    #[error("{model}: index references unknown field path '{path}'")]
    UnknownIndexField { model: &'static str, path: String },
}

/// A single value could not be converted to or from its wire type.
///
/// `path` is the dotted attribute path of the offending value relative to
/// the root model (container elements are reported as `items[3]`, map
/// entries as `counts.west`).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot coerce value at '{path}': {kind}")]
pub struct CoercionError {
    pub path: String,
    pub kind: CoercionErrorKind,
}

impl CoercionError {
    pub fn new(path: impl Into<String>, kind: CoercionErrorKind) -> Self {
        Self { path: path.into(), kind }
    }
}

/// The reason a scalar coercion failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionErrorKind {
    /// The wire value has a different type than the field declares.
    #[error("expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// A string does not parse as a 24-character hex object id.
    #[error("malformed object id '{value}'")]
    MalformedObjectId { value: String },
    /// A string does not parse as a hyphenated UUID.
    #[error("malformed uuid '{value}'")]
    MalformedUuid { value: String },
    /// A string does not parse as a fixed-point decimal.
    #[error("malformed decimal '{value}'")]
    MalformedDecimal { value: String },
    /// A string does not parse as an RFC 3339 timestamp.
    #[error("malformed timestamp '{value}'")]
    MalformedTimestamp { value: String },
    /// The store does not keep timezone information; only UTC-equivalent
    /// timestamps are accepted.
    #[error("timestamps must be UTC (naive or zero offset)")]
    NonUtcTimestamp,
    /// A registered custom scalar rejected the value.
    #[error("{0}")]
    Custom(String),
}

/// One problem encountered while parsing a raw document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsingIssue {
    /// Dotted attribute path of the field that failed.
    pub path: String,
    /// The wire key the value was looked up under.
    pub key: String,
    pub kind: ParsingIssueKind,
}

impl fmt::Display for ParsingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else if self.key.is_empty() {
            write!(f, "{}: {}", self.path, self.kind)
        } else {
            write!(f, "{} (wire key '{}'): {}", self.path, self.key, self.kind)
        }
    }
}

/// The reason a field of a raw document could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingIssueKind {
    /// A required wire key is absent from the document.
    #[error("key not found in document")]
    MissingKey,
    /// The joined document for a reference field is absent.
    #[error("referenced document not found")]
    MissingReference,
    /// A nested value does not have the structure the field declares.
    #[error("malformed value, expected {expected}")]
    MalformedStructure { expected: &'static str },
    /// The wire value failed scalar coercion.
    #[error(transparent)]
    Coercion(CoercionErrorKind),
    /// The document carries a key the model does not declare and the model
    /// forbids extra keys.
    #[error("undeclared key")]
    UndeclaredKey,
    /// The normalized document was rejected by the model's deserializer.
    #[error("{0}")]
    Deserialize(String),
}

/// A raw document could not be parsed into a model instance.
///
/// Carries every issue found in one pass plus a redacted snapshot of the
/// offending document: the identifier value and the key names only, field
/// values are never reproduced.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse document into {model}: {} [document: {snapshot}]", render_issues(.issues))]
pub struct ParsingError {
    pub model: &'static str,
    pub issues: Vec<ParsingIssue>,
    pub snapshot: String,
}

impl ParsingError {
    pub(crate) fn new(model: &'static str, raw: &Document, issues: Vec<ParsingIssue>) -> Self {
        Self { model, issues, snapshot: redacted_snapshot(raw) }
    }
}

fn render_issues(issues: &[ParsingIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A key-names-only view of a raw document, keeping the identifier value
/// for correlation but eliding every other field value.
fn redacted_snapshot(raw: &Document) -> String {
    let id = raw
        .get("_id")
        .map_or_else(|| "<missing>".to_string(), ToString::to_string);
    let keys = raw.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
    format!("{{_id: {id}, keys: [{keys}]}}")
}

/// An invalid query construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The operator is not defined for the field's kind.
    #[error("operator '{operator}' is not allowed for {kind} fields")]
    OperatorNotAllowed {
        operator: &'static str,
        kind: &'static str,
    },
    /// Attribute traversal into a referenced model was attempted.
    /// References are stored as foreign keys and are not joined at
    /// query-build time.
    #[error("filtering across references is not supported")]
    ReferenceTraversal,
    /// The attribute is not declared by the model.
    #[error("attribute '{attribute}' not found in {model}")]
    UnknownAttribute {
        model: &'static str,
        attribute: String,
    },
    /// Attribute traversal was attempted through a field that is not an
    /// embedded document.
    #[error("attribute '{attribute}' of {model} is not an embedded document")]
    NotEmbedded {
        model: &'static str,
        attribute: String,
    },
}

/// Represents all possible errors produced by the mapping layer.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Serialization error while converting an instance to or from BSON or
    /// JSON.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

impl From<bson::error::Error> for MappingError {
    fn from(err: bson::error::Error) -> Self {
        MappingError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        MappingError::Serialization(err.to_string())
    }
}

impl From<Infallible> for MappingError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}
