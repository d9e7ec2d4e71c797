//! Model traits and the document codec.
//!
//! [`Model`] is the trait a serde struct implements to participate in the
//! mapping layer: it binds the struct to its registered
//! [`ModelDescriptor`]. The codec then converts between instances and the
//! store's wire documents:
//!
//! - [`to_document`] walks the field descriptors in declaration order,
//!   renames attributes to their wire keys, expands embedded sub-documents,
//!   collapses reference fields to the referenced instance's primary key
//!   and runs the scalar codec on every leaf value;
//! - [`from_document`] reverses the walk, resolving defaults, validating
//!   required keys and accumulating every problem into one structured
//!   [`ParsingError`].
//!
//! # Example
//!
//! ```ignore
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: ObjectId,
//!     pub name: String,
//! }
//!
//! static USER: LazyLock<ModelDescriptor> = LazyLock::new(|| {
//!     ModelDescriptor::builder("User")
//!         .field(FieldDescriptor::new("name", FieldType::String).index())
//!         .build()
//!         .expect("invalid User model")
//! });
//!
//! impl Model for User {
//!     fn descriptor() -> &'static ModelDescriptor {
//!         &USER
//!     }
//! }
//!
//! let doc = user.to_document()?;
//! let back = User::from_document(&doc)?;
//! assert_eq!(user, back);
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{
        CoercionError, CoercionErrorKind, MappingError, MappingResult, ParsingError,
        ParsingIssue, ParsingIssueKind,
    },
    field::{ExtraPolicy, FieldDescriptor, FieldType, ModelDescriptor},
    scalar,
};

/// A declared model: a serde struct bound to its registered descriptor.
///
/// The descriptor is built once (see [`ModelDescriptor::builder`]) and
/// held in a `static`; the struct's field names must match the descriptor's
/// attribute names. Models without an explicitly declared primary field
/// must carry an `id: ObjectId` attribute, which the builder binds to the
/// reserved `_id` wire key.
pub trait Model:
    Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static
{
    /// Returns the model's registered descriptor.
    fn descriptor() -> &'static ModelDescriptor;
}

/// Extension trait providing codec entry points on every [`Model`].
pub trait ModelExt: Model {
    /// Serializes this instance into its wire document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or a scalar coercion fails.
    fn to_document(&self) -> MappingResult<Document>;

    /// Parses a raw wire document into an instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ParsingError`] listing every missing key, malformed
    /// nested structure and failed coercion.
    fn from_document(raw: &Document) -> Result<Self, ParsingError>;

    /// Converts this instance to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> MappingResult<Value>;

    /// Creates an instance from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    fn from_json(value: Value) -> MappingResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> MappingResult<Document> {
        to_document(self)
    }

    fn from_document(raw: &Document) -> Result<Self, ParsingError> {
        from_document(raw)
    }

    fn to_json(&self) -> MappingResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_json(value: Value) -> MappingResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// The storage collection name of a model; `None` for embedded models.
pub fn collection_name<M: Model>() -> Option<&'static str> {
    M::descriptor().collection_name()
}

/// The model's field descriptors, in declaration order.
pub fn field_metadata<M: Model>() -> &'static [FieldDescriptor] {
    M::descriptor().fields()
}

/// Serializes a model instance into its wire document.
///
/// Fields are emitted in declaration order under their wire keys; the
/// primary key always serializes under the reserved `_id` key regardless
/// of its attribute name. Reference fields serialize as the referenced
/// instance's primary key only; persisting the referenced instance
/// itself is the engine's responsibility.
pub fn to_document<M: Model>(instance: &M) -> MappingResult<Document> {
    let descriptor = M::descriptor();
    let serialized = serialize_to_bson(instance)?;
    let Bson::Document(named) = serialized else {
        return Err(MappingError::Serialization(
            "model instance did not serialize to a document".to_string(),
        ));
    };
    Ok(encode_document(descriptor, &named, "")?)
}

/// Parses a raw wire document into a model instance.
///
/// Reference fields expect the referenced document to be joined in full
/// under the foreign-key field by the persistence engine before parsing.
pub fn from_document<M: Model>(raw: &Document) -> Result<M, ParsingError> {
    let descriptor = M::descriptor();
    let mut issues = Vec::new();
    let named = decode_document(descriptor, raw, "", &mut issues);
    if !issues.is_empty() {
        return Err(ParsingError::new(descriptor.model_name(), raw, issues));
    }
    deserialize_from_bson(Bson::Document(named)).map_err(|err| {
        ParsingError::new(
            descriptor.model_name(),
            raw,
            vec![ParsingIssue {
                path: String::new(),
                key: String::new(),
                kind: ParsingIssueKind::Deserialize(err.to_string()),
            }],
        )
    })
}

fn encode_document(
    descriptor: &ModelDescriptor,
    named: &Document,
    path: &str,
) -> Result<Document, CoercionError> {
    let mut doc = Document::new();
    for field in descriptor.fields() {
        let loc = join_path(path, field.name());
        let value = match named.get(field.name()) {
            Some(value) => value.clone(),
            // Attributes skipped by the serializer are only meaningful
            // for optional fields.
            None if matches!(field.field_type(), FieldType::Optional(_)) => Bson::Null,
            None => {
                return Err(CoercionError::new(
                    loc,
                    CoercionErrorKind::Custom(
                        "attribute missing from serialized instance".to_string(),
                    ),
                ));
            }
        };
        doc.insert(field.wire_key(), encode_value(field.field_type(), &value, &loc)?);
    }
    if descriptor.config().extra == ExtraPolicy::Allow {
        for (key, value) in named {
            if descriptor.field(key).is_none() {
                doc.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(doc)
}

fn encode_value(ty: &FieldType, value: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match ty {
        FieldType::Embedded(target) => {
            let named = expect_document(value, path)?;
            Ok(Bson::Document(encode_document(target(), named, path)?))
        }
        FieldType::Reference(target) => {
            let named = expect_document(value, path)?;
            let descriptor = target();
            let primary = descriptor.primary_field().ok_or_else(|| {
                CoercionError::new(
                    path,
                    CoercionErrorKind::Custom(format!(
                        "referenced model {} has no primary field",
                        descriptor.model_name()
                    )),
                )
            })?;
            let key_loc = join_path(path, primary.name());
            let raw = named.get(primary.name()).ok_or_else(|| {
                CoercionError::new(
                    &key_loc,
                    CoercionErrorKind::Custom(
                        "attribute missing from serialized instance".to_string(),
                    ),
                )
            })?;
            scalar::to_wire(primary.field_type(), raw, &key_loc)
        }
        FieldType::Optional(inner) => match value {
            Bson::Null => Ok(Bson::Null),
            other => encode_value(inner, other, path),
        },
        FieldType::Array(inner) => match value {
            Bson::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| encode_value(inner, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            other => Err(type_mismatch(path, "array", other)),
        },
        FieldType::Map(inner) => match value {
            Bson::Document(entries) => {
                let mut out = Document::new();
                for (key, item) in entries {
                    out.insert(key.clone(), encode_value(inner, item, &format!("{path}.{key}"))?);
                }
                Ok(Bson::Document(out))
            }
            other => Err(type_mismatch(path, "document", other)),
        },
        scalar_type => scalar::to_wire(scalar_type, value, path),
    }
}

fn decode_document(
    descriptor: &ModelDescriptor,
    raw: &Document,
    path: &str,
    issues: &mut Vec<ParsingIssue>,
) -> Document {
    let mut named = Document::new();
    for field in descriptor.fields() {
        let loc = join_path(path, field.name());
        if let FieldType::Reference(target) = field.field_type() {
            match raw.get(field.wire_key()) {
                Some(Bson::Document(sub)) => {
                    let decoded = decode_document(target(), sub, &loc, issues);
                    named.insert(field.name(), decoded);
                }
                Some(Bson::Null) | None => issues.push(ParsingIssue {
                    path: loc,
                    key: field.wire_key().to_string(),
                    kind: ParsingIssueKind::MissingReference,
                }),
                Some(_) => issues.push(ParsingIssue {
                    path: loc,
                    key: field.wire_key().to_string(),
                    kind: ParsingIssueKind::MalformedStructure { expected: "document" },
                }),
            }
            continue;
        }

        match raw.get(field.wire_key()) {
            Some(value) => {
                if let Some(decoded) =
                    decode_value(field.field_type(), value, &loc, field.wire_key(), issues)
                {
                    named.insert(field.name(), decoded);
                }
            }
            None => match field.default_for_parsing(descriptor.config()) {
                Some(default) => {
                    named.insert(field.name(), default);
                }
                None => issues.push(ParsingIssue {
                    path: loc,
                    key: field.wire_key().to_string(),
                    kind: ParsingIssueKind::MissingKey,
                }),
            },
        }
    }

    match descriptor.config().extra {
        ExtraPolicy::Ignore => {}
        ExtraPolicy::Allow => {
            for (key, value) in raw {
                if descriptor.field_with_key(key).is_none() {
                    named.insert(key.clone(), value.clone());
                }
            }
        }
        ExtraPolicy::Forbid => {
            for key in raw.keys() {
                if descriptor.field_with_key(key).is_none() {
                    issues.push(ParsingIssue {
                        path: join_path(path, key),
                        key: key.clone(),
                        kind: ParsingIssueKind::UndeclaredKey,
                    });
                }
            }
        }
    }
    named
}

fn decode_value(
    ty: &FieldType,
    value: &Bson,
    path: &str,
    key: &str,
    issues: &mut Vec<ParsingIssue>,
) -> Option<Bson> {
    match ty {
        FieldType::Embedded(target) | FieldType::Reference(target) => match value {
            Bson::Document(sub) => {
                Some(Bson::Document(decode_document(target(), sub, path, issues)))
            }
            _ => {
                issues.push(ParsingIssue {
                    path: path.to_string(),
                    key: key.to_string(),
                    kind: ParsingIssueKind::MalformedStructure { expected: "document" },
                });
                None
            }
        },
        FieldType::Optional(inner) => match value {
            Bson::Null => Some(Bson::Null),
            other => decode_value(inner, other, path, key, issues),
        },
        FieldType::Array(inner) => match value {
            Bson::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if let Some(decoded) =
                        decode_value(inner, item, &format!("{path}[{i}]"), key, issues)
                    {
                        out.push(decoded);
                    }
                }
                Some(Bson::Array(out))
            }
            _ => {
                issues.push(ParsingIssue {
                    path: path.to_string(),
                    key: key.to_string(),
                    kind: ParsingIssueKind::MalformedStructure { expected: "array" },
                });
                None
            }
        },
        FieldType::Map(inner) => match value {
            Bson::Document(entries) => {
                let mut out = Document::new();
                for (entry_key, item) in entries {
                    if let Some(decoded) =
                        decode_value(inner, item, &format!("{path}.{entry_key}"), key, issues)
                    {
                        out.insert(entry_key.clone(), decoded);
                    }
                }
                Some(Bson::Document(out))
            }
            _ => {
                issues.push(ParsingIssue {
                    path: path.to_string(),
                    key: key.to_string(),
                    kind: ParsingIssueKind::MalformedStructure { expected: "document" },
                });
                None
            }
        },
        scalar_type => match scalar::from_wire(scalar_type, value, path) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                issues.push(ParsingIssue {
                    path: err.path,
                    key: key.to_string(),
                    kind: ParsingIssueKind::Coercion(err.kind),
                });
                None
            }
        },
    }
}

fn expect_document<'a>(value: &'a Bson, path: &str) -> Result<&'a Document, CoercionError> {
    match value {
        Bson::Document(doc) => Ok(doc),
        other => Err(type_mismatch(path, "document", other)),
    }
}

fn type_mismatch(path: &str, expected: &'static str, actual: &Bson) -> CoercionError {
    CoercionError::new(
        path,
        CoercionErrorKind::TypeMismatch { expected, actual: scalar::bson_type_name(actual) },
    )
}

fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}
