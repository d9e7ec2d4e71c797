//! Field metadata and model descriptors.
//!
//! A model is a plain serde struct plus a [`ModelDescriptor`] registered
//! once through [`ModelDescriptor::builder`] (collection models) or
//! [`ModelDescriptor::embedded`] (embedded sub-documents). The builder
//! derives the full set of [`FieldDescriptor`]s and the storage collection
//! name, and performs every definition-time validation: primary key
//! resolution, wire key collisions, reserved key rules and index name
//! checks. Descriptors are immutable after `build()` and safe to share
//! across threads without synchronization.
//!
//! # Example
//!
//! ```ignore
//! static USER: LazyLock<ModelDescriptor> = LazyLock::new(|| {
//!     ModelDescriptor::builder("User")
//!         .field(FieldDescriptor::new("name", FieldType::String).index())
//!         .field(FieldDescriptor::new("email", FieldType::String).unique())
//!         .build()
//!         .expect("invalid User model")
//! });
//! ```

use bson::{Bson, Document, oid::ObjectId};
use convert_case::{Case, Casing};
use std::collections::HashSet;

use crate::{
    error::{DefinitionError, QueryError},
    index::{Index, ResolvedIndex},
    path::FieldPath,
    scalar::CustomScalar,
};

/// The reserved wire key the store uses for document identifiers.
pub const ID_KEY: &str = "_id";

/// Resolves the descriptor of an embedded or referenced model.
///
/// A model's `Model::descriptor` associated function coerces to this type,
/// so declarations read `FieldType::Embedded(Address::descriptor)`.
pub type DescriptorFn = fn() -> &'static ModelDescriptor;

/// The declared type of a field: the entry in the typed accessor table
/// that drives scalar coercion, attribute-path traversal and operator
/// gating.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// The store's native unique identifier.
    ObjectId,
    Uuid,
    Bool,
    Int32,
    /// Long integer; widens int32 wire values.
    Int64,
    Double,
    String,
    /// Byte blob, stored as generic-subtype binary.
    Bytes,
    /// Compiled pattern, stored with its flags.
    Regex,
    /// Millisecond-precision UTC timestamp.
    DateTime,
    /// Fixed-point decimal in its native (string-serialized) form,
    /// stored as `Decimal128`.
    Decimal,
    /// Fixed-point decimal used directly in its wire form.
    Decimal128,
    /// Passed through without coercion.
    Any,
    /// An application-defined scalar with a registered coercion pair.
    Custom(&'static CustomScalar),
    Optional(Box<FieldType>),
    Array(Box<FieldType>),
    Map(Box<FieldType>),
    /// A sub-document mapped by its own descriptor.
    Embedded(DescriptorFn),
    /// A document in another collection, stored as its primary key.
    Reference(DescriptorFn),
}

impl FieldType {
    /// The field kind used for operator gating and traversal rules.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::Reference(_) => FieldKind::Reference,
            FieldType::Embedded(_) => FieldKind::Embedded,
            FieldType::Optional(inner) | FieldType::Array(inner) | FieldType::Map(inner)
                if inner.contains_embedded() =>
            {
                FieldKind::EmbeddedContainer
            }
            _ => FieldKind::Scalar,
        }
    }

    fn contains_embedded(&self) -> bool {
        match self {
            FieldType::Embedded(_) => true,
            FieldType::Optional(inner) | FieldType::Array(inner) | FieldType::Map(inner) => {
                inner.contains_embedded()
            }
            _ => false,
        }
    }

    fn contains_reference(&self) -> bool {
        match self {
            FieldType::Reference(_) => true,
            FieldType::Optional(inner) | FieldType::Array(inner) | FieldType::Map(inner) => {
                inner.contains_reference()
            }
            _ => false,
        }
    }

    fn is_mutable(&self) -> bool {
        match self {
            FieldType::Array(_) | FieldType::Map(_) | FieldType::Embedded(_) => true,
            FieldType::Optional(inner) => inner.is_mutable(),
            _ => false,
        }
    }
}

/// Field kinds, distinguishing how a field participates in traversal and
/// which query operators it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Embedded,
    /// A sequence, set or mapping of embedded documents.
    EmbeddedContainer,
    Reference,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Embedded => "embedded",
            FieldKind::EmbeddedContainer => "embedded container",
            FieldKind::Reference => "reference",
        }
    }
}

/// Per-attribute metadata: wire key, indexing intent, primary-key
/// designation and default handling.
///
/// Descriptors are declared with chained setters and handed to the model
/// builder; they are owned by the [`ModelDescriptor`] and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: &'static str,
    key_name: String,
    explicit_key: bool,
    field_type: FieldType,
    primary: bool,
    index: bool,
    unique: bool,
    mutable: bool,
    default: Option<Bson>,
    default_factory: Option<fn() -> Bson>,
}

impl FieldDescriptor {
    /// Creates a descriptor for `name` with the wire key defaulting to the
    /// attribute name. Container and embedded types are marked mutable
    /// (clone-on-read) automatically.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            key_name: name.to_string(),
            explicit_key: false,
            mutable: field_type.is_mutable(),
            field_type,
            primary: false,
            index: false,
            unique: false,
            default: None,
            default_factory: None,
        }
    }

    /// Overrides the wire key this field is stored under.
    pub fn key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self.explicit_key = true;
        self
    }

    /// Marks this field as the primary key; its wire key is forced to
    /// [`ID_KEY`].
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Requests a plain single-field index on this field.
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Requests a unique single-field index on this field.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Forces the clone-on-read flag for defaults of this field.
    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    /// Sets a literal default, used when the wire key is absent from a
    /// parsed document. Mutable defaults are stored once here and cloned
    /// whenever they are bound to an instance.
    pub fn default(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets a default factory. Factories are only honored during parsing
    /// when the model opts in via
    /// [`ModelDescriptorBuilder::parse_doc_with_default_factories`];
    /// otherwise the key is required verbatim, so time-dependent defaults
    /// cannot mask missing data.
    pub fn default_factory(mut self, factory: fn() -> Bson) -> Self {
        self.default_factory = Some(factory);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The wire key this field is stored under.
    pub fn wire_key(&self) -> &str {
        &self.key_name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn kind(&self) -> FieldKind {
        self.field_type.kind()
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_indexed(&self) -> bool {
        self.index
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether defaults of this field must be cloned when bound.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn default_value(&self) -> Option<&Bson> {
        self.default.as_ref()
    }

    pub fn default_factory_fn(&self) -> Option<fn() -> Bson> {
        self.default_factory
    }

    /// Whether the wire key must be present in a parsed document under the
    /// given configuration.
    pub fn is_required_in_doc(&self, config: &ModelConfig) -> bool {
        if config.parse_doc_with_default_factories {
            self.default.is_none() && self.default_factory.is_none()
        } else {
            self.default_factory.is_some() || self.default.is_none()
        }
    }

    /// The value to bind when the wire key is absent, if any. Literal
    /// defaults are cloned; factories run only when the model opts in.
    pub(crate) fn default_for_parsing(&self, config: &ModelConfig) -> Option<Bson> {
        if let Some(default) = &self.default {
            Some(default.clone())
        } else if config.parse_doc_with_default_factories {
            self.default_factory.map(|factory| factory())
        } else {
            None
        }
    }
}

/// How undeclared keys in a parsed document are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraPolicy {
    /// Retained on the instance (catch them with a flattened map field).
    Allow,
    /// Dropped.
    #[default]
    Ignore,
    /// Reported as parsing errors.
    Forbid,
}

/// Per-model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelConfig {
    /// Explicit collection name override.
    pub collection: Option<String>,
    /// Honor default factories for keys absent from parsed documents.
    /// Off by default: synthesizing time-dependent defaults during parsing
    /// would hide missing data.
    pub parse_doc_with_default_factories: bool,
    /// Policy for undeclared keys during parsing.
    pub extra: ExtraPolicy,
}

/// Whether a model maps to its own collection or is embedded into other
/// documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelShape {
    Collection,
    Embedded,
}

/// The immutable, once-derived metadata of a model: its fields, primary
/// key, collection name, configuration and declared indexes.
#[derive(Debug)]
pub struct ModelDescriptor {
    model_name: &'static str,
    shape: ModelShape,
    collection: Option<String>,
    fields: Vec<FieldDescriptor>,
    primary: Option<usize>,
    config: ModelConfig,
    indexes: Vec<ResolvedIndex>,
    raw_indexes: Vec<Document>,
}

impl ModelDescriptor {
    /// Starts a descriptor for a collection-rooted model.
    pub fn builder(model_name: &'static str) -> ModelDescriptorBuilder {
        ModelDescriptorBuilder::new(model_name, ModelShape::Collection)
    }

    /// Starts a descriptor for an embedded model.
    pub fn embedded(model_name: &'static str) -> ModelDescriptorBuilder {
        ModelDescriptorBuilder::new(model_name, ModelShape::Embedded)
    }

    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    /// The storage collection name; `None` for embedded models.
    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn primary_field(&self) -> Option<&FieldDescriptor> {
        self.primary.map(|i| &self.fields[i])
    }

    /// Looks up a field by attribute name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub(crate) fn field_with_key(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.wire_key() == key)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Resolves a dotted attribute path (`"address.city"`) into a
    /// [`FieldPath`] handle for building query and sort expressions.
    pub fn path(&self, attrs: &str) -> Result<FieldPath, QueryError> {
        FieldPath::resolve(self, attrs)
    }

    pub(crate) fn resolved_indexes(&self) -> &[ResolvedIndex] {
        &self.indexes
    }

    pub(crate) fn raw_indexes(&self) -> &[Document] {
        &self.raw_indexes
    }
}

/// Resolves a dotted attribute path against a field table, returning the
/// dotted wire key path, a copy of the terminal descriptor, and the name
/// of the model declaring the terminal field.
///
/// Non-terminal links must be embedded fields: references terminate the
/// chain and scalars cannot be traversed.
pub(crate) fn resolve_attr_path(
    model: &'static str,
    fields: &[FieldDescriptor],
    attrs: &str,
) -> Result<(String, FieldDescriptor, &'static str), QueryError> {
    let mut keys: Vec<String> = Vec::new();
    let mut scope_model = model;
    let mut scope_fields = fields;
    let mut terminal: Option<FieldDescriptor> = None;

    for segment in attrs.split('.') {
        if let Some(prev) = terminal.take() {
            match prev.field_type() {
                FieldType::Embedded(target) => {
                    let descriptor = target();
                    scope_model = descriptor.model_name();
                    scope_fields = descriptor.fields();
                }
                FieldType::Reference(target) => {
                    let descriptor = target();
                    return Err(if descriptor.field(segment).is_some() {
                        QueryError::ReferenceTraversal
                    } else {
                        QueryError::UnknownAttribute {
                            model: descriptor.model_name(),
                            attribute: segment.to_string(),
                        }
                    });
                }
                _ => {
                    return Err(QueryError::NotEmbedded {
                        model: scope_model,
                        attribute: prev.name().to_string(),
                    });
                }
            }
        }

        let descriptor = scope_fields
            .iter()
            .find(|f| f.name() == segment)
            .ok_or_else(|| QueryError::UnknownAttribute {
                model: scope_model,
                attribute: segment.to_string(),
            })?;
        keys.push(descriptor.wire_key().to_string());
        terminal = Some(descriptor.clone());
    }

    let terminal = terminal.ok_or_else(|| QueryError::UnknownAttribute {
        model,
        attribute: attrs.to_string(),
    })?;
    Ok((keys.join("."), terminal, scope_model))
}

/// Builder performing the one-time derivation of a [`ModelDescriptor`].
#[derive(Debug)]
pub struct ModelDescriptorBuilder {
    model_name: &'static str,
    shape: ModelShape,
    config: ModelConfig,
    fields: Vec<FieldDescriptor>,
    indexes: Vec<Index>,
    raw_indexes: Vec<Document>,
}

impl ModelDescriptorBuilder {
    fn new(model_name: &'static str, shape: ModelShape) -> Self {
        Self {
            model_name,
            shape,
            config: ModelConfig::default(),
            fields: Vec::new(),
            indexes: Vec::new(),
            raw_indexes: Vec::new(),
        }
    }

    /// Appends a field declaration. Declaration order is preserved in the
    /// document layout.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Overrides the storage collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = Some(name.into());
        self
    }

    /// Honors default factories for keys absent from parsed documents.
    pub fn parse_doc_with_default_factories(mut self, enabled: bool) -> Self {
        self.config.parse_doc_with_default_factories = enabled;
        self
    }

    /// Sets the policy for undeclared keys during parsing.
    pub fn extra(mut self, policy: ExtraPolicy) -> Self {
        self.config.extra = policy;
        self
    }

    /// Declares an explicit (possibly compound) index.
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Injects a store-native index definition, passed through verbatim
    /// by the index specifier.
    pub fn raw_index(mut self, definition: Document) -> Self {
        self.raw_indexes.push(definition);
        self
    }

    /// Derives the descriptor, running every definition-time validation.
    pub fn build(self) -> Result<ModelDescriptor, DefinitionError> {
        let model = self.model_name;
        let mut fields = self.fields;

        for field in &mut fields {
            if field.default.is_some() && field.default_factory.is_some() {
                return Err(DefinitionError::ConflictingDefaults { model, field: field.name });
            }
            if field.field_type.contains_reference()
                && !matches!(field.field_type, FieldType::Reference(_))
            {
                return Err(DefinitionError::UnsupportedFieldType {
                    model,
                    field: field.name,
                    reason: "references are only supported as top-level fields",
                });
            }
            if field.primary {
                if self.shape == ModelShape::Embedded {
                    return Err(DefinitionError::PrimaryFieldInEmbedded { model });
                }
                if field.kind() == FieldKind::EmbeddedContainer {
                    return Err(DefinitionError::UnsupportedFieldType {
                        model,
                        field: field.name,
                        reason: "a container of embedded documents cannot be the primary field",
                    });
                }
                if field.explicit_key && field.key_name != ID_KEY {
                    return Err(DefinitionError::PrimaryKeyRenamed { model, field: field.name });
                }
                field.key_name = ID_KEY.to_string();
            } else if field.key_name == ID_KEY {
                return Err(DefinitionError::ReservedKeyName { model, field: field.name });
            }
            if field.key_name != ID_KEY {
                validate_key_name(model, &field.key_name)?;
            }
        }

        let mut primaries = fields.iter().filter(|f| f.primary);
        if let (Some(first), Some(second)) = (primaries.next(), primaries.next()) {
            return Err(DefinitionError::DuplicatePrimaryField {
                model,
                first: first.name.to_string(),
                second: second.name.to_string(),
            });
        }

        if self.shape == ModelShape::Collection && !fields.iter().any(|f| f.primary) {
            if fields.iter().any(|f| f.name == "id") {
                return Err(DefinitionError::ImplicitIdCollision { model });
            }
            fields.push(
                FieldDescriptor::new("id", FieldType::ObjectId)
                    .primary()
                    .key_name(ID_KEY)
                    .default_factory(fresh_object_id),
            );
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.key_name.as_str()) {
                return Err(DefinitionError::DuplicateKeyName {
                    model,
                    key_name: field.key_name.clone(),
                });
            }
        }

        let collection = match self.shape {
            ModelShape::Embedded => None,
            ModelShape::Collection => {
                let name = match &self.config.collection {
                    Some(explicit) => explicit.clone(),
                    None => derive_collection_name(model),
                };
                validate_collection_name(model, &name)?;
                Some(name)
            }
        };

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for declared in self.indexes {
            indexes.push(declared.resolve(model, &fields)?);
        }
        let mut index_names = HashSet::new();
        let explicit_names = indexes.iter().filter_map(|i| i.name.as_deref());
        let raw_names = self
            .raw_indexes
            .iter()
            .filter_map(|d| d.get_str("name").ok());
        for name in explicit_names.chain(raw_names) {
            if !index_names.insert(name.to_string()) {
                return Err(DefinitionError::IndexNameCollision {
                    model,
                    name: name.to_string(),
                });
            }
        }

        let primary = fields.iter().position(|f| f.primary);
        Ok(ModelDescriptor {
            model_name: model,
            shape: self.shape,
            collection,
            fields,
            primary,
            config: self.config,
            indexes,
            raw_indexes: self.raw_indexes,
        })
    }
}

fn fresh_object_id() -> Bson {
    Bson::ObjectId(ObjectId::new())
}

/// Snake-cases the model name, stripping a conventional `Model` suffix.
fn derive_collection_name(model: &'static str) -> String {
    let base = model.strip_suffix("Model").unwrap_or(model);
    base.to_case(Case::Snake)
}

fn validate_key_name(model: &'static str, key_name: &str) -> Result<(), DefinitionError> {
    if key_name.starts_with('$') {
        return Err(DefinitionError::InvalidKeyName {
            model,
            key_name: key_name.to_string(),
            reason: "cannot start with the dollar sign ($) character",
        });
    }
    if key_name.contains('.') {
        return Err(DefinitionError::InvalidKeyName {
            model,
            key_name: key_name.to_string(),
            reason: "cannot contain the dot (.) character",
        });
    }
    Ok(())
}

fn validate_collection_name(model: &'static str, name: &str) -> Result<(), DefinitionError> {
    if name.is_empty() {
        return Err(DefinitionError::InvalidCollectionName { model, reason: "cannot be empty" });
    }
    if name.contains('$') {
        return Err(DefinitionError::InvalidCollectionName { model, reason: "cannot contain '$'" });
    }
    if name.starts_with("system.") {
        return Err(DefinitionError::InvalidCollectionName {
            model,
            reason: "cannot start with 'system.'",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn build(model: &'static str, fields: Vec<FieldDescriptor>) -> Result<ModelDescriptor, DefinitionError> {
        fields
            .into_iter()
            .fold(ModelDescriptor::builder(model), ModelDescriptorBuilder::field)
            .build()
    }

    #[test]
    fn collection_name_is_snake_cased_with_model_suffix_stripped() {
        let descriptor = build("TopPlayerModel", vec![]).unwrap();
        assert_eq!(descriptor.collection_name(), Some("top_player"));
    }

    #[test]
    fn collection_name_can_be_overridden() {
        let descriptor = ModelDescriptor::builder("User")
            .collection("accounts")
            .build()
            .unwrap();
        assert_eq!(descriptor.collection_name(), Some("accounts"));
    }

    #[test]
    fn system_collection_names_are_rejected() {
        let err = ModelDescriptor::builder("User")
            .collection("system.users")
            .build()
            .unwrap_err();
        assert_matches!(err, DefinitionError::InvalidCollectionName { .. });
    }

    #[test]
    fn an_implicit_primary_field_is_added() {
        let descriptor = build("User", vec![FieldDescriptor::new("name", FieldType::String)])
            .unwrap();
        let primary = descriptor.primary_field().unwrap();
        assert_eq!(primary.name(), "id");
        assert_eq!(primary.wire_key(), ID_KEY);
        assert_matches!(primary.field_type(), FieldType::ObjectId);
        assert!(primary.default_factory_fn().is_some());
    }

    #[test]
    fn an_existing_id_field_blocks_implicit_generation() {
        let err = build("User", vec![FieldDescriptor::new("id", FieldType::Int64)]).unwrap_err();
        assert_matches!(err, DefinitionError::ImplicitIdCollision { model: "User" });
    }

    #[test]
    fn two_primary_fields_are_rejected() {
        let err = build(
            "User",
            vec![
                FieldDescriptor::new("a", FieldType::Int64).primary(),
                FieldDescriptor::new("b", FieldType::Int64).primary(),
            ],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::DuplicatePrimaryField { .. });
    }

    #[test]
    fn the_primary_field_always_maps_to_the_reserved_key() {
        let descriptor = build(
            "User",
            vec![FieldDescriptor::new("handle", FieldType::String).primary()],
        )
        .unwrap();
        assert_eq!(descriptor.primary_field().unwrap().wire_key(), ID_KEY);
    }

    #[test]
    fn renaming_the_primary_key_is_rejected() {
        let err = build(
            "User",
            vec![FieldDescriptor::new("handle", FieldType::String).primary().key_name("h")],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::PrimaryKeyRenamed { field: "handle", .. });
    }

    #[test]
    fn the_reserved_key_requires_a_primary_declaration() {
        let err = build(
            "User",
            vec![FieldDescriptor::new("other", FieldType::String).key_name(ID_KEY)],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::ReservedKeyName { field: "other", .. });
    }

    #[test]
    fn colliding_wire_keys_are_rejected() {
        let err = build(
            "User",
            vec![
                FieldDescriptor::new("a", FieldType::String).key_name("k"),
                FieldDescriptor::new("b", FieldType::String).key_name("k"),
            ],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::DuplicateKeyName { .. });
    }

    #[test]
    fn wire_keys_with_dollar_or_dot_are_rejected() {
        let err = build(
            "User",
            vec![FieldDescriptor::new("a", FieldType::String).key_name("$a")],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::InvalidKeyName { .. });

        let err = build(
            "User",
            vec![FieldDescriptor::new("a", FieldType::String).key_name("a.b")],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::InvalidKeyName { .. });
    }

    #[test]
    fn embedded_models_cannot_declare_a_primary_field() {
        let err = ModelDescriptor::embedded("Address")
            .field(FieldDescriptor::new("city", FieldType::String).primary())
            .build()
            .unwrap_err();
        assert_matches!(err, DefinitionError::PrimaryFieldInEmbedded { model: "Address" });
    }

    #[test]
    fn embedded_models_have_no_collection() {
        let descriptor = ModelDescriptor::embedded("Address")
            .field(FieldDescriptor::new("city", FieldType::String))
            .build()
            .unwrap();
        assert_eq!(descriptor.collection_name(), None);
        assert_eq!(descriptor.shape(), ModelShape::Embedded);
    }

    #[test]
    fn conflicting_defaults_are_rejected() {
        let err = build(
            "User",
            vec![
                FieldDescriptor::new("n", FieldType::Int64)
                    .default(0_i64)
                    .default_factory(|| Bson::Int64(1)),
            ],
        )
        .unwrap_err();
        assert_matches!(err, DefinitionError::ConflictingDefaults { field: "n", .. });
    }

    #[test]
    fn container_and_embedded_fields_are_mutable() {
        let array = FieldDescriptor::new("tags", FieldType::Array(Box::new(FieldType::String)));
        assert!(array.is_mutable());
        let scalar = FieldDescriptor::new("name", FieldType::String);
        assert!(!scalar.is_mutable());
    }

    #[test]
    fn factories_make_a_field_required_unless_opted_in() {
        let field = FieldDescriptor::new("ts", FieldType::DateTime).default_factory(|| Bson::Null);
        let strict = ModelConfig::default();
        assert!(field.is_required_in_doc(&strict));
        assert_eq!(field.default_for_parsing(&strict), None);

        let lenient = ModelConfig { parse_doc_with_default_factories: true, ..Default::default() };
        assert!(!field.is_required_in_doc(&lenient));
        assert_eq!(field.default_for_parsing(&lenient), Some(Bson::Null));
    }
}
