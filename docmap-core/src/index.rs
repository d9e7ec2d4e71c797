//! Index derivation from declared field metadata.
//!
//! Single-field indexes come from per-field `index`/`unique` flags;
//! compound indexes are declared explicitly on the model builder with
//! [`Index`], naming attribute paths that are resolved to wire keys when
//! the descriptor is built. Store-native index definitions can be injected
//! verbatim and pass through untouched.
//!
//! # Example
//!
//! ```ignore
//! let descriptor = ModelDescriptor::builder("Player")
//!     .field(FieldDescriptor::new("name", FieldType::String))
//!     .field(FieldDescriptor::new("score", FieldType::Int64))
//!     .index(Index::new().ascending("name").descending("score").unique())
//!     .build()?;
//!
//! let specs = derive_indexes(&descriptor);
//! ```

use bson::Document;

use crate::{
    document::Model,
    error::DefinitionError,
    field::{FieldDescriptor, ModelDescriptor, resolve_attr_path},
    query::SortDirection,
};

/// An explicit index declaration over one or more attribute paths.
///
/// Field order and per-field sort direction are preserved in the derived
/// specification; uniqueness is an orthogonal modifier. Attribute paths
/// may dot through embedded fields and are resolved against the model
/// when the descriptor is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Index {
    fields: Vec<(String, SortDirection)>,
    unique: bool,
    name: Option<String>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute path with an explicit direction.
    pub fn field(mut self, attr_path: impl Into<String>, direction: SortDirection) -> Self {
        self.fields.push((attr_path.into(), direction));
        self
    }

    /// Appends an ascending attribute path.
    pub fn ascending(self, attr_path: impl Into<String>) -> Self {
        self.field(attr_path, SortDirection::Asc)
    }

    /// Appends a descending attribute path.
    pub fn descending(self, attr_path: impl Into<String>) -> Self {
        self.field(attr_path, SortDirection::Desc)
    }

    /// Makes the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Overrides the automatically assigned index name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Resolves attribute paths to wire keys against the model's fields.
    pub(crate) fn resolve(
        self,
        model: &'static str,
        fields: &[FieldDescriptor],
    ) -> Result<ResolvedIndex, DefinitionError> {
        let mut keys = Vec::with_capacity(self.fields.len());
        for (attr_path, direction) in self.fields {
            let (key_path, _, _) = resolve_attr_path(model, fields, &attr_path)
                .map_err(|_| DefinitionError::UnknownIndexField { model, path: attr_path.clone() })?;
            keys.push((key_path, direction));
        }
        Ok(ResolvedIndex { keys, unique: self.unique, name: self.name })
    }
}

/// An [`Index`] with its attribute paths resolved to wire key paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedIndex {
    pub(crate) keys: Vec<(String, SortDirection)>,
    pub(crate) unique: bool,
    pub(crate) name: Option<String>,
}

/// A store index definition derived from a model.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSpec {
    /// A key-ordered index over wire key paths.
    Keyed {
        keys: Document,
        /// `None` lets the store name the index automatically.
        name: Option<String>,
        unique: bool,
    },
    /// A store-native definition injected verbatim.
    Raw(Document),
}

impl IndexSpec {
    /// Serializes to the store's index-definition structure.
    pub fn to_document(&self) -> Document {
        match self {
            IndexSpec::Keyed { keys, name, unique } => {
                let mut doc = Document::new();
                doc.insert("key", keys.clone());
                if let Some(name) = name {
                    doc.insert("name", name.clone());
                }
                if *unique {
                    doc.insert("unique", true);
                }
                doc
            }
            IndexSpec::Raw(doc) => doc.clone(),
        }
    }
}

/// Derives the full index set of a model: one ascending single-field spec
/// per indexed or unique field, the explicitly declared indexes in
/// declaration order, then the raw pass-through definitions.
pub fn derive_indexes(descriptor: &ModelDescriptor) -> Vec<IndexSpec> {
    let mut specs = Vec::new();
    for field in descriptor.fields() {
        if field.is_indexed() || field.is_unique() {
            let mut keys = Document::new();
            keys.insert(field.wire_key(), SortDirection::Asc.order());
            specs.push(IndexSpec::Keyed { keys, name: None, unique: field.is_unique() });
        }
    }
    for index in descriptor.resolved_indexes() {
        let mut keys = Document::new();
        for (key_path, direction) in &index.keys {
            keys.insert(key_path.clone(), direction.order());
        }
        specs.push(IndexSpec::Keyed {
            keys,
            name: index.name.clone(),
            unique: index.unique,
        });
    }
    for raw in descriptor.raw_indexes() {
        specs.push(IndexSpec::Raw(raw.clone()));
    }
    specs
}

/// Derives the index set for a registered model type.
pub fn indexes_for<M: Model>() -> Vec<IndexSpec> {
    derive_indexes(M::descriptor())
}
