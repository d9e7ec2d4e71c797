//! Attribute-path handles for building query and sort expressions.
//!
//! A [`FieldPath`] is a lazy, type-aware handle on "this declared
//! attribute, possibly nested inside embedded attributes". It is resolved
//! from a model descriptor at expression-build time without touching any
//! instance, carries the dotted wire key path, and exposes the operator
//! set its field kind allows:
//!
//! - scalar fields: the full comparison set, membership, pattern match
//!   and sort markers;
//! - embedded fields: attribute access descends one level, plus equality
//!   and membership on the whole sub-document;
//! - reference fields: equality and membership on the foreign key only;
//!   attribute access into the referenced model is rejected, references
//!   are not joined at query-build time;
//! - containers of embedded documents: equality only.
//!
//! # Example
//!
//! ```ignore
//! let by_city = user.path("address.city")?.eq("Lyon");
//! // {"address.city": {"$eq": "Lyon"}}
//! ```

use bson::{Bson, Regex};

use crate::{
    error::QueryError,
    field::{FieldDescriptor, FieldKind, FieldType, ModelDescriptor, resolve_attr_path},
    query::{Filter, QueryExpr, SortExpr},
};

/// A resolved attribute path rooted at a model, usable as a class-level
/// handle for building expressions.
#[derive(Debug, Clone)]
pub struct FieldPath {
    root_model: &'static str,
    owner_model: &'static str,
    attr_path: String,
    key_path: String,
    terminal: FieldDescriptor,
}

impl FieldPath {
    /// Resolves a dotted attribute path against a descriptor.
    pub(crate) fn resolve(
        descriptor: &ModelDescriptor,
        attrs: &str,
    ) -> Result<Self, QueryError> {
        let (key_path, terminal, owner_model) =
            resolve_attr_path(descriptor.model_name(), descriptor.fields(), attrs)?;
        Ok(Self {
            root_model: descriptor.model_name(),
            owner_model,
            attr_path: attrs.to_string(),
            key_path,
            terminal,
        })
    }

    /// Descends one level into an embedded field, returning the handle
    /// for the child attribute.
    pub fn attr(&self, name: &str) -> Result<Self, QueryError> {
        match self.terminal.field_type() {
            FieldType::Embedded(target) => {
                let descriptor = target();
                let child = descriptor.field(name).ok_or_else(|| {
                    QueryError::UnknownAttribute {
                        model: descriptor.model_name(),
                        attribute: name.to_string(),
                    }
                })?;
                Ok(Self {
                    root_model: self.root_model,
                    owner_model: descriptor.model_name(),
                    attr_path: format!("{}.{}", self.attr_path, name),
                    key_path: format!("{}.{}", self.key_path, child.wire_key()),
                    terminal: child.clone(),
                })
            }
            FieldType::Reference(target) => {
                let descriptor = target();
                Err(if descriptor.field(name).is_some() {
                    QueryError::ReferenceTraversal
                } else {
                    QueryError::UnknownAttribute {
                        model: descriptor.model_name(),
                        attribute: name.to_string(),
                    }
                })
            }
            _ => Err(QueryError::NotEmbedded {
                model: self.owner_model,
                attribute: self.terminal.name().to_string(),
            }),
        }
    }

    /// The model the path is rooted at.
    pub fn root_model(&self) -> &'static str {
        self.root_model
    }

    /// The dotted attribute path, as declared.
    pub fn attr_path(&self) -> &str {
        &self.attr_path
    }

    /// The resolved dotted wire key path expressions are keyed by.
    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn kind(&self) -> FieldKind {
        self.terminal.kind()
    }

    /// The terminal field's descriptor.
    pub fn field(&self) -> &FieldDescriptor {
        &self.terminal
    }

    pub fn eq(&self, value: impl Into<Bson>) -> QueryExpr {
        Filter::eq(self.key_path.clone(), value)
    }

    pub fn ne(&self, value: impl Into<Bson>) -> QueryExpr {
        Filter::ne(self.key_path.clone(), value)
    }

    pub fn gt(&self, value: impl Into<Bson>) -> Result<QueryExpr, QueryError> {
        self.scalar_only("gt")?;
        Ok(Filter::gt(self.key_path.clone(), value))
    }

    pub fn gte(&self, value: impl Into<Bson>) -> Result<QueryExpr, QueryError> {
        self.scalar_only("gte")?;
        Ok(Filter::gte(self.key_path.clone(), value))
    }

    pub fn lt(&self, value: impl Into<Bson>) -> Result<QueryExpr, QueryError> {
        self.scalar_only("lt")?;
        Ok(Filter::lt(self.key_path.clone(), value))
    }

    pub fn lte(&self, value: impl Into<Bson>) -> Result<QueryExpr, QueryError> {
        self.scalar_only("lte")?;
        Ok(Filter::lte(self.key_path.clone(), value))
    }

    /// Set membership. Allowed for scalar, embedded and reference fields.
    pub fn is_in<I, V>(&self, values: I) -> Result<QueryExpr, QueryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.guard("in", self.kind() != FieldKind::EmbeddedContainer)?;
        Ok(Filter::is_in(self.key_path.clone(), values))
    }

    /// Negated set membership. Allowed for scalar, embedded and reference
    /// fields.
    pub fn not_in<I, V>(&self, values: I) -> Result<QueryExpr, QueryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.guard("not_in", self.kind() != FieldKind::EmbeddedContainer)?;
        Ok(Filter::not_in(self.key_path.clone(), values))
    }

    /// Pattern match against a plain pattern string, compiled with no
    /// flags.
    pub fn matches(&self, pattern: impl Into<String>) -> Result<QueryExpr, QueryError> {
        self.scalar_only("match")?;
        Ok(Filter::matches(self.key_path.clone(), pattern))
    }

    /// Pattern match against a compiled pattern, preserving its flags.
    pub fn matches_pattern(&self, pattern: Regex) -> Result<QueryExpr, QueryError> {
        self.scalar_only("match")?;
        Ok(Filter::matches_pattern(self.key_path.clone(), pattern))
    }

    /// Ascending sort marker.
    pub fn asc(&self) -> Result<SortExpr, QueryError> {
        self.scalar_only("asc")?;
        Ok(SortExpr::asc(self.key_path.clone()))
    }

    /// Descending sort marker.
    pub fn desc(&self) -> Result<SortExpr, QueryError> {
        self.scalar_only("desc")?;
        Ok(SortExpr::desc(self.key_path.clone()))
    }

    fn scalar_only(&self, operator: &'static str) -> Result<(), QueryError> {
        self.guard(operator, self.kind() == FieldKind::Scalar)
    }

    fn guard(&self, operator: &'static str, allowed: bool) -> Result<(), QueryError> {
        if allowed {
            Ok(())
        } else {
            Err(QueryError::OperatorNotAllowed { operator, kind: self.kind().as_str() })
        }
    }
}
