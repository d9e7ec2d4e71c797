//! Convenient re-exports of commonly used types from docmap.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmap::prelude::*;
//! ```
//!
//! This provides access to:
//! - Model traits and the document codec
//! - Field metadata and the model registration builder
//! - Attribute-path handles and query construction
//! - Index declarations
//! - Error types

pub use docmap_core::{
    document::{Model, ModelExt, collection_name, field_metadata, from_document, to_document},
    error::{CoercionError, DefinitionError, MappingError, MappingResult, ParsingError, QueryError},
    field::{ExtraPolicy, FieldDescriptor, FieldKind, FieldType, ModelConfig, ModelDescriptor, ModelShape},
    index::{Index, IndexSpec, derive_indexes, indexes_for},
    path::FieldPath,
    query::{CmpOp, Filter, LogicalOp, QueryExpr, QueryVisitor, SortDirection, SortExpr, WireTranslator},
    scalar::CustomScalar,
};
