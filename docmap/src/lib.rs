//! Main docmap crate providing a declarative model-to-document mapping
//! layer.
//!
//! This crate is the primary entry point for users of the docmap framework.
//! It re-exports the core types and functionality from the core crate and
//! the underlying BSON types.
//!
//! # Features
//!
//! - **Declarative models** - Define your data structures with Serde, then
//!   register their field metadata once to derive the document shape
//! - **Round-trip document codec** - Instances serialize to wire documents
//!   (embedded sub-documents expanded, references collapsed to foreign
//!   keys) and parse back with structured, per-field errors
//! - **Composable query expressions** - Attribute-path handles build filter
//!   and sort trees that serialize to the store's native query syntax
//! - **Index derivation** - Declared index intents become store index
//!   definitions, with verbatim pass-through for store-native ones
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::prelude::*;
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//! use std::sync::LazyLock;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: ObjectId,
//!     pub name: String,
//!     pub email: String,
//! }
//!
//! static USER: LazyLock<ModelDescriptor> = LazyLock::new(|| {
//!     ModelDescriptor::builder("User")
//!         .field(FieldDescriptor::new("name", FieldType::String).index())
//!         .field(FieldDescriptor::new("email", FieldType::String).unique())
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
//! fn main() -> MappingResult<()> {
//!     let user = User {
//!         id: ObjectId::new(),
//!         name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!
//!     // Serialize to the wire document the persistence engine stores.
//!     let doc = user.to_document()?;
//!
//!     // Build a filter the engine passes to the store verbatim.
//!     let filter = User::descriptor().path("name")?.eq("Alice");
//!     assert_eq!(filter.to_filter(), bson::doc! { "name": { "$eq": "Alice" } });
//!
//!     // Parse the raw document back into an instance.
//!     let parsed = User::from_document(&doc)?;
//!     assert_eq!(parsed, user);
//!     Ok(())
//! }
//! ```

pub mod prelude;

pub use docmap_core::{document, error, field, index, path, query, scalar};

// Re-export BSON types for convenience
pub use bson;
