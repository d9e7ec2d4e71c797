//! A declarative mapping layer between statically-declared data models and
//! a BSON document store's wire representation.
//!
//! This crate is the core of the docmap project and provides:
//!
//! - **Model traits and the document codec** ([`document`]) - Binding serde
//!   structs to registered descriptors and converting instances to/from
//!   wire documents
//! - **Field metadata** ([`field`]) - Per-attribute descriptors, the typed
//!   accessor table, and the one-time model registration builder
//! - **Attribute-path handles** ([`path`]) - Class-level handles for
//!   building query and sort expressions over nested fields
//! - **Query expressions** ([`query`]) - Composable filter trees with
//!   structural equality and store-native serialization
//! - **Scalar codec** ([`scalar`]) - Bidirectional conversion between
//!   native scalars and the store's wire types
//! - **Index derivation** ([`index`]) - Turning declared index intents into
//!   store index definitions
//! - **Error handling** ([`error`]) - Structured definition, coercion,
//!   parsing and query errors
//!
//! Every operation is a pure, synchronous computation over immutable
//! descriptors: safe to call concurrently without synchronization. The
//! persistence engine consuming the documents, query trees and index
//! specifications produced here lives outside this crate.
//!
//! # Example
//!
//! ```ignore
//! use docmap_core::{document::{Model, ModelExt}, field::*};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//! use std::sync::LazyLock;
//!
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
//! let filter = User::descriptor().path("name")?.eq("Alice");
//! let doc = user.to_document()?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_core;

pub mod document;
pub mod error;
pub mod field;
pub mod index;
pub mod path;
pub mod query;
pub mod scalar;
