//! End-to-end document codec behavior over registered models: round
//! trips, wire-key layout, embedded and referenced sub-documents, default
//! resolution and parsing diagnostics.

use assert_matches::assert_matches;
use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use docmap_core::{
    document::{Model, ModelExt},
    error::ParsingIssueKind,
    field::{ExtraPolicy, FieldDescriptor, FieldType, ModelDescriptor},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Address {
    city: String,
    zip: String,
}

static ADDRESS: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::embedded("Address")
        .field(FieldDescriptor::new("city", FieldType::String))
        .field(FieldDescriptor::new("zip", FieldType::String).key_name("postal_code"))
        .build()
        .unwrap()
});

impl Model for Address {
    fn descriptor() -> &'static ModelDescriptor {
        &ADDRESS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: ObjectId,
    name: String,
    email: String,
    created: DateTime,
    balance: Decimal,
    tags: Vec<String>,
    address: Address,
}

static USER: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("User")
        .field(FieldDescriptor::new("name", FieldType::String).index())
        .field(FieldDescriptor::new("email", FieldType::String).unique())
        .field(FieldDescriptor::new("created", FieldType::DateTime))
        .field(FieldDescriptor::new("balance", FieldType::Decimal))
        .field(FieldDescriptor::new("tags", FieldType::Array(Box::new(FieldType::String))))
        .field(FieldDescriptor::new("address", FieldType::Embedded(Address::descriptor)))
        .build()
        .unwrap()
});

impl Model for User {
    fn descriptor() -> &'static ModelDescriptor {
        &USER
    }
}

fn sample_user() -> User {
    User {
        id: ObjectId::new(),
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        created: DateTime::from_millis(1_700_000_000_123),
        balance: Decimal::new(1234, 2),
        tags: vec!["a".to_string(), "b".to_string()],
        address: Address { city: "Lyon".to_string(), zip: "69001".to_string() },
    }
}

#[test]
fn round_trip_preserves_instances() {
    let user = sample_user();
    let doc = user.to_document().unwrap();
    let parsed = User::from_document(&doc).unwrap();
    assert_eq!(parsed, user);
}

#[test]
fn documents_use_wire_keys_in_declaration_order() {
    let user = sample_user();
    let doc = user.to_document().unwrap();
    let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
    assert_eq!(keys, ["name", "email", "created", "balance", "tags", "address", "_id"]);
    assert_eq!(doc.get("_id"), Some(&Bson::ObjectId(user.id)));
    assert_matches!(doc.get("balance"), Some(Bson::Decimal128(_)));
}

#[test]
fn embedded_fields_expand_with_their_wire_keys() {
    let doc = sample_user().to_document().unwrap();
    assert_eq!(
        doc.get("address"),
        Some(&Bson::Document(doc! { "city": "Lyon", "postal_code": "69001" }))
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    number: i64,
    owner: String,
}

static ACCOUNT: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Account")
        .field(FieldDescriptor::new("number", FieldType::Int64).primary())
        .field(FieldDescriptor::new("owner", FieldType::String))
        .build()
        .unwrap()
});

impl Model for Account {
    fn descriptor() -> &'static ModelDescriptor {
        &ACCOUNT
    }
}

#[test]
fn the_primary_key_serializes_under_the_reserved_key() {
    let account = Account { number: 42, owner: "Ada".to_string() };
    let doc = account.to_document().unwrap();
    assert_eq!(doc, doc! { "_id": 42_i64, "owner": "Ada" });
    assert_eq!(Account::from_document(&doc).unwrap(), account);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Publisher {
    id: ObjectId,
    name: String,
}

static PUBLISHER: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Publisher")
        .field(FieldDescriptor::new("name", FieldType::String))
        .build()
        .unwrap()
});

impl Model for Publisher {
    fn descriptor() -> &'static ModelDescriptor {
        &PUBLISHER
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Book {
    id: ObjectId,
    title: String,
    publisher: Publisher,
}

static BOOK: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Book")
        .field(FieldDescriptor::new("title", FieldType::String))
        .field(FieldDescriptor::new("publisher", FieldType::Reference(Publisher::descriptor)))
        .build()
        .unwrap()
});

impl Model for Book {
    fn descriptor() -> &'static ModelDescriptor {
        &BOOK
    }
}

fn sample_book() -> Book {
    Book {
        id: ObjectId::new(),
        title: "Dune".to_string(),
        publisher: Publisher { id: ObjectId::new(), name: "Chilton".to_string() },
    }
}

#[test]
fn references_serialize_as_the_primary_key_only() {
    let book = sample_book();
    let doc = book.to_document().unwrap();
    assert_eq!(doc.get("publisher"), Some(&Bson::ObjectId(book.publisher.id)));
}

#[test]
fn references_parse_from_the_joined_document() {
    let book = sample_book();
    let mut doc = book.to_document().unwrap();
    // The persistence engine joins the referenced document under the
    // foreign-key field before handing the document to the parser.
    doc.insert("publisher", book.publisher.to_document().unwrap());
    assert_eq!(Book::from_document(&doc).unwrap(), book);
}

#[test]
fn a_bare_foreign_key_is_a_malformed_reference() {
    let book = sample_book();
    let doc = book.to_document().unwrap();
    let err = Book::from_document(&doc).unwrap_err();
    assert_eq!(err.model, "Book");
    let issue = &err.issues[0];
    assert_eq!(issue.path, "publisher");
    assert_matches!(issue.kind, ParsingIssueKind::MalformedStructure { expected: "document" });
}

#[test]
fn a_missing_reference_is_reported() {
    let err = Book::from_document(&doc! { "_id": ObjectId::new(), "title": "Dune" })
        .unwrap_err();
    let issue = &err.issues[0];
    assert_eq!(issue.path, "publisher");
    assert_matches!(issue.kind, ParsingIssueKind::MissingReference);
}

#[test]
fn joined_documents_report_their_own_missing_fields() {
    let book = sample_book();
    let mut doc = book.to_document().unwrap();
    doc.insert("publisher", doc! { "_id": book.publisher.id });
    let err = Book::from_document(&doc).unwrap_err();
    let issue = &err.issues[0];
    assert_eq!(issue.path, "publisher.name");
    assert_matches!(issue.kind, ParsingIssueKind::MissingKey);
}

#[test]
fn missing_required_keys_name_the_field_and_wire_key() {
    let id = ObjectId::new();
    let err = User::from_document(&doc! { "_id": id }).unwrap_err();
    assert_eq!(err.model, "User");
    let name_issue = err.issues.iter().find(|i| i.path == "name").unwrap();
    assert_eq!(name_issue.key, "name");
    assert_matches!(name_issue.kind, ParsingIssueKind::MissingKey);
    // The snapshot keeps the identifier and key names but no field values.
    assert!(err.snapshot.contains("_id"));
    assert!(err.snapshot.contains("keys"));
}

#[test]
fn nested_failures_name_the_sub_field() {
    let user = sample_user();
    let mut doc = user.to_document().unwrap();
    doc.insert("address", doc! { "postal_code": "69001" });
    let err = User::from_document(&doc).unwrap_err();
    let issue = &err.issues[0];
    assert_eq!(issue.path, "address.city");
    assert_matches!(issue.kind, ParsingIssueKind::MissingKey);
}

#[test]
fn malformed_scalars_surface_as_coercion_issues() {
    let user = sample_user();
    let mut doc = user.to_document().unwrap();
    doc.insert("created", "2024-05-02T10:00:00+02:00");
    let err = User::from_document(&doc).unwrap_err();
    let issue = &err.issues[0];
    assert_eq!(issue.path, "created");
    assert_matches!(
        issue.kind,
        ParsingIssueKind::Coercion(docmap_core::error::CoercionErrorKind::NonUtcTimestamp)
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: ObjectId,
    nickname: String,
    role: String,
}

static PROFILE: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Profile")
        .field(FieldDescriptor::new("nickname", FieldType::String))
        .field(FieldDescriptor::new("role", FieldType::String).default("guest"))
        .build()
        .unwrap()
});

impl Model for Profile {
    fn descriptor() -> &'static ModelDescriptor {
        &PROFILE
    }
}

#[test]
fn literal_defaults_fill_absent_keys() {
    let parsed =
        Profile::from_document(&doc! { "_id": ObjectId::new(), "nickname": "ada" }).unwrap();
    assert_eq!(parsed.role, "guest");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StampedStrict {
    id: ObjectId,
    label: String,
    seq: i64,
}

static STAMPED_STRICT: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("StampedStrict")
        .field(FieldDescriptor::new("label", FieldType::String))
        .field(FieldDescriptor::new("seq", FieldType::Int64).default_factory(|| Bson::Int64(7)))
        .build()
        .unwrap()
});

impl Model for StampedStrict {
    fn descriptor() -> &'static ModelDescriptor {
        &STAMPED_STRICT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StampedLenient {
    id: ObjectId,
    label: String,
    seq: i64,
}

static STAMPED_LENIENT: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("StampedLenient")
        .field(FieldDescriptor::new("label", FieldType::String))
        .field(FieldDescriptor::new("seq", FieldType::Int64).default_factory(|| Bson::Int64(7)))
        .parse_doc_with_default_factories(true)
        .build()
        .unwrap()
});

impl Model for StampedLenient {
    fn descriptor() -> &'static ModelDescriptor {
        &STAMPED_LENIENT
    }
}

#[test]
fn default_factories_require_opt_in_during_parsing() {
    let raw = doc! { "_id": ObjectId::new(), "label": "x" };

    // Without the opt-in, a factory-backed field still requires its key:
    // synthesizing a value here would hide missing data.
    let err = StampedStrict::from_document(&raw).unwrap_err();
    let issue = &err.issues[0];
    assert_eq!(issue.path, "seq");
    assert_matches!(issue.kind, ParsingIssueKind::MissingKey);

    let parsed = StampedLenient::from_document(&raw).unwrap();
    assert_eq!(parsed.seq, 7);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Flexible {
    id: ObjectId,
    name: String,
    #[serde(flatten)]
    rest: Document,
}

static FLEXIBLE: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Flexible")
        .field(FieldDescriptor::new("name", FieldType::String))
        .extra(ExtraPolicy::Allow)
        .build()
        .unwrap()
});

impl Model for Flexible {
    fn descriptor() -> &'static ModelDescriptor {
        &FLEXIBLE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Strict {
    id: ObjectId,
    name: String,
}

static STRICT: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Strict")
        .field(FieldDescriptor::new("name", FieldType::String))
        .extra(ExtraPolicy::Forbid)
        .build()
        .unwrap()
});

impl Model for Strict {
    fn descriptor() -> &'static ModelDescriptor {
        &STRICT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Relaxed {
    id: ObjectId,
    name: String,
}

static RELAXED: LazyLock<ModelDescriptor> = LazyLock::new(|| {
    ModelDescriptor::builder("Relaxed")
        .field(FieldDescriptor::new("name", FieldType::String))
        .build()
        .unwrap()
});

impl Model for Relaxed {
    fn descriptor() -> &'static ModelDescriptor {
        &RELAXED
    }
}

#[test]
fn allowed_extras_are_retained_on_the_instance() {
    let raw = doc! { "_id": ObjectId::new(), "name": "x", "note": "kept" };
    let parsed = Flexible::from_document(&raw).unwrap();
    assert_eq!(parsed.rest, doc! { "note": "kept" });

    let doc = parsed.to_document().unwrap();
    assert_eq!(doc.get("note"), Some(&Bson::String("kept".to_string())));
}

#[test]
fn ignored_extras_are_dropped() {
    let raw = doc! { "_id": ObjectId::new(), "name": "x", "note": "dropped" };
    let parsed = Relaxed::from_document(&raw).unwrap();
    let doc = parsed.to_document().unwrap();
    assert_eq!(doc.get("note"), None);
}

#[test]
fn forbidden_extras_are_parsing_errors() {
    let raw = doc! { "_id": ObjectId::new(), "name": "x", "note": "boom" };
    let err = Strict::from_document(&raw).unwrap_err();
    let issue = &err.issues[0];
    assert_eq!(issue.path, "note");
    assert_matches!(issue.kind, ParsingIssueKind::UndeclaredKey);
}

#[test]
fn json_conversion_round_trips() {
    let account = Account { number: 7, owner: "Ada".to_string() };
    let json = account.to_json().unwrap();
    assert_eq!(Account::from_json(json).unwrap(), account);
}
