//! Query expression construction for document stores.
//!
//! Expressions are a tagged tree ([`QueryExpr`]) built by pure functions:
//! either through the [`Filter`] helper (explicit wire key paths) or
//! through [`FieldPath`](crate::path::FieldPath) handles (resolved
//! attribute paths). Trees compare structurally, so tests can assert on
//! their exact shape, and combinators never mutate their inputs; every
//! combination produces a new tree.
//!
//! Serialization to the store's native filter syntax goes through the
//! [`QueryVisitor`] seam; [`WireTranslator`] is the built-in
//! implementation producing documents like `{"e.f": {"$eq": 5}}` and
//! `{"$and": [...]}` that the persistence engine passes to the store
//! verbatim.
//!
//! # Example
//!
//! ```ignore
//! use docmap_core::query::Filter;
//!
//! let expr = Filter::and([
//!     Filter::eq("status", "active"),
//!     Filter::gt("age", 18),
//! ]);
//! assert_eq!(expr, Filter::eq("status", "active").and(Filter::gt("age", 18)));
//! ```

use std::convert::Infallible;
use std::fmt;

use bson::{Bson, Document, Regex};

use crate::error::MappingError;

/// Comparison operators, serialized to their store-native symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    /// The store-native operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "$eq",
            CmpOp::Ne => "$ne",
            CmpOp::Gt => "$gt",
            CmpOp::Gte => "$gte",
            CmpOp::Lt => "$lt",
            CmpOp::Lte => "$lte",
        }
    }
}

/// N-ary logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nor,
}

impl LogicalOp {
    /// The store-native logical key.
    pub fn key(&self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
            LogicalOp::Nor => "$nor",
        }
    }
}

/// A composable filter predicate.
///
/// [`QueryExpr::Empty`] is the explicit "no filter" form: it compares and
/// prints differently from an always-true empty conjunction. Boolean
/// literals are permitted so expressions can be combined with host-language
/// booleans inside logical combinators.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// No filter.
    Empty,
    /// A raw boolean literal inside a logical combinator.
    Literal(bool),
    /// Field comparison, keyed by a dotted wire key path.
    Comparison {
        path: String,
        op: CmpOp,
        value: Bson,
    },
    /// Set membership (`$in` / `$nin`), preserving value order.
    Membership {
        path: String,
        negated: bool,
        values: Vec<Bson>,
    },
    /// Pattern match. The compiled pattern is stored directly so its
    /// flags survive serialization; plain strings compile with no flags.
    Pattern { path: String, pattern: Regex },
    /// Logical combination, preserving argument order.
    Logical {
        op: LogicalOp,
        exprs: Vec<QueryExpr>,
    },
    /// Logical negation.
    Not(Box<QueryExpr>),
}

impl QueryExpr {
    /// Combines this expression with another under `$and`, producing the
    /// same tree as `Filter::and([self, other])`.
    pub fn and(self, other: impl Into<QueryExpr>) -> Self {
        Filter::and([self, other.into()])
    }

    /// Combines this expression with another under `$or`, producing the
    /// same tree as `Filter::or([self, other])`.
    pub fn or(self, other: impl Into<QueryExpr>) -> Self {
        Filter::or([self, other.into()])
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        QueryExpr::Not(Box::new(self))
    }

    /// Serializes the expression to its store-native BSON form.
    pub fn to_bson(&self) -> Bson {
        let mut translator = WireTranslator;
        match translator.visit_expr(self) {
            Ok(bson) => bson,
            Err(err) => match err {},
        }
    }

    /// Serializes the expression to the store-native filter document.
    ///
    /// A top-level boolean literal is wrapped under `$expr` to stay a
    /// valid filter document.
    pub fn to_filter(&self) -> Document {
        match self.to_bson() {
            Bson::Document(doc) => doc,
            other => {
                let mut doc = Document::new();
                doc.insert("$expr", other);
                doc
            }
        }
    }
}

impl From<bool> for QueryExpr {
    fn from(value: bool) -> Self {
        QueryExpr::Literal(value)
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Empty => write!(f, "QueryExpr()"),
            other => write!(f, "QueryExpr({})", other.to_filter()),
        }
    }
}

/// Helper struct for constructing filter expressions from explicit wire
/// key paths.
///
/// [`FieldPath`](crate::path::FieldPath) handles delegate here after
/// resolving their dotted paths and checking operator permissions.
pub struct Filter;

impl Filter {
    /// The explicit no-filter expression.
    pub fn none() -> QueryExpr {
        QueryExpr::Empty
    }

    /// Equality comparison.
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> QueryExpr {
        QueryExpr::Comparison { path: path.into(), op: CmpOp::Eq, value: value.into() }
    }

    /// Inequality comparison (also matches documents missing the field).
    pub fn ne(path: impl Into<String>, value: impl Into<Bson>) -> QueryExpr {
        QueryExpr::Comparison { path: path.into(), op: CmpOp::Ne, value: value.into() }
    }

    /// Strict greater-than comparison.
    pub fn gt(path: impl Into<String>, value: impl Into<Bson>) -> QueryExpr {
        QueryExpr::Comparison { path: path.into(), op: CmpOp::Gt, value: value.into() }
    }

    /// Greater-than-or-equal comparison.
    pub fn gte(path: impl Into<String>, value: impl Into<Bson>) -> QueryExpr {
        QueryExpr::Comparison { path: path.into(), op: CmpOp::Gte, value: value.into() }
    }

    /// Strict less-than comparison.
    pub fn lt(path: impl Into<String>, value: impl Into<Bson>) -> QueryExpr {
        QueryExpr::Comparison { path: path.into(), op: CmpOp::Lt, value: value.into() }
    }

    /// Less-than-or-equal comparison.
    pub fn lte(path: impl Into<String>, value: impl Into<Bson>) -> QueryExpr {
        QueryExpr::Comparison { path: path.into(), op: CmpOp::Lte, value: value.into() }
    }

    /// Selects values contained in `values`, preserving order.
    pub fn is_in<I, V>(path: impl Into<String>, values: I) -> QueryExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        QueryExpr::Membership {
            path: path.into(),
            negated: false,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Selects values not contained in `values`.
    pub fn not_in<I, V>(path: impl Into<String>, values: I) -> QueryExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        QueryExpr::Membership {
            path: path.into(),
            negated: true,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Pattern match against a plain pattern string, compiled with no
    /// flags.
    pub fn matches(path: impl Into<String>, pattern: impl Into<String>) -> QueryExpr {
        let pattern: String = pattern.into();
        QueryExpr::Pattern {
            path: path.into(),
            pattern: Regex {
                pattern: pattern.try_into().unwrap(),
                options: String::new().try_into().unwrap(),
            },
        }
    }

    /// Pattern match against a compiled pattern, preserving its flags.
    pub fn matches_pattern(path: impl Into<String>, pattern: Regex) -> QueryExpr {
        QueryExpr::Pattern { path: path.into(), pattern }
    }

    /// Logical **AND** of the given expressions, preserving argument
    /// order.
    pub fn and<I>(exprs: I) -> QueryExpr
    where
        I: IntoIterator,
        I::Item: Into<QueryExpr>,
    {
        QueryExpr::Logical {
            op: LogicalOp::And,
            exprs: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// Logical **OR** of the given expressions, preserving argument order.
    pub fn or<I>(exprs: I) -> QueryExpr
    where
        I: IntoIterator,
        I::Item: Into<QueryExpr>,
    {
        QueryExpr::Logical {
            op: LogicalOp::Or,
            exprs: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// Logical **NOR** of the given expressions, preserving argument
    /// order.
    pub fn nor<I>(exprs: I) -> QueryExpr
    where
        I: IntoIterator,
        I::Item: Into<QueryExpr>,
    {
        QueryExpr::Logical {
            op: LogicalOp::Nor,
            exprs: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// Logical negation of an expression.
    pub fn not(expr: impl Into<QueryExpr>) -> QueryExpr {
        QueryExpr::Not(Box::new(expr.into()))
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The store-native order value (`1` / `-1`).
    pub fn order(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// An ordered sort specification over wire key paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortExpr {
    entries: Vec<(String, SortDirection)>,
}

impl SortExpr {
    /// Sort ascending by `path`.
    pub fn asc(path: impl Into<String>) -> Self {
        Self { entries: vec![(path.into(), SortDirection::Asc)] }
    }

    /// Sort descending by `path`.
    pub fn desc(path: impl Into<String>) -> Self {
        Self { entries: vec![(path.into(), SortDirection::Desc)] }
    }

    /// Appends another sort specification, preserving order.
    pub fn then(mut self, other: SortExpr) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn entries(&self) -> &[(String, SortDirection)] {
        &self.entries
    }

    /// Serializes to the store-native sort document.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (path, direction) in &self.entries {
            doc.insert(path.clone(), direction.order());
        }
        doc
    }
}

impl fmt::Display for SortExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            write!(f, "SortExpr()")
        } else {
            write!(f, "SortExpr({})", self.to_document())
        }
    }
}

/// Visitor over query expression trees.
///
/// The store-native serialization and any engine-side evaluation both go
/// through this seam, so backends can interpret expressions without
/// matching on [`QueryExpr`] themselves.
pub trait QueryVisitor {
    type Output;
    type Error: Into<MappingError>;

    fn visit_empty(&mut self) -> Result<Self::Output, Self::Error>;
    fn visit_literal(&mut self, value: bool) -> Result<Self::Output, Self::Error>;
    fn visit_comparison(
        &mut self,
        path: &str,
        op: CmpOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_membership(
        &mut self,
        path: &str,
        negated: bool,
        values: &[Bson],
    ) -> Result<Self::Output, Self::Error>;
    fn visit_pattern(&mut self, path: &str, pattern: &Regex)
    -> Result<Self::Output, Self::Error>;
    fn visit_logical(
        &mut self,
        op: LogicalOp,
        exprs: &[QueryExpr],
    ) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &QueryExpr) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &QueryExpr) -> Result<Self::Output, Self::Error> {
        match expr {
            QueryExpr::Empty => self.visit_empty(),
            QueryExpr::Literal(value) => self.visit_literal(*value),
            QueryExpr::Comparison { path, op, value } => self.visit_comparison(path, *op, value),
            QueryExpr::Membership { path, negated, values } => {
                self.visit_membership(path, *negated, values)
            }
            QueryExpr::Pattern { path, pattern } => self.visit_pattern(path, pattern),
            QueryExpr::Logical { op, exprs } => self.visit_logical(*op, exprs),
            QueryExpr::Not(expr) => self.visit_not(expr),
        }
    }
}

/// Translates expression trees into the store's native query syntax.
pub struct WireTranslator;

impl QueryVisitor for WireTranslator {
    type Output = Bson;
    type Error = Infallible;

    fn visit_empty(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(Bson::Document(Document::new()))
    }

    fn visit_literal(&mut self, value: bool) -> Result<Self::Output, Self::Error> {
        Ok(Bson::Boolean(value))
    }

    fn visit_comparison(
        &mut self,
        path: &str,
        op: CmpOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let mut operation = Document::new();
        operation.insert(op.symbol(), value.clone());
        let mut doc = Document::new();
        doc.insert(path, operation);
        Ok(Bson::Document(doc))
    }

    fn visit_membership(
        &mut self,
        path: &str,
        negated: bool,
        values: &[Bson],
    ) -> Result<Self::Output, Self::Error> {
        let symbol = if negated { "$nin" } else { "$in" };
        let mut operation = Document::new();
        operation.insert(symbol, Bson::Array(values.to_vec()));
        let mut doc = Document::new();
        doc.insert(path, operation);
        Ok(Bson::Document(doc))
    }

    fn visit_pattern(
        &mut self,
        path: &str,
        pattern: &Regex,
    ) -> Result<Self::Output, Self::Error> {
        let mut doc = Document::new();
        doc.insert(path, Bson::RegularExpression(pattern.clone()));
        Ok(Bson::Document(doc))
    }

    fn visit_logical(
        &mut self,
        op: LogicalOp,
        exprs: &[QueryExpr],
    ) -> Result<Self::Output, Self::Error> {
        let elements = exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect::<Result<Vec<_>, _>>()?;
        let mut doc = Document::new();
        doc.insert(op.key(), Bson::Array(elements));
        Ok(Bson::Document(doc))
    }

    fn visit_not(&mut self, expr: &QueryExpr) -> Result<Self::Output, Self::Error> {
        let mut doc = Document::new();
        doc.insert("$not", self.visit_expr(expr)?);
        Ok(Bson::Document(doc))
    }
}
