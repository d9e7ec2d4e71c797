//! Bidirectional conversion between native scalar values and the store's
//! wire types.
//!
//! The codec is driven by the declared [`FieldType`] of a field: given a
//! raw BSON value, [`to_wire`] normalizes it into the representation the
//! store expects (object ids from hex strings, millisecond-truncated
//! timestamps, `Decimal128` from decimal strings, ...) and [`from_wire`]
//! normalizes a stored value back into the form the model's deserializer
//! consumes. Both directions fail with a structured [`CoercionError`]
//! naming the exact value path; nothing is coerced silently.
//!
//! Application-defined scalars hook in through [`CustomScalar`], a
//! registered pair of conversion functions that lets a domain type persist
//! as a wire primitive of its choosing.

use bson::{Binary, Bson, Regex, spec::BinarySubtype};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};

use crate::{
    error::{CoercionError, CoercionErrorKind},
    field::FieldType,
};

/// A registered coercion pair for an application-defined scalar type.
///
/// The functions receive the field's raw BSON value and return the value
/// to store (`to_wire`) or the value to hand to the model's deserializer
/// (`from_wire`). Rejections are reported as plain strings and wrapped
/// into a [`CoercionError`] carrying the field path.
///
/// # Example
///
/// ```ignore
/// static HEX_BLOB: CustomScalar = CustomScalar {
///     name: "hex_blob",
///     to_wire: |value| match value {
///         Bson::String(s) => Ok(Bson::Binary(Binary {
///             subtype: BinarySubtype::Generic,
///             bytes: hex_decode(s)?,
///         })),
///         other => Err(format!("expected hex string, found {other}")),
///     },
///     from_wire: |value| match value {
///         Bson::Binary(b) => Ok(Bson::String(hex_encode(&b.bytes))),
///         other => Err(format!("expected binary, found {other}")),
///     },
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomScalar {
    /// Name used in diagnostics.
    pub name: &'static str,
    /// Converts a native value into the wire value to store.
    pub to_wire: fn(&Bson) -> Result<Bson, String>,
    /// Converts a stored wire value back into the native form.
    pub from_wire: fn(&Bson) -> Result<Bson, String>,
}

/// Converts a native value into the wire representation for `ty`.
///
/// Containers recurse element-wise, extending the error path with `[i]`
/// for sequence elements and `.key` for map entries. Embedded and
/// reference fields pass through untouched; their structural conversion
/// belongs to the document codec.
pub fn to_wire(ty: &FieldType, value: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match ty {
        FieldType::Any | FieldType::Embedded(_) | FieldType::Reference(_) => Ok(value.clone()),
        FieldType::ObjectId => coerce_object_id(value, path),
        FieldType::Uuid => coerce_uuid(value, path),
        FieldType::Bool => match value {
            Bson::Boolean(_) => Ok(value.clone()),
            other => Err(mismatch(path, "boolean", other)),
        },
        FieldType::Int32 => match value {
            Bson::Int32(_) => Ok(value.clone()),
            other => Err(mismatch(path, "int32", other)),
        },
        FieldType::Int64 => match value {
            Bson::Int64(_) => Ok(value.clone()),
            Bson::Int32(v) => Ok(Bson::Int64(i64::from(*v))),
            other => Err(mismatch(path, "int64", other)),
        },
        FieldType::Double => match value {
            Bson::Double(_) => Ok(value.clone()),
            Bson::Int32(v) => Ok(Bson::Double(f64::from(*v))),
            Bson::Int64(v) => Ok(Bson::Double(*v as f64)),
            other => Err(mismatch(path, "double", other)),
        },
        FieldType::String => match value {
            Bson::String(_) => Ok(value.clone()),
            other => Err(mismatch(path, "string", other)),
        },
        FieldType::Bytes => coerce_bytes(value, path),
        FieldType::Regex => match value {
            Bson::RegularExpression(_) => Ok(value.clone()),
            Bson::String(pattern) => Ok(Bson::RegularExpression(Regex {
                pattern: pattern.clone().try_into().unwrap(),
                options: String::new().try_into().unwrap(),
            })),
            other => Err(mismatch(path, "regular expression", other)),
        },
        FieldType::DateTime => coerce_datetime(value, path),
        FieldType::Decimal => match value {
            Bson::Decimal128(_) => Ok(value.clone()),
            Bson::String(s) => decimal_from_str(s, path).map(Bson::Decimal128),
            other => Err(mismatch(path, "decimal", other)),
        },
        FieldType::Decimal128 => match value {
            Bson::Decimal128(_) => Ok(value.clone()),
            Bson::String(s) => s
                .parse::<bson::Decimal128>()
                .map(Bson::Decimal128)
                .map_err(|_| malformed_decimal(s, path)),
            other => Err(mismatch(path, "decimal128", other)),
        },
        FieldType::Custom(codec) => (codec.to_wire)(value)
            .map_err(|reason| CoercionError::new(path, CoercionErrorKind::Custom(reason))),
        FieldType::Optional(inner) => match value {
            Bson::Null => Ok(Bson::Null),
            other => to_wire(inner, other, path),
        },
        FieldType::Array(inner) => match value {
            Bson::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| to_wire(inner, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            other => Err(mismatch(path, "array", other)),
        },
        FieldType::Map(inner) => match value {
            Bson::Document(entries) => {
                let mut out = bson::Document::new();
                for (key, item) in entries {
                    out.insert(key.clone(), to_wire(inner, item, &format!("{path}.{key}"))?);
                }
                Ok(Bson::Document(out))
            }
            other => Err(mismatch(path, "document", other)),
        },
    }
}

/// Converts a stored wire value back into the native form for `ty`.
///
/// The result is the canonical value the model's deserializer consumes:
/// `Decimal128` becomes its lossless string form for `Decimal` fields,
/// identifiers and timestamps stay in their wire types, strings are
/// upgraded where the wire history allows it (hex object ids, RFC 3339
/// timestamps).
pub fn from_wire(ty: &FieldType, raw: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match ty {
        FieldType::Any | FieldType::Embedded(_) | FieldType::Reference(_) => Ok(raw.clone()),
        FieldType::ObjectId => coerce_object_id(raw, path),
        FieldType::Uuid => coerce_uuid(raw, path),
        FieldType::Bool => match raw {
            Bson::Boolean(_) => Ok(raw.clone()),
            other => Err(mismatch(path, "boolean", other)),
        },
        FieldType::Int32 => match raw {
            Bson::Int32(_) => Ok(raw.clone()),
            other => Err(mismatch(path, "int32", other)),
        },
        FieldType::Int64 => match raw {
            Bson::Int64(_) => Ok(raw.clone()),
            Bson::Int32(v) => Ok(Bson::Int64(i64::from(*v))),
            other => Err(mismatch(path, "int64", other)),
        },
        FieldType::Double => match raw {
            Bson::Double(_) => Ok(raw.clone()),
            Bson::Int32(v) => Ok(Bson::Double(f64::from(*v))),
            Bson::Int64(v) => Ok(Bson::Double(*v as f64)),
            other => Err(mismatch(path, "double", other)),
        },
        FieldType::String => match raw {
            Bson::String(_) => Ok(raw.clone()),
            other => Err(mismatch(path, "string", other)),
        },
        FieldType::Bytes => coerce_bytes(raw, path),
        FieldType::Regex => match raw {
            Bson::RegularExpression(_) => Ok(raw.clone()),
            Bson::String(pattern) => Ok(Bson::RegularExpression(Regex {
                pattern: pattern.clone().try_into().unwrap(),
                options: String::new().try_into().unwrap(),
            })),
            other => Err(mismatch(path, "regular expression", other)),
        },
        FieldType::DateTime => coerce_datetime(raw, path),
        FieldType::Decimal => match raw {
            Bson::Decimal128(d) => {
                let text = d.to_string();
                text.parse::<rust_decimal::Decimal>()
                    .map_err(|_| malformed_decimal(&text, path))?;
                Ok(Bson::String(text))
            }
            Bson::String(s) => {
                s.parse::<rust_decimal::Decimal>()
                    .map_err(|_| malformed_decimal(s, path))?;
                Ok(raw.clone())
            }
            other => Err(mismatch(path, "decimal", other)),
        },
        FieldType::Decimal128 => match raw {
            Bson::Decimal128(_) => Ok(raw.clone()),
            Bson::String(s) => s
                .parse::<bson::Decimal128>()
                .map(Bson::Decimal128)
                .map_err(|_| malformed_decimal(s, path)),
            other => Err(mismatch(path, "decimal128", other)),
        },
        FieldType::Custom(codec) => (codec.from_wire)(raw)
            .map_err(|reason| CoercionError::new(path, CoercionErrorKind::Custom(reason))),
        FieldType::Optional(inner) => match raw {
            Bson::Null => Ok(Bson::Null),
            other => from_wire(inner, other, path),
        },
        FieldType::Array(inner) => match raw {
            Bson::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| from_wire(inner, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            other => Err(mismatch(path, "array", other)),
        },
        FieldType::Map(inner) => match raw {
            Bson::Document(entries) => {
                let mut out = bson::Document::new();
                for (key, item) in entries {
                    out.insert(key.clone(), from_wire(inner, item, &format!("{path}.{key}"))?);
                }
                Ok(Bson::Document(out))
            }
            other => Err(mismatch(path, "document", other)),
        },
    }
}

/// Drops sub-millisecond precision, matching the store's storage
/// resolution. Already-aligned values pass through unchanged.
pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    let excess = value.timestamp_subsec_micros() % 1000;
    value - Duration::microseconds(i64::from(excess))
}

/// Converts a timezone-carrying timestamp into the wire type.
///
/// The store keeps no timezone information, so only UTC-equivalent
/// offsets are accepted; sub-millisecond precision is truncated.
pub fn datetime_to_wire(value: &DateTime<FixedOffset>) -> Result<bson::DateTime, CoercionErrorKind> {
    if value.offset().local_minus_utc() != 0 {
        return Err(CoercionErrorKind::NonUtcTimestamp);
    }
    let utc = truncate_to_millis(value.with_timezone(&Utc));
    Ok(bson::DateTime::from_millis(utc.timestamp_millis()))
}

fn coerce_object_id(value: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match value {
        Bson::ObjectId(_) => Ok(value.clone()),
        Bson::String(s) => bson::oid::ObjectId::parse_str(s)
            .map(Bson::ObjectId)
            .map_err(|_| {
                CoercionError::new(path, CoercionErrorKind::MalformedObjectId { value: s.clone() })
            }),
        other => Err(mismatch(path, "object id", other)),
    }
}

fn coerce_uuid(value: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match value {
        Bson::Binary(b) if b.subtype == BinarySubtype::Uuid => Ok(value.clone()),
        Bson::String(s) => uuid::Uuid::parse_str(s)
            .map(|u| {
                Bson::Binary(Binary {
                    subtype: BinarySubtype::Uuid,
                    bytes: u.as_bytes().to_vec(),
                })
            })
            .map_err(|_| {
                CoercionError::new(path, CoercionErrorKind::MalformedUuid { value: s.clone() })
            }),
        other => Err(mismatch(path, "uuid", other)),
    }
}

fn coerce_bytes(value: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match value {
        Bson::Binary(_) => Ok(value.clone()),
        // Plain byte sequences serialize as integer arrays; pack them.
        Bson::Array(items) => {
            let mut bytes = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Bson::Int32(v) if (0..=255).contains(v) => bytes.push(*v as u8),
                    other => return Err(mismatch(&format!("{path}[{i}]"), "byte", other)),
                }
            }
            Ok(Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes }))
        }
        other => Err(mismatch(path, "binary", other)),
    }
}

fn coerce_datetime(value: &Bson, path: &str) -> Result<Bson, CoercionError> {
    match value {
        // Wire timestamps are already millisecond precision.
        Bson::DateTime(_) => Ok(value.clone()),
        Bson::String(s) => parse_datetime(s)
            .map(Bson::DateTime)
            .map_err(|kind| CoercionError::new(path, kind)),
        other => Err(mismatch(path, "datetime", other)),
    }
}

fn parse_datetime(text: &str) -> Result<bson::DateTime, CoercionErrorKind> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return datetime_to_wire(&aware);
    }
    if let Ok(naive) = text.parse::<NaiveDateTime>() {
        let utc = truncate_to_millis(naive.and_utc());
        return Ok(bson::DateTime::from_millis(utc.timestamp_millis()));
    }
    Err(CoercionErrorKind::MalformedTimestamp { value: text.to_string() })
}

fn decimal_from_str(text: &str, path: &str) -> Result<bson::Decimal128, CoercionError> {
    // Validate through the native decimal first so only values with a
    // lossless native representation reach the wire.
    text.parse::<rust_decimal::Decimal>()
        .map_err(|_| malformed_decimal(text, path))?;
    text.parse::<bson::Decimal128>()
        .map_err(|_| malformed_decimal(text, path))
}

fn malformed_decimal(text: &str, path: &str) -> CoercionError {
    CoercionError::new(path, CoercionErrorKind::MalformedDecimal { value: text.to_string() })
}

fn mismatch(path: &str, expected: &'static str, actual: &Bson) -> CoercionError {
    CoercionError::new(
        path,
        CoercionErrorKind::TypeMismatch { expected, actual: bson_type_name(actual) },
    )
}

pub(crate) fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "boolean",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regular expression",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binary",
        Bson::ObjectId(_) => "object id",
        Bson::DateTime(_) => "datetime",
        Bson::Decimal128(_) => "decimal128",
        _ => "unsupported",
    }
}
