//! Typed values shared by the criteria model and the response decoder
//!
//! Plan constants and decoded aggregate tokens both travel through
//! [`Scalar`]. The runtime kind of a scalar drives range-query selection at
//! compile time, and [`ValueKind`] tells the decoder what target type a
//! rebound lookup expects.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{Error, Result};

/// A typed value as carried by criteria and produced by row decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    /// UTC timestamp. Facet bucket keys arrive as milliseconds since epoch.
    Date(DateTime<Utc>),
    /// A geo distance such as `5.0km`.
    Distance { value: f64, unit: String },
    Text(String),
    /// Raw JSON for values with no narrower representation (composite keys).
    Json(Value),
}

impl Scalar {
    /// The target-type tag this scalar naturally decodes to.
    pub fn kind(&self) -> ValueKind {
        match self {
            Scalar::Null | Scalar::Json(_) => ValueKind::Json,
            Scalar::Bool(_) => ValueKind::Bool,
            Scalar::Long(_) => ValueKind::Long,
            Scalar::Double(_) | Scalar::Distance { .. } => ValueKind::Double,
            Scalar::Date(_) => ValueKind::Date,
            Scalar::Text(_) => ValueKind::Text,
        }
    }

    /// Numeric view of the scalar, when it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Long(n) => Some(*n as f64),
            Scalar::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Wire representation for query documents. Dates render as RFC 3339
    /// UTC strings, distances as `{value}{unit}`.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Long(n) => Value::from(*n),
            Scalar::Double(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Date(d) => Value::String(d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            Scalar::Distance { value, unit } => Value::String(format!("{value}{unit}")),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Json(v) => v.clone(),
        }
    }
}

/// Target-type tag attached to rebound lookups and field references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Long,
    Double,
    Float,
    /// Optional fixed-point target. Infinity tokens decode to absence.
    Decimal,
    Date,
    Text,
    Json,
}

impl ValueKind {
    /// Zero value used when an aggregate lookup finds no matching field.
    pub fn default_value(&self) -> Scalar {
        match self {
            ValueKind::Bool => Scalar::Bool(false),
            ValueKind::Long => Scalar::Long(0),
            ValueKind::Double | ValueKind::Float => Scalar::Double(0.0),
            ValueKind::Decimal => Scalar::Null,
            ValueKind::Date => Scalar::Date(DateTime::<Utc>::UNIX_EPOCH),
            ValueKind::Text => Scalar::Text(String::new()),
            ValueKind::Json => Scalar::Null,
        }
    }
}

/// Convert a raw response token into a typed scalar.
///
/// Stats results over empty or unbounded sets use `"Infinity"` tokens;
/// those map to the floating target's infinity, or to absence for an
/// optional fixed-point target, and are otherwise left as literal text.
/// Numeric tokens destined for a temporal target are milliseconds since
/// the Unix epoch, which is how the engine keys date buckets.
pub fn parse_value(token: &Value, kind: ValueKind) -> Result<Scalar> {
    if token.is_null() {
        return Ok(kind.default_value());
    }

    if let Some(s) = token.as_str() {
        match s {
            "Infinity" | "∞" => match kind {
                ValueKind::Double | ValueKind::Float => return Ok(Scalar::Double(f64::INFINITY)),
                ValueKind::Decimal => return Ok(Scalar::Null),
                _ => {}
            },
            "-Infinity" | "-∞" => match kind {
                ValueKind::Double | ValueKind::Float => {
                    return Ok(Scalar::Double(f64::NEG_INFINITY))
                }
                ValueKind::Decimal => return Ok(Scalar::Null),
                _ => {}
            },
            _ => {}
        }
    }

    if token.is_number() && kind == ValueKind::Date {
        let millis = token.as_f64().unwrap_or(0.0) as i64;
        return match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(d) => Ok(Scalar::Date(d)),
            _ => Err(Error::InvalidResponse(format!(
                "timestamp out of range: {millis}"
            ))),
        };
    }

    match kind {
        ValueKind::Bool => match token {
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Scalar::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Scalar::Bool(false)),
            _ => Err(invalid_token(token, "bool")),
        },
        ValueKind::Long => token
            .as_i64()
            .or_else(|| token.as_f64().map(|f| f as i64))
            .or_else(|| token.as_str().and_then(|s| s.parse().ok()))
            .map(Scalar::Long)
            .ok_or_else(|| invalid_token(token, "long")),
        ValueKind::Double | ValueKind::Float | ValueKind::Decimal => token
            .as_f64()
            .or_else(|| token.as_str().and_then(|s| s.parse().ok()))
            .map(Scalar::Double)
            .ok_or_else(|| invalid_token(token, "double")),
        ValueKind::Date => token
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| Scalar::Date(d.with_timezone(&Utc)))
            .ok_or_else(|| invalid_token(token, "date")),
        ValueKind::Text => match token {
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            other => Ok(Scalar::Text(other.to_string())),
        },
        ValueKind::Json => Ok(Scalar::Json(token.clone())),
    }
}

fn invalid_token(token: &Value, target: &str) -> Error {
    Error::InvalidResponse(format!("cannot decode {token} as {target}"))
}
