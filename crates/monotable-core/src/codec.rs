//! Typed scalar kinds and their wire encoding.
//!
//! A field's [`AttributeKind`] decides how a caller [`Value`] becomes an
//! [`AttributeValue`] and back:
//!
//! | Kind | Wire |
//! |------|------|
//! | `String` | `{"S": "<utf8>"}` |
//! | `Integer` | `{"N": "<decimal>"}` |
//! | `UtcTimestamp` | `{"S": "2024-01-01T00:00:00"}` |
//!
//! The same module builds single-attribute [`Condition`]s, since a condition
//! binds a serialized value to its placeholder.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use monotable_model::AttributeValue;
use monotable_model::types::ScalarAttributeType;

use crate::condition::{Condition, fresh_placeholder};
use crate::error::{MapperError, MapperResult};
use crate::schema::AttributeSpec;

/// `chrono` format of the ISO-8601 wire timestamp; the fraction is only
/// written when non-zero.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A caller-facing attribute value.
///
/// `Display` yields the natural string form used when a value is substituted
/// into a template: integers in decimal, timestamps in ISO-8601.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A signed integer.
    Integer(i64),
    /// A UTF-8 string.
    String(String),
    /// A UTC timestamp without offset.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns the string payload of a `String` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the payload of an `Integer` value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the payload of a `Timestamp` value.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts.naive_utc())
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

// ---------------------------------------------------------------------------
// AttributeKind
// ---------------------------------------------------------------------------

/// The scalar kind a field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Stored as `S`.
    String,
    /// Stored as `N`.
    Integer,
    /// Stored as an ISO-8601 `S`.
    UtcTimestamp,
}

impl AttributeKind {
    /// Human-readable kind name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::UtcTimestamp => "utc_timestamp",
        }
    }

    /// Scalar type used when the field appears in a key schema.
    #[must_use]
    pub fn scalar_type(self) -> ScalarAttributeType {
        match self {
            Self::Integer => ScalarAttributeType::N,
            Self::String | Self::UtcTimestamp => ScalarAttributeType::S,
        }
    }

    /// Coerce `value` into this kind.
    ///
    /// Strings coerce to integers and timestamps when they parse; any value
    /// coerces to a string through its natural form.
    pub fn coerce(self, value: &Value) -> MapperResult<Value> {
        let coerced = match (self, value) {
            (Self::String, Value::String(_))
            | (Self::Integer, Value::Integer(_))
            | (Self::UtcTimestamp, Value::Timestamp(_)) => Some(value.clone()),
            (Self::String, other) => Some(Value::String(other.to_string())),
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),
            (Self::UtcTimestamp, Value::String(s)) => {
                parse_timestamp(s.trim()).map(Value::Timestamp)
            }
            _ => None,
        };
        coerced.ok_or_else(|| self.mismatch(format!("{value:?}")))
    }

    /// Serialize `value` into its typed wire envelope.
    pub fn serialize(self, value: &Value) -> MapperResult<AttributeValue> {
        Ok(match self.coerce(value)? {
            Value::Integer(i) => AttributeValue::N(i.to_string()),
            other => AttributeValue::S(other.to_string()),
        })
    }

    /// Decode a wire envelope back into a value of this kind.
    pub fn deserialize(self, wire: &AttributeValue) -> MapperResult<Value> {
        let decoded = match (self, wire) {
            (Self::String, AttributeValue::S(s)) => Some(Value::String(s.clone())),
            (Self::Integer, AttributeValue::N(n)) => n.parse::<i64>().ok().map(Value::Integer),
            (Self::UtcTimestamp, AttributeValue::S(s)) => parse_timestamp(s).map(Value::Timestamp),
            _ => None,
        };
        decoded.ok_or_else(|| self.mismatch(wire.to_string()))
    }

    fn mismatch(self, found: String) -> MapperError {
        MapperError::TypeMismatch {
            field: String::new(),
            expected: self.name(),
            found,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Comparison operators available for key and filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `field = :v`
    Eq,
    /// `field > :v`
    Gt,
    /// `field < :v`
    Lt,
    /// `begins_with(field, :v)`
    BeginsWith,
}

impl ComparisonOp {
    fn render(self, field: &str, placeholder: &str) -> String {
        match self {
            Self::Eq => format!("{field} = {placeholder}"),
            Self::Gt => format!("{field} > {placeholder}"),
            Self::Lt => format!("{field} < {placeholder}"),
            Self::BeginsWith => format!("begins_with({field}, {placeholder})"),
        }
    }
}

impl AttributeSpec {
    /// Serialize a value with this field's kind, naming the field on error.
    pub fn serialize(&self, value: &Value) -> MapperResult<AttributeValue> {
        self.kind()
            .serialize(value)
            .map_err(|e| e.for_field(self.name()))
    }

    /// Decode a wire value with this field's kind, naming the field on error.
    pub fn deserialize(&self, wire: &AttributeValue) -> MapperResult<Value> {
        self.kind()
            .deserialize(wire)
            .map_err(|e| e.for_field(self.name()))
    }

    /// Build a single-attribute condition.
    ///
    /// Each call binds a fresh placeholder, so the same field can appear
    /// several times in one composed expression.
    pub fn condition(&self, op: ComparisonOp, value: impl Into<Value>) -> MapperResult<Condition> {
        if op == ComparisonOp::BeginsWith && self.kind().scalar_type() == ScalarAttributeType::N {
            return Err(MapperError::schema(format!(
                "begins_with needs a string-typed attribute, '{}' is {}",
                self.name(),
                self.kind()
            )));
        }
        let wire = self.serialize(&value.into())?;
        let placeholder = fresh_placeholder();
        let expression = op.render(self.name(), &placeholder);
        Ok(Condition::bound(expression, placeholder, wire))
    }

    /// `field = value`
    pub fn equals(&self, value: impl Into<Value>) -> MapperResult<Condition> {
        self.condition(ComparisonOp::Eq, value)
    }

    /// `field > value`
    pub fn greater_than(&self, value: impl Into<Value>) -> MapperResult<Condition> {
        self.condition(ComparisonOp::Gt, value)
    }

    /// `field < value`
    pub fn less_than(&self, value: impl Into<Value>) -> MapperResult<Condition> {
        self.condition(ComparisonOp::Lt, value)
    }

    /// `begins_with(field, value)`
    pub fn begins_with(&self, value: impl Into<Value>) -> MapperResult<Condition> {
        self.condition(ComparisonOp::BeginsWith, value)
    }
}
