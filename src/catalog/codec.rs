//! Value codecs for contact fields
//!
//! A codec turns raw search input (always text at the boundary) and stored
//! JSON values into typed `FieldValue`s.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

/// A typed scalar value, used for record fields and bound parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    /// Creates a text value
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Returns the value as text if it is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer if it is numeric
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// True for empty text; non-text values are never empty
    pub fn is_empty_text(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }

    /// String projection used by collation-aware ordering
    pub fn projection(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Bool(_) => 0,
            FieldValue::Integer(_) => 1,
            FieldValue::Timestamp(_) => 2,
            FieldValue::Text(_) => 3,
        }
    }

    /// Natural ordering of scalar values.
    ///
    /// Ordering rules:
    /// - bool < integer < timestamp < text
    /// - booleans compare as integers against integers
    /// - same types use natural ordering
    pub fn natural_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Bool(_), FieldValue::Integer(_))
            | (FieldValue::Integer(_), FieldValue::Bool(_)) => {
                self.as_i64().cmp(&other.as_i64())
            }
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// How a field's values are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCodec {
    /// Free text, matched with LIKE
    Text,
    /// Exact integer, matched with `=`
    Integer,
    /// Flag stored as 0/1
    Boolean,
    /// Point in time, milliseconds since epoch in storage
    Timestamp,
    /// Comma-separated tokens stored in one text column (e.g. categories)
    List,
}

impl ValueCodec {
    /// Returns the codec name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ValueCodec::Text => "text",
            ValueCodec::Integer => "integer",
            ValueCodec::Boolean => "boolean",
            ValueCodec::Timestamp => "timestamp",
            ValueCodec::List => "list",
        }
    }

    /// Text-valued fields, which sort under a text collation
    pub fn is_textual(&self) -> bool {
        matches!(self, ValueCodec::Text | ValueCodec::List)
    }

    /// Encodes raw search input. Returns None if the input does not parse.
    pub fn encode(&self, raw: &str) -> Option<FieldValue> {
        let trimmed = raw.trim();
        match self {
            ValueCodec::Text | ValueCodec::List => Some(FieldValue::Text(raw.to_string())),
            ValueCodec::Integer => trimmed.parse::<i64>().ok().map(FieldValue::Integer),
            ValueCodec::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(FieldValue::Bool(true)),
                "0" | "false" | "no" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            ValueCodec::Timestamp => parse_timestamp(trimmed).map(FieldValue::Timestamp),
        }
    }

    /// Decodes a stored JSON value. Null decodes to None (absent).
    pub fn decode_json(&self, value: &Value) -> Option<Option<FieldValue>> {
        match (self, value) {
            (_, Value::Null) => Some(None),
            (ValueCodec::Text | ValueCodec::List, Value::String(s)) => {
                Some(Some(FieldValue::Text(s.clone())))
            }
            (ValueCodec::List, Value::Array(items)) => {
                let tokens: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                tokens.map(|t| Some(FieldValue::Text(t.join(","))))
            }
            (ValueCodec::Integer, Value::Number(n)) => n.as_i64().map(|i| Some(FieldValue::Integer(i))),
            (ValueCodec::Boolean, Value::Bool(b)) => Some(Some(FieldValue::Bool(*b))),
            (ValueCodec::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Some(FieldValue::Bool(false))),
                Some(1) => Some(Some(FieldValue::Bool(true))),
                _ => None,
            },
            (ValueCodec::Timestamp, Value::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|ts| Some(FieldValue::Timestamp(ts))),
            (_, Value::String(s)) => self.encode(s).map(Some),
            _ => None,
        }
    }
}

/// Accepts epoch milliseconds, RFC 3339, or a plain `YYYY-MM-DD` date (UTC midnight).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}
