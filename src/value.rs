//! The runtime value model.
//!
//! [`Value`] is the single typed representation every row cell, literal, and
//! predicate operand goes through. Equality and ordering are only ever
//! compared within the same variant; callers that need to compare across
//! variants (predicate evaluation) get an explicit `None`/error instead of a
//! silent `false`.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::Value as Json;

use crate::schema::ColumnType;

/// A single cell value.
///
/// `DateTime` stores an ISO-8601 string verbatim; this crate never parses or
/// validates it (see the Open Questions in SPEC_FULL.md). It is kept as a
/// distinct variant from `Text` so a column's declared type can be recovered
/// when reloading a row from disk, even though both serialize to a plain
/// JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`. Never satisfies any comparison, including `=`.
    Null,
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A text/varchar-backing string.
    Text(String),
    /// An ISO-8601 datetime string, stored and compared verbatim.
    DateTime(String),
}

impl Value {
    /// Returns the canonical index key for this value, or `None` for `Null`
    /// (which is never indexed).
    ///
    /// The type-tag prefix keeps distinct variants from colliding, e.g. the
    /// integer `1` and the text `"1"` never share an index slot.
    #[must_use]
    pub fn index_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(n) => Some(format!("i:{n}")),
            Self::Float(f) => Some(format!("f:{f}")),
            Self::Bool(b) => Some(format!("b:{b}")),
            Self::Text(s) => Some(format!("s:{s}")),
            Self::DateTime(s) => Some(format!("d:{s}")),
        }
    }

    /// Human-readable rendering used in error messages.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) | Self::DateTime(s) => s.clone(),
        }
    }

    /// Stringifies the value regardless of variant, used for coercion into
    /// `VARCHAR`/`DATETIME` columns and for the permissive `BOOLEAN` coercion.
    #[must_use]
    pub fn stringify(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) | Self::DateTime(s) => s.clone(),
        }
    }

    /// Whether this value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Reconstructs a typed `Value` from a raw JSON scalar and the column
    /// type it was stored under.
    ///
    /// This is schema-directed rather than relying on `Value`'s own
    /// `Deserialize`, because a bare JSON string is ambiguous between `Text`
    /// and `DateTime` without knowing which column it came from.
    #[must_use]
    pub fn from_json(json: &Json, ty: &ColumnType) -> Self {
        if json.is_null() {
            return Self::Null;
        }
        match ty {
            ColumnType::Int => json.as_i64().map_or(Self::Null, Self::Int),
            ColumnType::Float => json.as_f64().map_or(Self::Null, Self::Float),
            ColumnType::Boolean => json.as_bool().map_or(Self::Null, Self::Bool),
            ColumnType::DateTime => json
                .as_str()
                .map_or(Self::Null, |s| Self::DateTime(s.to_string())),
            ColumnType::Varchar(_) => json
                .as_str()
                .map_or(Self::Null, |s| Self::Text(s.to_string())),
        }
    }

    /// Compares two values of the same variant, returning `None` if either is
    /// `Null`, the variants differ, or the variant has no natural order
    /// (there is none that falls in that last case today, but the `None`
    /// path is how a mismatched-variant comparison is surfaced to the caller).
    #[must_use]
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) | (Self::DateTime(a), Self::DateTime(b)) => {
                a.partial_cmp(b)
            }
            _ => None,
        }
    }

    /// Whether `self` and `other` are the same variant (ignoring payload).
    #[must_use]
    pub const fn same_variant(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Null, Self::Null)
                | (Self::Int(_), Self::Int(_))
                | (Self::Float(_), Self::Float(_))
                | (Self::Bool(_), Self::Bool(_))
                | (Self::Text(_), Self::Text(_))
                | (Self::DateTime(_), Self::DateTime(_))
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
