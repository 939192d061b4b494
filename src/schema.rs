//! Column types, column definitions, and table schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A declared SQL column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// ISO-8601 datetime, stored verbatim.
    DateTime,
    /// Variable-length string with a maximum character count.
    Varchar(usize),
}

impl ColumnType {
    /// Parses a type token such as `INT`, `VARCHAR(100)`, or `FLOAT`.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let upper = token.to_uppercase();
        if upper == "INT" {
            return Ok(Self::Int);
        }
        if upper == "FLOAT" {
            return Ok(Self::Float);
        }
        if upper == "BOOLEAN" {
            return Ok(Self::Boolean);
        }
        if upper == "DATETIME" {
            return Ok(Self::DateTime);
        }
        if let Some(rest) = upper.strip_prefix("VARCHAR") {
            let rest = rest.trim();
            let inner = rest
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .ok_or_else(|| EngineError::Syntax(format!("invalid column type '{token}'")))?;
            let n: usize = inner
                .trim()
                .parse()
                .map_err(|_| EngineError::Syntax(format!("invalid VARCHAR length in '{token}'")))?;
            if n == 0 {
                return Err(EngineError::Syntax(
                    "VARCHAR length must be at least 1".to_string(),
                ));
            }
            return Ok(Self::Varchar(n));
        }
        Err(EngineError::Schema(format!("unknown column type '{token}'")))
    }

    /// Canonical SQL spelling, used by `DESCRIBE` and persistence.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Int => "INT".to_string(),
            Self::Float => "FLOAT".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::DateTime => "DATETIME".to_string(),
            Self::Varchar(n) => format!("VARCHAR({n})"),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// A single column's definition, as produced by `CREATE TABLE` parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub ty: ColumnType,
    /// Whether this column is the table's primary key.
    pub primary_key: bool,
    /// Whether this column carries a `UNIQUE` constraint.
    ///
    /// Never `true` at the same time as `primary_key` — the primary key is
    /// its own kind of uniqueness and a redundant `UNIQUE` is dropped by the
    /// parser.
    pub unique: bool,
    /// Whether this column is `NOT NULL`.
    pub not_null: bool,
}

impl ColumnDef {
    /// Creates a new column definition with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            unique: false,
            not_null: false,
        }
    }

    /// Marks the column as a primary key: implies `NOT NULL` and suppresses
    /// a redundant `UNIQUE` flag.
    #[must_use]
    pub fn mark_primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self.unique = false;
        self
    }

    /// Renders the `DESCRIBE` constraints string, or `None` if the column has
    /// no constraints.
    #[must_use]
    pub fn constraints_string(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.primary_key {
            parts.push("PRIMARY KEY");
        }
        if self.unique && !self.primary_key {
            parts.push("UNIQUE");
        }
        if self.not_null {
            parts.push("NOT NULL");
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// A table's schema: its name, ordered columns, and derived index columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in declaration order. This order is authoritative for
    /// positional row storage, `DESCRIBE`, and bare `INSERT ... VALUES`.
    pub columns: Vec<ColumnDef>,
    /// The primary key column name, if any.
    pub primary_key: Option<String>,
    /// Names of columns carrying a `UNIQUE` constraint (excludes the PK).
    pub unique_keys: Vec<String>,
}

impl TableSchema {
    /// Builds a schema from parsed column definitions, validating that at
    /// most one column is a primary key.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self> {
        let primary_keys: Vec<&str> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if primary_keys.len() > 1 {
            return Err(EngineError::Schema(
                "multiple primary keys not supported".to_string(),
            ));
        }
        let primary_key = primary_keys.first().map(|s| (*s).to_string());
        let unique_keys = columns
            .iter()
            .filter(|c| c.unique && !c.primary_key)
            .map(|c| c.name.clone())
            .collect();

        Ok(Self {
            name: name.into(),
            columns,
            primary_key,
            unique_keys,
        })
    }

    /// Returns the positional index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the column definition by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Every column name that should be indexed: the primary key plus all
    /// unique columns.
    #[must_use]
    pub fn indexed_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::new();
        if let Some(pk) = &self.primary_key {
            cols.push(pk.as_str());
        }
        cols.extend(self.unique_keys.iter().map(String::as_str));
        cols
    }

    /// Whether `column` is the primary key or a unique column.
    #[must_use]
    pub fn is_indexed(&self, column: &str) -> bool {
        self.primary_key.as_deref() == Some(column)
            || self.unique_keys.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_varchar_with_length() {
        assert_eq!(ColumnType::parse("VARCHAR(100)").unwrap(), ColumnType::Varchar(100));
    }

    #[test]
    fn rejects_zero_length_varchar() {
        assert!(ColumnType::parse("VARCHAR(0)").is_err());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(ColumnType::parse("int").unwrap(), ColumnType::Int);
        assert_eq!(ColumnType::parse("boolean").unwrap(), ColumnType::Boolean);
    }

    #[test]
    fn primary_key_implies_not_null_and_suppresses_unique() {
        let col = ColumnDef::new("id", ColumnType::Int)
            .mark_primary_key();
        assert!(col.not_null);
        assert!(!col.unique);
        assert_eq!(col.constraints_string().as_deref(), Some("PRIMARY KEY, NOT NULL"));
    }

    #[test]
    fn rejects_multiple_primary_keys() {
        let cols = vec![
            ColumnDef::new("a", ColumnType::Int).mark_primary_key(),
            ColumnDef::new("b", ColumnType::Int).mark_primary_key(),
        ];
        assert!(TableSchema::new("t", cols).is_err());
    }
}
