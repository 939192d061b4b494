//! The engine's single error type.
//!
//! Every fallible operation in the parser and storage layers returns
//! `Result<T, EngineError>`; the executor is the only place that converts an
//! `EngineError` into a user-facing string, at the `ExecuteResult` boundary.

/// Errors produced by parsing, storage, or execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unrecognized statement or malformed clause.
    #[error("{0}")]
    Syntax(String),

    /// Table already exists / does not exist, or an unknown type in a
    /// column declaration.
    #[error("{0}")]
    Schema(String),

    /// `NOT NULL` violation or a primary-key/unique conflict.
    #[error("{0}")]
    Constraint(String),

    /// A value does not coerce to its column's declared type.
    #[error("{0}")]
    Type(String),

    /// `INSERT` column/value count mismatch.
    #[error("{0}")]
    Cardinality(String),

    /// `UPDATE`/`DELETE` attempted without a `WHERE` clause.
    #[error("{0}")]
    Safety(String),

    /// `DESCRIBE` of an unknown table.
    #[error("{0}")]
    Arity(String),

    /// Failure reading or writing the persistence files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure (de)serializing the persistence files.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
