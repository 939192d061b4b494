//! A small embeddable relational database engine.
//!
//! `oxide-rdbms` parses a subset of SQL, stores typed rows with primary-key
//! and unique indexes, and executes selection, projection, predicate
//! evaluation, two-table inner equi-joins, and safe mutation — all behind a
//! single [`Executor::execute`] entrypoint that never panics or throws across
//! its boundary.
//!
//! # Architecture
//!
//! - **[`value`]** — the typed [`Value`](value::Value) cell model and column
//!   type descriptors shared by every other module.
//! - **[`schema`]** — column and table schema records, plus `CREATE TABLE`
//!   constraint validation.
//! - **[`parser`]** — lexing-by-regex SQL parsing into a typed [`Plan`](parser::Plan).
//! - **[`predicate`]** — `WHERE`-clause conditions and the matching algorithm
//!   shared by `SELECT`, `UPDATE`, `DELETE`, and joined `SELECT`.
//! - **[`storage`]** — the in-memory [`Database`](storage::Database): tables,
//!   indexes, constraint enforcement, and write-through JSON persistence.
//! - **[`executor`]** — interprets a [`Plan`](parser::Plan) against the
//!   storage engine and shapes the result.
//!
//! This crate deliberately stops at that boundary: an HTTP/REST surface, an
//! interactive shell, request validation, process bootstrap, and CORS are all
//! external collaborators that consume [`Executor::execute`] and inspect its
//! [`ExecuteResult`](executor::ExecuteResult).
//!
//! # Example
//!
//! ```
//! use oxide_rdbms::Executor;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let executor = Executor::open(dir.path()).unwrap();
//!
//! executor.execute("CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100) NOT NULL)");
//! let result = executor.execute("INSERT INTO categories VALUES (1, 'Books')");
//! assert!(result.is_success());
//!
//! let result = executor.execute("SELECT * FROM categories WHERE id = 1");
//! assert!(result.is_success());
//! ```

pub mod error;
pub mod executor;
pub mod parser;
pub mod predicate;
pub mod schema;
pub mod storage;
pub mod value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{EngineError, Result};
    pub use crate::executor::{ColumnInfo, ExecuteResult, Executor, ResultRow};
    pub use crate::parser::{JoinOn, Plan, Projection};
    pub use crate::predicate::{ComparisonOp, Condition, Predicate};
    pub use crate::schema::{ColumnDef, ColumnType, TableSchema};
    pub use crate::storage::{Database, StorageEngine};
    pub use crate::value::Value;
}

pub use executor::{ExecuteResult, Executor};
pub use value::Value;
