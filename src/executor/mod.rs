//! The query executor: a single [`Executor::execute`] entrypoint that parses
//! SQL, interprets the resulting plan against the storage engine, and shapes
//! the outcome into the result records described in SPEC_FULL.md §6.
//!
//! The executor never propagates an error across its own boundary — every
//! `EngineError` raised by the parser or storage engine is caught and turned
//! into an [`ExecuteResult::Failure`].

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::parser::{self, JoinOn, Plan, Projection};
use crate::predicate::Predicate;
use crate::schema::ColumnDef;
use crate::storage::{Row, StorageEngine};
use crate::value::Value;

/// One projected or joined output row: an ordered column name → value map.
///
/// `IndexMap` rather than a plain `HashMap` so a joined record's keys stay in
/// "left table's columns, in declaration order, then right table's" order
/// when serialized (SPEC_FULL.md §4.3).
pub type ResultRow = IndexMap<String, Value>;

/// One column's `DESCRIBE` entry.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    /// Column name.
    pub column: String,
    /// Canonical SQL type spelling, e.g. `VARCHAR(100)`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Comma-separated constraint list (`PRIMARY KEY, NOT NULL`), or `None`.
    pub constraints: Option<String>,
}

/// The outcome of [`Executor::execute`], one variant per plan kind plus a
/// shared failure shape. Matches the payload table in SPEC_FULL.md §6.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecuteResult {
    /// `CREATE TABLE` succeeded.
    CreateTable {
        /// Always `true` for this variant.
        success: bool,
        /// Human-readable confirmation.
        message: String,
    },
    /// `INSERT` succeeded.
    Insert {
        /// Always `true` for this variant.
        success: bool,
        /// Human-readable confirmation.
        message: String,
        /// The new row's ordinal.
        row_id: usize,
    },
    /// `SELECT` or `SELECT ... JOIN ...` succeeded.
    Rows {
        /// Always `true` for this variant.
        success: bool,
        /// Result rows, after projection.
        rows: Vec<ResultRow>,
        /// `rows.len()`.
        count: usize,
    },
    /// `UPDATE` succeeded.
    Update {
        /// Always `true` for this variant.
        success: bool,
        /// Human-readable confirmation.
        message: String,
        /// Number of rows matched and updated.
        updated_count: usize,
    },
    /// `DELETE` succeeded.
    Delete {
        /// Always `true` for this variant.
        success: bool,
        /// Human-readable confirmation.
        message: String,
        /// Number of rows removed.
        deleted_count: usize,
    },
    /// `SHOW TABLES` succeeded.
    ShowTables {
        /// Always `true` for this variant.
        success: bool,
        /// Table names, in creation order.
        tables: Vec<String>,
        /// `tables.len()`.
        count: usize,
    },
    /// `DESCRIBE` succeeded.
    Describe {
        /// Always `true` for this variant.
        success: bool,
        /// The described table's name.
        table: String,
        /// Columns, in declaration order.
        columns: Vec<ColumnInfo>,
        /// The table's current row count.
        row_count: usize,
    },
    /// Any statement failed, at parse time or execution time.
    Failure {
        /// Always `false` for this variant.
        success: bool,
        /// The error message.
        error: String,
    },
}

impl ExecuteResult {
    fn create_table(table: &str) -> Self {
        Self::CreateTable {
            success: true,
            message: format!("Table '{table}' created successfully"),
        }
    }

    fn insert(row_id: usize) -> Self {
        Self::Insert {
            success: true,
            message: format!("Row inserted with ID {row_id}"),
            row_id,
        }
    }

    fn rows(rows: Vec<ResultRow>) -> Self {
        let count = rows.len();
        Self::Rows {
            success: true,
            rows,
            count,
        }
    }

    fn update(updated_count: usize) -> Self {
        Self::Update {
            success: true,
            message: format!("Updated {updated_count} row(s)"),
            updated_count,
        }
    }

    fn delete(deleted_count: usize) -> Self {
        Self::Delete {
            success: true,
            message: format!("Deleted {deleted_count} row(s)"),
            deleted_count,
        }
    }

    fn show_tables(tables: Vec<String>) -> Self {
        let count = tables.len();
        Self::ShowTables {
            success: true,
            tables,
            count,
        }
    }

    fn describe(table: String, columns: Vec<ColumnInfo>, row_count: usize) -> Self {
        Self::Describe {
            success: true,
            table,
            columns,
            row_count,
        }
    }

    fn failure(err: &EngineError) -> Self {
        Self::Failure {
            success: false,
            error: err.to_string(),
        }
    }

    /// Whether this result represents a successful statement.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

/// Ties the parser and storage engine together behind a single
/// `execute(sql)` entrypoint.
pub struct Executor {
    storage: StorageEngine,
}

impl Executor {
    /// Wraps an already-open storage engine.
    #[must_use]
    pub const fn new(storage: StorageEngine) -> Self {
        Self { storage }
    }

    /// Opens a storage engine at `data_dir` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(StorageEngine::open(data_dir)?))
    }

    /// Parses and executes a single SQL statement.
    ///
    /// Never returns an `Err`: every failure is caught and reshaped into an
    /// [`ExecuteResult::Failure`], matching the "executor never throws across
    /// its boundary" contract in SPEC_FULL.md §6/§7.
    pub fn execute(&self, sql: &str) -> ExecuteResult {
        match self.try_execute(sql) {
            Ok(result) => result,
            Err(err) => {
                warn!(sql, error = %err, "statement failed");
                ExecuteResult::failure(&err)
            }
        }
    }

    fn try_execute(&self, sql: &str) -> Result<ExecuteResult> {
        let plan = parser::parse(sql)?;
        debug!(?plan, "parsed statement");
        match plan {
            Plan::CreateTable { table, columns } => self.execute_create_table(&table, columns),
            Plan::Insert {
                table,
                columns,
                values,
            } => self.execute_insert(&table, columns, values),
            Plan::Select {
                table,
                projection,
                where_clause,
            } => self.execute_select(&table, &projection, where_clause),
            Plan::SelectJoin {
                left_table,
                right_table,
                on,
                projection,
                where_clause,
            } => self.execute_select_join(&left_table, &right_table, &on, &projection, where_clause),
            Plan::Update {
                table,
                assignments,
                where_clause,
            } => self.execute_update(&table, &assignments, where_clause),
            Plan::Delete { table, where_clause } => self.execute_delete(&table, where_clause),
            Plan::ShowTables => self.execute_show_tables(),
            Plan::Describe { table } => self.execute_describe(&table),
        }
    }

    fn execute_create_table(&self, table: &str, columns: Vec<ColumnDef>) -> Result<ExecuteResult> {
        self.storage
            .write(|db| db.create_table(table.to_string(), columns))?;
        info!(table, "table created");
        Ok(ExecuteResult::create_table(table))
    }

    fn execute_insert(
        &self,
        table: &str,
        columns: Option<Vec<String>>,
        values: Vec<Value>,
    ) -> Result<ExecuteResult> {
        let row_id = self.storage.write(|db| {
            let (schema, _) = db.get_table_schema(table)?;
            let schema_columns: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();

            let supplied = match columns {
                Some(names) => {
                    if names.len() != values.len() {
                        return Err(EngineError::Cardinality(
                            "column count doesn't match value count".to_string(),
                        ));
                    }
                    names.into_iter().zip(values).collect::<HashMap<_, _>>()
                }
                None => {
                    if values.len() != schema_columns.len() {
                        return Err(EngineError::Cardinality(format!(
                            "expected {} values, got {}",
                            schema_columns.len(),
                            values.len()
                        )));
                    }
                    schema_columns.into_iter().zip(values).collect::<HashMap<_, _>>()
                }
            };

            db.insert_row(table, &supplied)
        })?;
        info!(table, row_id, "row inserted");
        Ok(ExecuteResult::insert(row_id))
    }

    fn execute_select(
        &self,
        table: &str,
        projection: &Projection,
        where_clause: Option<Predicate>,
    ) -> Result<ExecuteResult> {
        let predicate = where_clause.unwrap_or_default();
        let records = self.storage.read(|db| {
            let (schema, _) = db.get_table_schema(table)?;
            let schema = schema.clone();
            let matched = db.select_rows(table, &predicate)?;
            Ok(matched
                .into_iter()
                .map(|row| row_to_record(&schema, row))
                .collect::<Vec<_>>())
        })?;
        let projected: Vec<ResultRow> = records.iter().map(|r| project(projection, r)).collect();
        Ok(ExecuteResult::rows(projected))
    }

    fn execute_select_join(
        &self,
        left_table: &str,
        right_table: &str,
        on: &JoinOn,
        projection: &Projection,
        where_clause: Option<Predicate>,
    ) -> Result<ExecuteResult> {
        let (left_ref, right_ref) = (
            resolve_qualified(&on.left, left_table),
            resolve_qualified(&on.right, right_table),
        );

        let joined = self.storage.read(|db| {
            let (left_schema, _) = db.get_table_schema(left_table)?;
            let left_schema = left_schema.clone();
            let (right_schema, _) = db.get_table_schema(right_table)?;
            let right_schema = right_schema.clone();

            let left_records: Vec<ResultRow> = db
                .select_rows(left_table, &Predicate::all())?
                .into_iter()
                .map(|row| row_to_record(&left_schema, row))
                .collect();
            let right_records: Vec<ResultRow> = db
                .select_rows(right_table, &Predicate::all())?
                .into_iter()
                .map(|row| row_to_record(&right_schema, row))
                .collect();

            let mut joined = Vec::new();
            for left in &left_records {
                for right in &right_records {
                    let left_value =
                        qualified_value(left, right, &left_ref, left_table, right_table);
                    let right_value =
                        qualified_value(left, right, &right_ref, left_table, right_table);
                    if crate::predicate::values_equal(&left_value, &right_value) {
                        joined.push(merge_joined(left_table, left, right_table, right));
                    }
                }
            }
            Ok(joined)
        })?;

        let filtered = match where_clause {
            Some(predicate) => joined
                .into_iter()
                .filter_map(|row| match predicate.matches(|col| lookup_joined(&row, col)) {
                    Ok(true) => Some(Ok(row)),
                    Ok(false) => None,
                    Err(err) => Some(Err(err)),
                })
                .collect::<Result<Vec<_>>>()?,
            None => joined,
        };

        let projected: Vec<ResultRow> = filtered
            .iter()
            .map(|row| project_joined(projection, row))
            .collect();
        Ok(ExecuteResult::rows(projected))
    }

    fn execute_update(
        &self,
        table: &str,
        assignments: &[(String, Value)],
        where_clause: Predicate,
    ) -> Result<ExecuteResult> {
        if where_clause.is_empty() {
            return Err(EngineError::Safety(
                "UPDATE without WHERE clause not allowed for safety".to_string(),
            ));
        }
        let updated = self
            .storage
            .write(|db| db.update_rows(table, assignments, &where_clause))?;
        info!(table, updated, "rows updated");
        Ok(ExecuteResult::update(updated))
    }

    fn execute_delete(&self, table: &str, where_clause: Predicate) -> Result<ExecuteResult> {
        if where_clause.is_empty() {
            return Err(EngineError::Safety(
                "DELETE without WHERE clause not allowed for safety".to_string(),
            ));
        }
        let deleted = self.storage.write(|db| db.delete_rows(table, &where_clause))?;
        info!(table, deleted, "rows deleted");
        Ok(ExecuteResult::delete(deleted))
    }

    fn execute_show_tables(&self) -> Result<ExecuteResult> {
        self.storage
            .read(|db| Ok(ExecuteResult::show_tables(db.list_tables())))
    }

    fn execute_describe(&self, table: &str) -> Result<ExecuteResult> {
        self.storage.read(|db| {
            let (schema, row_count) = db.get_table_schema(table).map_err(|_| {
                EngineError::Arity(format!("table '{table}' does not exist"))
            })?;
            let columns = schema
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    column: c.name.clone(),
                    ty: c.ty.to_sql(),
                    constraints: c.constraints_string(),
                })
                .collect();
            Ok(ExecuteResult::describe(table.to_string(), columns, row_count))
        })
    }
}

fn row_to_record(schema: &crate::schema::TableSchema, row: &Row) -> ResultRow {
    schema
        .columns
        .iter()
        .zip(&row.values)
        .map(|(col, value)| (col.name.clone(), value.clone()))
        .collect()
}

/// Projects a single-table `SELECT`'s record: `*` passes through unchanged;
/// a named projection silently drops names the row doesn't have.
fn project(projection: &Projection, row: &ResultRow) -> ResultRow {
    match projection {
        Projection::All => row.clone(),
        Projection::Columns(names) => names
            .iter()
            .filter_map(|name| row.get(name).map(|value| (name.clone(), value.clone())))
            .collect(),
    }
}

/// Projects a joined record: verbatim key first, then a `.column` suffix
/// fallback, silently dropping names that match neither.
fn project_joined(projection: &Projection, row: &ResultRow) -> ResultRow {
    match projection {
        Projection::All => row.clone(),
        Projection::Columns(names) => names
            .iter()
            .filter_map(|name| lookup_joined(row, name).map(|value| (name.clone(), value)))
            .collect(),
    }
}

/// Resolves a join-condition side into `(table, column)`: a `table.col`
/// qualifier is split verbatim; an unqualified name takes `default_table`.
fn resolve_qualified(spec: &str, default_table: &str) -> (String, String) {
    spec.split_once('.').map_or_else(
        || (default_table.to_string(), spec.to_string()),
        |(t, c)| (t.to_string(), c.to_string()),
    )
}

fn qualified_value(
    left: &ResultRow,
    right: &ResultRow,
    qualified: &(String, String),
    left_table: &str,
    right_table: &str,
) -> Value {
    let (table, column) = qualified;
    if table == left_table {
        left.get(column).cloned().unwrap_or(Value::Null)
    } else if table == right_table {
        right.get(column).cloned().unwrap_or(Value::Null)
    } else {
        Value::Null
    }
}

/// Combines one matched `(left, right)` pair into a flat record keyed by
/// `table.col`, left table's columns (in declaration order) first.
fn merge_joined(left_table: &str, left: &ResultRow, right_table: &str, right: &ResultRow) -> ResultRow {
    let mut merged = IndexMap::with_capacity(left.len() + right.len());
    for (col, value) in left {
        merged.insert(format!("{left_table}.{col}"), value.clone());
    }
    for (col, value) in right {
        merged.insert(format!("{right_table}.{col}"), value.clone());
    }
    merged
}

/// Resolves a `WHERE`/projection name against a joined record: verbatim key
/// first, falling back to the first key whose `.column` suffix matches.
fn lookup_joined(row: &ResultRow, name: &str) -> Value {
    if let Some(value) = row.get(name) {
        return value.clone();
    }
    let suffix = format!(".{name}");
    row.iter()
        .find(|(key, _)| key.ends_with(&suffix))
        .map_or(Value::Null, |(_, value)| value.clone())
}
