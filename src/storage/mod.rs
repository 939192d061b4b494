//! The in-memory storage engine: typed tables, primary-key/unique indexes,
//! constraint enforcement, and write-through persistence.

mod persist;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::error::{EngineError, Result};
use crate::predicate::Predicate;
use crate::schema::{ColumnDef, ColumnType, TableSchema};
use crate::value::Value;

/// A per-column index: canonical value key → row ordinal.
pub type Index = HashMap<String, usize>;

/// A single stored row: a positional value list aligned with the owning
/// table's column order, plus the row's current ordinal.
#[derive(Debug, Clone)]
pub struct Row {
    /// The row's position in its table's row list. Recomputed after every
    /// deletion; never exposed as a user-facing column.
    pub row_id: usize,
    /// Column values, in the same order as `TableSchema::columns`.
    pub values: Vec<Value>,
}

/// A table: its schema plus its rows, in insertion order (row order is
/// otherwise unspecified beyond "whatever `row_id` says").
#[derive(Debug, Clone)]
pub struct Table {
    /// The table's schema.
    pub schema: TableSchema,
    /// The table's rows.
    pub rows: Vec<Row>,
}

impl Table {
    fn row_value(&self, row: &Row, column: &str) -> Value {
        self.schema
            .column_index(column)
            .and_then(|idx| row.values.get(idx))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// The full set of tables and their indexes.
#[derive(Debug, Default)]
pub struct Database {
    /// Tables, in creation order (`SHOW TABLES` depends on this order).
    pub tables: IndexMap<String, Table>,
    /// Per-table, per-column indexes.
    pub indexes: HashMap<String, HashMap<String, Index>>,
}

impl Database {
    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| EngineError::Schema(format!("table '{name}' does not exist")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| EngineError::Schema(format!("table '{name}' does not exist")))
    }

    /// Creates a table and its primary-key/unique indexes.
    pub fn create_table(&mut self, name: String, columns: Vec<ColumnDef>) -> Result<()> {
        if self.tables.contains_key(&name) {
            return Err(EngineError::Schema(format!("table '{name}' already exists")));
        }
        let schema = TableSchema::new(name.clone(), columns)?;
        let mut indexes = HashMap::new();
        for col in schema.indexed_columns() {
            indexes.insert(col.to_string(), Index::new());
        }
        self.indexes.insert(name.clone(), indexes);
        self.tables.insert(name, Table { schema, rows: Vec::new() });
        Ok(())
    }

    /// Drops a table and its indexes together.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if !self.tables.contains_key(name) {
            return Err(EngineError::Schema(format!("table '{name}' does not exist")));
        }
        self.tables.shift_remove(name);
        self.indexes.remove(name);
        Ok(())
    }

    /// Inserts a row, enforcing `NOT NULL`, type coercion, and primary
    /// key/unique constraints, in that order.
    pub fn insert_row(&mut self, table_name: &str, supplied: &HashMap<String, Value>) -> Result<usize> {
        let table = self.table_mut(table_name)?;
        let mut values = Vec::with_capacity(table.schema.columns.len());
        for col in &table.schema.columns {
            let raw = supplied.get(&col.name).cloned().unwrap_or(Value::Null);
            if col.not_null && raw.is_null() {
                return Err(EngineError::Constraint(format!(
                    "column '{}' cannot be NULL",
                    col.name
                )));
            }
            values.push(coerce(&raw, &col.ty)?);
        }

        let indexes = self.indexes.entry(table_name.to_string()).or_default();
        for col in table.schema.indexed_columns() {
            let idx = table.schema.column_index(col).expect("indexed column must exist");
            if let Some(key) = values[idx].index_key() {
                if indexes.get(col).is_some_and(|m| m.contains_key(&key)) {
                    return Err(EngineError::Constraint(format!(
                        "constraint violation: {} already exists",
                        values[idx]
                    )));
                }
            }
        }

        let row_id = table.rows.len();
        for col in table.schema.indexed_columns() {
            let idx = table.schema.column_index(col).expect("indexed column must exist");
            if let Some(key) = values[idx].index_key() {
                indexes.entry(col.to_string()).or_default().insert(key, row_id);
            }
        }
        table.rows.push(Row { row_id, values });
        Ok(row_id)
    }

    /// Returns rows matching `predicate` (all rows if `None`/empty).
    pub fn select_rows(&self, table_name: &str, predicate: &Predicate) -> Result<Vec<&Row>> {
        let table = self.table(table_name)?;
        if predicate.is_empty() {
            return Ok(table.rows.iter().collect());
        }
        let mut matched = Vec::new();
        for row in &table.rows {
            if predicate.matches(|col| table.row_value(row, col))? {
                matched.push(row);
            }
        }
        Ok(matched)
    }

    /// Updates matching rows in place, scanning all other rows for
    /// conflicts on primary-key/unique assignments (not via the index, to
    /// match the original source's exact — if asymptotically wasteful —
    /// behavior).
    pub fn update_rows(
        &mut self,
        table_name: &str,
        assignments: &[(String, Value)],
        predicate: &Predicate,
    ) -> Result<usize> {
        let table = self.table_mut(table_name)?;
        let matches: Vec<usize> = table
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                match predicate.matches(|col| table.row_value(row, col)) {
                    Ok(true) => Some(Ok(i)),
                    Ok(false) => None,
                    Err(err) => Some(Err(err)),
                }
            })
            .collect::<Result<Vec<usize>>>()?;

        let indexes = self.indexes.entry(table_name.to_string()).or_default();
        let mut updated = 0usize;
        for i in matches {
            for (col_name, new_value) in assignments {
                let col_idx = table
                    .schema
                    .column_index(col_name)
                    .ok_or_else(|| EngineError::Schema(format!("unknown column '{col_name}'")))?;
                let col = table.schema.columns[col_idx].clone();

                if table.schema.is_indexed(col_name) {
                    let conflict = table
                        .rows
                        .iter()
                        .enumerate()
                        .any(|(j, row)| j != i && &row.values[col_idx] == new_value);
                    if conflict {
                        return Err(EngineError::Constraint(format!(
                            "constraint violation: {new_value} already exists"
                        )));
                    }
                }

                let coerced = coerce(new_value, &col.ty)?;
                let old_value = table.rows[i].values[col_idx].clone();
                table.rows[i].values[col_idx] = coerced.clone();

                if table.schema.is_indexed(col_name) {
                    let index = indexes.entry(col_name.clone()).or_default();
                    if let Some(old_key) = old_value.index_key() {
                        index.remove(&old_key);
                    }
                    if let Some(new_key) = coerced.index_key() {
                        index.insert(new_key, i);
                    }
                }
            }
            updated += 1;
        }
        Ok(updated)
    }

    /// Deletes matching rows and fully rebuilds the table's indexes so every
    /// ordinal stays consistent with the surviving rows' positions.
    pub fn delete_rows(&mut self, table_name: &str, predicate: &Predicate) -> Result<usize> {
        let table = self.table_mut(table_name)?;
        let mut to_delete = Vec::new();
        for (i, row) in table.rows.iter().enumerate() {
            if predicate.matches(|col| table.row_value(row, col))? {
                to_delete.push(i);
            }
        }
        for &i in to_delete.iter().rev() {
            table.rows.remove(i);
        }
        let deleted = to_delete.len();
        self.rebuild_indexes(table_name);
        Ok(deleted)
    }

    fn rebuild_indexes(&mut self, table_name: &str) {
        let Some(table) = self.tables.get_mut(table_name) else {
            return;
        };
        let mut fresh: HashMap<String, Index> = table
            .schema
            .indexed_columns()
            .into_iter()
            .map(|c| (c.to_string(), Index::new()))
            .collect();
        for (i, row) in table.rows.iter_mut().enumerate() {
            row.row_id = i;
            for col in table.schema.indexed_columns() {
                let idx = table.schema.column_index(col).expect("indexed column must exist");
                if let Some(key) = row.values[idx].index_key() {
                    fresh.get_mut(col).expect("entry seeded above").insert(key, i);
                }
            }
        }
        self.indexes.insert(table_name.to_string(), fresh);
    }

    /// Returns a table's schema and row count.
    pub fn get_table_schema(&self, name: &str) -> Result<(&TableSchema, usize)> {
        let table = self.table(name)?;
        Ok((&table.schema, table.rows.len()))
    }

    /// Table names in creation order.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

/// Coerces `value` to `ty`, per SPEC_FULL.md §4.4.
pub fn coerce(value: &Value, ty: &ColumnType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        ColumnType::Int => match value {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Float(f) => Ok(Value::Int(*f as i64)),
            Value::Text(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| type_error(value, ty)),
            _ => Err(type_error(value, ty)),
        },
        ColumnType::Float => match value {
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::Text(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| type_error(value, ty)),
            _ => Err(type_error(value, ty)),
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            other => {
                let s = other.stringify().to_lowercase();
                Ok(Value::Bool(matches!(s.as_str(), "true" | "1" | "yes" | "on")))
            }
        },
        ColumnType::DateTime => Ok(Value::DateTime(value.stringify())),
        ColumnType::Varchar(max_len) => {
            let s = value.stringify();
            let len = s.chars().count();
            if len > *max_len {
                return Err(EngineError::Type(format!(
                    "invalid value '{s}' for type '{ty}': string too long ({len} > {max_len})"
                )));
            }
            Ok(Value::Text(s))
        }
    }
}

fn type_error(value: &Value, ty: &ColumnType) -> EngineError {
    EngineError::Type(format!("invalid value '{value}' for type '{ty}'"))
}

/// An embeddable, file-backed storage engine guarded by a single exclusive
/// lock: every statement, read or write, holds the lock for its whole
/// duration (see SPEC_FULL.md §5).
pub struct StorageEngine {
    database: Mutex<Database>,
    data_dir: PathBuf,
}

impl StorageEngine {
    /// Opens (or creates) a storage engine backed by `data_dir`, loading any
    /// existing `tables.json`/`indexes.json`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let database = persist::load(&data_dir);
        tracing::info!(dir = %data_dir.display(), tables = database.tables.len(), "opened storage engine");
        Ok(Self {
            database: Mutex::new(database),
            data_dir,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.database.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the exclusive lock, without persisting afterward. Used
    /// for read-only statements.
    pub fn read<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        f(&guard)
    }

    /// Runs `f` under the exclusive lock and persists the database in full
    /// afterward, regardless of which table(s) changed.
    pub fn write<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let result = f(&mut guard)?;
        if let Err(err) = persist::save(&self.data_dir, &guard) {
            tracing::warn!(error = %err, "failed to persist database after mutation");
        }
        Ok(result)
    }

    /// The data directory this engine persists to.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Condition, ComparisonOp};

    fn sample_schema() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", ColumnType::Int).mark_primary_key(),
            ColumnDef::new("name", ColumnType::Varchar(100)),
        ]
    }

    #[test]
    fn insert_enforces_primary_key_uniqueness() {
        let mut db = Database::default();
        db.create_table("t".into(), sample_schema()).unwrap();
        let mut row = HashMap::new();
        row.insert("id".into(), Value::Int(1));
        row.insert("name".into(), Value::Text("Books".into()));
        assert_eq!(db.insert_row("t", &row).unwrap(), 0);
        let err = db.insert_row("t", &row).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn not_null_violation_is_rejected() {
        let mut db = Database::default();
        db.create_table(
            "t".into(),
            vec![ColumnDef::new("id", ColumnType::Int).mark_primary_key()],
        )
        .unwrap();
        let row = HashMap::new();
        assert!(db.insert_row("t", &row).is_err());
    }

    #[test]
    fn delete_rebuilds_row_ids_and_indexes() {
        let mut db = Database::default();
        db.create_table("t".into(), sample_schema()).unwrap();
        for i in 0..3 {
            let mut row = HashMap::new();
            row.insert("id".into(), Value::Int(i));
            row.insert("name".into(), Value::Text(format!("n{i}")));
            db.insert_row("t", &row).unwrap();
        }
        let predicate = crate::predicate::Predicate {
            conditions: vec![Condition { column: "id".into(), op: ComparisonOp::Eq, literal: Value::Int(1) }],
        };
        assert_eq!(db.delete_rows("t", &predicate).unwrap(), 1);
        let table = db.tables.get("t").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].row_id, 0);
        assert_eq!(table.rows[1].row_id, 1);
        let index = &db.indexes["t"]["id"];
        assert_eq!(index.len(), 2);
        assert!(!index.contains_key(&Value::Int(1).index_key().unwrap()));
    }

    #[test]
    fn varchar_length_violation_is_a_type_error() {
        let mut db = Database::default();
        db.create_table(
            "t".into(),
            vec![ColumnDef::new("name", ColumnType::Varchar(5))],
        )
        .unwrap();
        let mut row = HashMap::new();
        row.insert("name".into(), Value::Text("abcdef".into()));
        let err = db.insert_row("t", &row).unwrap_err();
        assert!(matches!(err, EngineError::Type(_)));
    }

    #[test]
    fn int_coercion_truncates_non_integral_floats() {
        assert_eq!(
            coerce(&Value::Float(3.7), &ColumnType::Int).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            coerce(&Value::Float(-3.7), &ColumnType::Int).unwrap(),
            Value::Int(-3)
        );
    }

    #[test]
    fn int_coercion_rejects_non_integral_numeric_strings() {
        assert!(matches!(
            coerce(&Value::Text("3.7".into()), &ColumnType::Int),
            Err(EngineError::Type(_))
        ));
    }

    #[test]
    fn boolean_coercion_is_permissive() {
        assert_eq!(
            coerce(&Value::Text("yes".into()), &ColumnType::Boolean).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            coerce(&Value::Text("nah".into()), &ColumnType::Boolean).unwrap(),
            Value::Bool(false)
        );
    }
}
