//! On-disk representation of a [`Database`](super::Database) and the
//! write-temp-then-rename logic that replaces the original source's
//! write-in-place approach.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::Result;
use crate::schema::{ColumnDef, TableSchema};
use crate::value::Value;

use super::{Database, Index, Row, Table};

const TABLES_FILE: &str = "tables.json";
const INDEXES_FILE: &str = "indexes.json";
const ROW_ID_KEY: &str = "_row_id";

/// On-disk shape of a single table, matching `tables.json`'s documented
/// layout: columns, rows (each carrying its `_row_id`), primary key, and
/// unique key names.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedTable {
    columns: Vec<ColumnDef>,
    rows: Vec<Map<String, Json>>,
    primary_key: Option<String>,
    unique_keys: Vec<String>,
}

type PersistedTables = IndexMap<String, PersistedTable>;
type PersistedIndexes = HashMap<String, HashMap<String, Index>>;

/// Loads a [`Database`] from `data_dir`, treating missing or unparseable
/// files as an empty database rather than failing startup.
pub fn load(data_dir: &Path) -> Database {
    let tables_path = data_dir.join(TABLES_FILE);
    let indexes_path = data_dir.join(INDEXES_FILE);

    let tables = read_json::<PersistedTables>(&tables_path)
        .map(|persisted| {
            persisted
                .into_iter()
                .map(|(name, t)| {
                    let table = t.into_table(name.clone());
                    (name, table)
                })
                .collect()
        })
        .unwrap_or_default();

    let indexes = read_json::<PersistedIndexes>(&indexes_path).unwrap_or_default();

    Database { tables, indexes }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not read persistence file, starting empty");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt persistence file, treating as empty");
            None
        }
    }
}

/// Writes both persistence files in full, each via a temp-file-then-rename
/// so a crash mid-write never leaves a half-written file behind.
pub fn save(data_dir: &Path, db: &Database) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let persisted_tables: PersistedTables = db
        .tables
        .iter()
        .map(|(name, table)| (name.clone(), PersistedTable::from_table(table)))
        .collect();
    write_json_atomic(&data_dir.join(TABLES_FILE), &persisted_tables)?;
    write_json_atomic(&data_dir.join(INDEXES_FILE), &db.indexes)?;

    tracing::debug!(tables = db.tables.len(), "persisted database");
    Ok(())
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

impl PersistedTable {
    fn from_table(table: &Table) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|row| row_to_json(&table.schema, row))
            .collect();
        Self {
            columns: table.schema.columns.clone(),
            rows,
            primary_key: table.schema.primary_key.clone(),
            unique_keys: table.schema.unique_keys.clone(),
        }
    }

    fn into_table(self, name: String) -> Table {
        let schema = TableSchema {
            name,
            columns: self.columns,
            primary_key: self.primary_key,
            unique_keys: self.unique_keys,
        };
        let rows = self
            .rows
            .into_iter()
            .enumerate()
            .map(|(row_id, obj)| row_from_json(&schema, row_id, &obj))
            .collect();
        Table { schema, rows }
    }
}

fn row_to_json(schema: &TableSchema, row: &Row) -> Map<String, Json> {
    let mut obj = Map::new();
    for (col, value) in schema.columns.iter().zip(&row.values) {
        obj.insert(col.name.clone(), serde_json::to_value(value).unwrap_or(Json::Null));
    }
    obj.insert(ROW_ID_KEY.to_string(), Json::from(row.row_id));
    obj
}

fn row_from_json(schema: &TableSchema, row_id: usize, obj: &Map<String, Json>) -> Row {
    let values = schema
        .columns
        .iter()
        .map(|col| {
            obj.get(&col.name)
                .map(|json| Value::from_json(json, &col.ty))
                .unwrap_or(Value::Null)
        })
        .collect();
    // The row's position in the file is authoritative; an embedded _row_id
    // that disagrees (e.g. hand-edited file) is not trusted.
    Row { row_id, values }
}
