//! SQL text → typed [`Plan`] parsing.
//!
//! The grammar is intentionally small: each statement kind is recognized by
//! its leading keyword and parsed with a handful of anchored regexes, mirroring
//! the lexing-by-regex design in SPEC_FULL.md §4.1 rather than a full
//! tokenizer/recursive-descent pipeline. Keywords are case-insensitive;
//! identifiers are preserved verbatim.

mod split;

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{EngineError, Result};
use crate::predicate::{ComparisonOp, Condition, Predicate};
use crate::schema::{ColumnDef, ColumnType};
use crate::value::Value;

use split::split_top_level;

/// A join's `ON left = right` condition, each side optionally table-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOn {
    /// Left-hand side, e.g. `products.category_id` or `category_id`.
    pub left: String,
    /// Right-hand side, e.g. `categories.id` or `id`.
    pub right: String,
}

/// What a `SELECT`'s projection list names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `SELECT *`.
    All,
    /// `SELECT a, b, c`.
    Columns(Vec<String>),
}

/// A parsed, typed representation of one SQL statement.
#[derive(Debug, Clone)]
pub enum Plan {
    /// `CREATE TABLE t (...)`.
    CreateTable {
        /// Table name.
        table: String,
        /// Column definitions, in declaration order.
        columns: Vec<ColumnDef>,
    },
    /// `INSERT INTO t [(cols)] VALUES (...)`.
    Insert {
        /// Table name.
        table: String,
        /// Explicit column list, if the statement names one.
        columns: Option<Vec<String>>,
        /// Literal values, in statement order.
        values: Vec<Value>,
    },
    /// `SELECT ... FROM t [WHERE ...]`.
    Select {
        /// Table name.
        table: String,
        /// Projection.
        projection: Projection,
        /// Optional predicate.
        where_clause: Option<Predicate>,
    },
    /// `SELECT ... FROM t1 JOIN t2 ON ... [WHERE ...]`.
    SelectJoin {
        /// Left table name.
        left_table: String,
        /// Right table name.
        right_table: String,
        /// Join condition.
        on: JoinOn,
        /// Projection.
        projection: Projection,
        /// Optional predicate, evaluated over the joined record.
        where_clause: Option<Predicate>,
    },
    /// `UPDATE t SET ... WHERE ...`. The `WHERE` clause is mandatory.
    Update {
        /// Table name.
        table: String,
        /// `(column, new value)` assignments, in statement order.
        assignments: Vec<(String, Value)>,
        /// Mandatory predicate.
        where_clause: Predicate,
    },
    /// `DELETE FROM t WHERE ...`. The `WHERE` clause is mandatory.
    Delete {
        /// Table name.
        table: String,
        /// Mandatory predicate.
        where_clause: Predicate,
    },
    /// `SHOW TABLES`.
    ShowTables,
    /// `DESCRIBE t`.
    Describe {
        /// Table name.
        table: String,
    },
}

fn regex<'a>(cell: &'a OnceLock<Regex>, pattern: &str) -> &'a Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is valid regex"))
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            regex(&CELL, $pattern)
        }
    };
}

static_regex!(
    create_table_re,
    r"(?is)^CREATE\s+TABLE\s+(\w+)\s*\((.*)\)$"
);
static_regex!(
    insert_values_re,
    r"(?is)^INSERT\s+INTO\s+(\w+)\s+VALUES\s*\((.*)\)$"
);
static_regex!(
    insert_columns_re,
    r"(?is)^INSERT\s+INTO\s+(\w+)\s*\((.*?)\)\s+VALUES\s*\((.*)\)$"
);
static_regex!(
    select_join_re,
    r"(?is)^SELECT\s+(.*?)\s+FROM\s+(\w+)\s+JOIN\s+(\w+)\s+ON\s+(.*?)(?:\s+WHERE\s+(.*))?$"
);
static_regex!(
    select_re,
    r"(?is)^SELECT\s+(.*?)\s+FROM\s+(\w+)(?:\s+WHERE\s+(.*))?$"
);
static_regex!(
    update_re,
    r"(?is)^UPDATE\s+(\w+)\s+SET\s+(.*?)(?:\s+WHERE\s+(.*))?$"
);
static_regex!(delete_re, r"(?is)^DELETE\s+FROM\s+(\w+)(?:\s+WHERE\s+(.*))?$");
static_regex!(describe_re, r"(?is)^DESCRIBE\s+(\w+)$");

/// Parses a single SQL statement into a [`Plan`].
///
/// Trims surrounding whitespace and a trailing `;`, then dispatches on the
/// first uppercased word.
pub fn parse(sql: &str) -> Result<Plan> {
    let stmt = sql.trim().trim_end_matches(';').trim();
    let first_word = stmt
        .split_whitespace()
        .next()
        .ok_or_else(|| EngineError::Syntax("empty query".to_string()))?
        .to_uppercase();

    match first_word.as_str() {
        "CREATE" => parse_create_table(stmt),
        "INSERT" => parse_insert(stmt),
        "SELECT" => parse_select(stmt),
        "UPDATE" => parse_update(stmt),
        "DELETE" => parse_delete(stmt),
        "SHOW" => parse_show(stmt),
        "DESCRIBE" => parse_describe(stmt),
        other => Err(EngineError::Syntax(format!(
            "unsupported query type: {other}"
        ))),
    }
}

fn parse_create_table(stmt: &str) -> Result<Plan> {
    let caps = create_table_re()
        .captures(stmt)
        .ok_or_else(|| EngineError::Syntax("invalid CREATE TABLE syntax".to_string()))?;
    let table = caps[1].to_string();
    let columns = parse_column_definitions(&caps[2])?;
    Ok(Plan::CreateTable { table, columns })
}

fn parse_column_definitions(columns_str: &str) -> Result<Vec<ColumnDef>> {
    split_top_level(columns_str)
        .into_iter()
        .map(|col_def| parse_column_definition(&col_def))
        .collect()
}

fn parse_column_definition(col_def: &str) -> Result<ColumnDef> {
    let mut parts = col_def.split_whitespace();
    let name = parts
        .next()
        .ok_or_else(|| EngineError::Syntax(format!("invalid column definition: {col_def}")))?;
    let ty_token = parts
        .next()
        .ok_or_else(|| EngineError::Syntax(format!("invalid column definition: {col_def}")))?;

    // VARCHAR(100) may have been split from its size by whitespace (it
    // shouldn't, but be tolerant of `VARCHAR (100)`); re-glue when the next
    // token opens a paren the type token didn't close.
    let rest: Vec<&str> = parts.collect();
    let (ty_token, rest) = if ty_token.to_uppercase().starts_with("VARCHAR") && !ty_token.contains('(') {
        if let Some((size, tail)) = rest.split_first() {
            (format!("{ty_token}{size}"), tail.to_vec())
        } else {
            (ty_token.to_string(), rest)
        }
    } else {
        (ty_token.to_string(), rest)
    };
    let ty = ColumnType::parse(&ty_token)?;

    let remaining = rest.join(" ").to_uppercase();
    let mut col = ColumnDef::new(name, ty);
    if remaining.contains("PRIMARY KEY") {
        col = col.mark_primary_key();
    } else {
        if remaining.contains("UNIQUE") {
            col.unique = true;
        }
        if remaining.contains("NOT NULL") {
            col.not_null = true;
        }
    }
    Ok(col)
}

fn parse_insert(stmt: &str) -> Result<Plan> {
    if let Some(caps) = insert_columns_re().captures(stmt) {
        let table = caps[1].to_string();
        let columns = split_top_level(&caps[2])
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();
        let values = parse_values(&caps[3])?;
        return Ok(Plan::Insert {
            table,
            columns: Some(columns),
            values,
        });
    }
    if let Some(caps) = insert_values_re().captures(stmt) {
        let table = caps[1].to_string();
        let values = parse_values(&caps[2])?;
        return Ok(Plan::Insert {
            table,
            columns: None,
            values,
        });
    }
    Err(EngineError::Syntax("invalid INSERT syntax".to_string()))
}

fn parse_values(values_str: &str) -> Result<Vec<Value>> {
    split_top_level(values_str)
        .into_iter()
        .map(|v| Ok(parse_literal(v.trim())))
        .collect()
}

/// Parses a single SQL literal, used for both `VALUES` and predicate
/// right-hand sides.
///
/// A quoted value is stripped of only its outermost matching quote pair;
/// doubled quotes of the same kind inside the literal (`''` in a
/// single-quoted string, `""` in a double-quoted one) are unescaped to a
/// single quote character, matching the common SQL convention (an
/// intentional upgrade over the quirk documented in SPEC_FULL.md §9).
#[must_use]
pub fn parse_literal(token: &str) -> Value {
    let token = token.trim();
    if token.eq_ignore_ascii_case("NULL") {
        return Value::Null;
    }
    if token.len() >= 2 {
        let bytes = token.as_bytes();
        if bytes[0] == b'\'' && bytes[token.len() - 1] == b'\'' {
            let inner = &token[1..token.len() - 1];
            return Value::Text(inner.replace("''", "'"));
        }
        if bytes[0] == b'"' && bytes[token.len() - 1] == b'"' {
            let inner = &token[1..token.len() - 1];
            return Value::Text(inner.replace("\"\"", "\""));
        }
    }
    if token.eq_ignore_ascii_case("TRUE") {
        return Value::Bool(true);
    }
    if token.eq_ignore_ascii_case("FALSE") {
        return Value::Bool(false);
    }
    if let Ok(n) = token.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = token.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Text(token.to_string())
}

static_regex!(join_token_re, r"(?i)\bJOIN\b");

fn parse_select(stmt: &str) -> Result<Plan> {
    if select_join_re().is_match(stmt) {
        if join_token_re().find_iter(stmt).count() > 1 {
            return Err(EngineError::Syntax(
                "multi-way joins are not supported".to_string(),
            ));
        }
        return parse_select_join(stmt);
    }
    let caps = select_re()
        .captures(stmt)
        .ok_or_else(|| EngineError::Syntax("invalid SELECT syntax".to_string()))?;
    let projection = parse_projection(caps[1].trim());
    let table = caps[2].to_string();
    let where_clause = caps
        .get(3)
        .map(|m| parse_where_clause(m.as_str()))
        .transpose()?;
    Ok(Plan::Select {
        table,
        projection,
        where_clause,
    })
}

fn parse_select_join(stmt: &str) -> Result<Plan> {
    let caps = select_join_re()
        .captures(stmt)
        .ok_or_else(|| EngineError::Syntax("invalid SELECT with JOIN syntax".to_string()))?;
    let projection = parse_projection(caps[1].trim());
    let left_table = caps[2].to_string();
    let right_table = caps[3].to_string();
    let on = parse_join_on(caps[4].trim())?;
    let where_clause = caps
        .get(5)
        .map(|m| parse_where_clause(m.as_str()))
        .transpose()?;
    Ok(Plan::SelectJoin {
        left_table,
        right_table,
        on,
        projection,
        where_clause,
    })
}

fn parse_join_on(condition: &str) -> Result<JoinOn> {
    let (left, right) = condition
        .split_once('=')
        .ok_or_else(|| EngineError::Syntax("invalid JOIN condition".to_string()))?;
    Ok(JoinOn {
        left: left.trim().to_string(),
        right: right.trim().to_string(),
    })
}

fn parse_projection(columns_str: &str) -> Projection {
    if columns_str == "*" {
        Projection::All
    } else {
        Projection::Columns(
            columns_str
                .split(',')
                .map(|c| c.trim().to_string())
                .collect(),
        )
    }
}

fn parse_update(stmt: &str) -> Result<Plan> {
    let caps = update_re()
        .captures(stmt)
        .ok_or_else(|| EngineError::Syntax("invalid UPDATE syntax".to_string()))?;
    let table = caps[1].to_string();
    let assignments = parse_set_clause(&caps[2])?;
    let where_clause = caps
        .get(3)
        .ok_or_else(|| EngineError::Safety("UPDATE without WHERE clause not allowed for safety".to_string()))
        .and_then(|m| parse_where_clause(m.as_str()))?;
    Ok(Plan::Update {
        table,
        assignments,
        where_clause,
    })
}

fn parse_set_clause(set_str: &str) -> Result<Vec<(String, Value)>> {
    split_top_level(set_str)
        .into_iter()
        .map(|assignment| {
            let (col, val) = assignment
                .split_once('=')
                .ok_or_else(|| EngineError::Syntax(format!("invalid assignment: {assignment}")))?;
            Ok((col.trim().to_string(), parse_literal(val.trim())))
        })
        .collect()
}

fn parse_delete(stmt: &str) -> Result<Plan> {
    let caps = delete_re()
        .captures(stmt)
        .ok_or_else(|| EngineError::Syntax("invalid DELETE syntax".to_string()))?;
    let table = caps[1].to_string();
    let where_clause = caps
        .get(2)
        .ok_or_else(|| EngineError::Safety("DELETE without WHERE clause not allowed for safety".to_string()))
        .and_then(|m| parse_where_clause(m.as_str()))?;
    Ok(Plan::Delete { table, where_clause })
}

fn parse_show(stmt: &str) -> Result<Plan> {
    if stmt.to_uppercase() == "SHOW TABLES" {
        Ok(Plan::ShowTables)
    } else {
        Err(EngineError::Syntax("invalid SHOW syntax".to_string()))
    }
}

fn parse_describe(stmt: &str) -> Result<Plan> {
    let caps = describe_re()
        .captures(stmt)
        .ok_or_else(|| EngineError::Syntax("invalid DESCRIBE syntax".to_string()))?;
    Ok(Plan::Describe {
        table: caps[1].to_string(),
    })
}

/// Parses a `WHERE` clause into a [`Predicate`].
///
/// Splits on `AND` (case-insensitive, whitespace-bounded); `OR` is not
/// supported. Each conjunct is scanned for an operator in longest-match-first
/// order (`>=`, `<=`, `!=`, `=`, `>`, `<`).
pub fn parse_where_clause(where_str: &str) -> Result<Predicate> {
    static AND_SPLIT: OnceLock<Regex> = OnceLock::new();
    let and_split = regex(&AND_SPLIT, r"(?i)\s+AND\s+");

    let mut conditions = Vec::new();
    for part in and_split.split(where_str.trim()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        conditions.push(parse_condition(part)?);
    }
    Ok(Predicate { conditions })
}

const OPERATORS: [(&str, ComparisonOp); 6] = [
    (">=", ComparisonOp::GtEq),
    ("<=", ComparisonOp::LtEq),
    ("!=", ComparisonOp::NotEq),
    ("=", ComparisonOp::Eq),
    (">", ComparisonOp::Gt),
    ("<", ComparisonOp::Lt),
];

fn parse_condition(part: &str) -> Result<Condition> {
    for (token, op) in OPERATORS {
        if let Some(pos) = part.find(token) {
            let column = part[..pos].trim().to_string();
            let literal_str = part[pos + token.len()..].trim();
            return Ok(Condition {
                column,
                op,
                literal: parse_literal(literal_str),
            });
        }
    }
    Err(EngineError::Syntax(format!(
        "invalid WHERE condition: {part}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_table_with_constraints() {
        let plan = parse(
            "CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100) NOT NULL)",
        )
        .unwrap();
        let Plan::CreateTable { table, columns } = plan else {
            panic!("expected CreateTable");
        };
        assert_eq!(table, "categories");
        assert_eq!(columns.len(), 2);
        assert!(columns[0].primary_key);
        assert!(columns[0].not_null);
        assert_eq!(columns[1].ty, ColumnType::Varchar(100));
        assert!(columns[1].not_null);
        assert!(!columns[1].primary_key);
    }

    #[test]
    fn primary_key_beats_redundant_unique() {
        let plan = parse("CREATE TABLE t (id INT PRIMARY KEY UNIQUE)").unwrap();
        let Plan::CreateTable { columns, .. } = plan else {
            panic!("expected CreateTable");
        };
        assert!(columns[0].primary_key);
        assert!(!columns[0].unique);
    }

    #[test]
    fn parses_insert_without_column_list() {
        let plan = parse("INSERT INTO categories VALUES (1, 'Books')").unwrap();
        let Plan::Insert {
            table,
            columns,
            values,
        } = plan
        else {
            panic!("expected Insert");
        };
        assert_eq!(table, "categories");
        assert!(columns.is_none());
        assert_eq!(values, vec![Value::Int(1), Value::Text("Books".into())]);
    }

    #[test]
    fn parses_insert_with_column_list() {
        let plan = parse("INSERT INTO t (a, b) VALUES (1, 'x')").unwrap();
        let Plan::Insert { columns, .. } = plan else {
            panic!("expected Insert");
        };
        assert_eq!(columns, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn parses_select_with_where() {
        let plan = parse("SELECT * FROM categories WHERE id = 1").unwrap();
        let Plan::Select {
            table,
            projection,
            where_clause,
        } = plan
        else {
            panic!("expected Select");
        };
        assert_eq!(table, "categories");
        assert_eq!(projection, Projection::All);
        assert!(where_clause.is_some());
    }

    #[test]
    fn parses_select_join() {
        let plan =
            parse("SELECT * FROM products JOIN categories ON products.category_id = categories.id")
                .unwrap();
        let Plan::SelectJoin {
            left_table,
            right_table,
            on,
            ..
        } = plan
        else {
            panic!("expected SelectJoin");
        };
        assert_eq!(left_table, "products");
        assert_eq!(right_table, "categories");
        assert_eq!(on.left, "products.category_id");
        assert_eq!(on.right, "categories.id");
    }

    #[test]
    fn rejects_a_second_join_keyword() {
        let err = parse(
            "SELECT * FROM a JOIN b ON a.id = b.id JOIN c ON b.id = c.id",
        )
        .unwrap_err();
        assert!(err.to_string().contains("multi-way"));
    }

    #[test]
    fn update_without_where_is_rejected() {
        let err = parse("UPDATE t SET x = 1").unwrap_err();
        assert!(matches!(err, EngineError::Safety(_)));
    }

    #[test]
    fn delete_without_where_is_rejected() {
        let err = parse("DELETE FROM t").unwrap_err();
        assert!(matches!(err, EngineError::Safety(_)));
    }

    #[test]
    fn parses_show_tables_case_insensitively() {
        assert!(matches!(parse("show tables").unwrap(), Plan::ShowTables));
    }

    #[test]
    fn unescapes_doubled_single_quotes() {
        assert_eq!(parse_literal("'O''Brien'"), Value::Text("O'Brien".to_string()));
    }

    #[test]
    fn unescapes_doubled_double_quotes() {
        assert_eq!(parse_literal("\"say \"\"hi\"\"\""), Value::Text("say \"hi\"".to_string()));
    }

    #[test]
    fn unrecognized_statement_is_a_syntax_error() {
        assert!(parse("EXPLAIN SELECT 1").is_err());
    }
}
