//! End-to-end tests driving [`Executor::execute`] exactly as an external
//! collaborator (HTTP layer, shell) would: text SQL in, a result record out.

use std::sync::Once;

use oxide_rdbms::prelude::*;
use tempfile::tempdir;

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn open_executor() -> (Executor, tempfile::TempDir) {
    init_tracing();
    let dir = tempdir().unwrap();
    let executor = Executor::open(dir.path()).unwrap();
    (executor, dir)
}

#[test]
fn scenario_create_insert_select_by_primary_key() {
    let (executor, _dir) = open_executor();

    let result = executor.execute(
        "CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100) NOT NULL)",
    );
    assert!(result.is_success());

    let result = executor.execute("INSERT INTO categories VALUES (1, 'Books')");
    let ExecuteResult::Insert { row_id, .. } = result else {
        panic!("expected Insert, got {result:?}");
    };
    assert_eq!(row_id, 0);

    let result = executor.execute("SELECT * FROM categories WHERE id = 1");
    let ExecuteResult::Rows { rows, count, .. } = result else {
        panic!("expected Rows, got {result:?}");
    };
    assert_eq!(count, 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
    assert_eq!(rows[0].get("name"), Some(&Value::Text("Books".to_string())));
}

#[test]
fn scenario_duplicate_primary_key_leaves_table_unchanged() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100))");
    executor.execute("INSERT INTO categories VALUES (1, 'Books')");

    let result = executor.execute("INSERT INTO categories VALUES (1, 'Other')");
    let ExecuteResult::Failure { error, .. } = result else {
        panic!("expected Failure, got {result:?}");
    };
    assert!(error.contains("already exists"));

    let ExecuteResult::Rows { count, .. } = executor.execute("SELECT * FROM categories") else {
        panic!("expected Rows");
    };
    assert_eq!(count, 1);
}

#[test]
fn scenario_inner_join_two_tables() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100))");
    executor.execute(
        "CREATE TABLE products (id INT PRIMARY KEY, name VARCHAR(200), category_id INT NOT NULL)",
    );
    executor.execute("INSERT INTO categories VALUES (1, 'Books')");
    executor.execute("INSERT INTO products VALUES (10, 'Book A', 1)");
    executor.execute("INSERT INTO products VALUES (11, 'Book B', 1)");

    let result = executor.execute(
        "SELECT * FROM products JOIN categories ON products.category_id = categories.id",
    );
    let ExecuteResult::Rows { rows, count, .. } = result else {
        panic!("expected Rows, got {result:?}");
    };
    assert_eq!(count, 2);
    for row in &rows {
        for key in [
            "products.id",
            "products.name",
            "products.category_id",
            "categories.id",
            "categories.name",
        ] {
            assert!(row.contains_key(key), "missing key {key} in {row:?}");
        }
    }
}

#[test]
fn scenario_update_then_select_single_column() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE products (id INT PRIMARY KEY, name VARCHAR(200))");
    executor.execute("INSERT INTO products VALUES (10, 'Book A')");

    let result = executor.execute("UPDATE products SET name = 'Book AA' WHERE id = 10");
    let ExecuteResult::Update { updated_count, .. } = result else {
        panic!("expected Update, got {result:?}");
    };
    assert_eq!(updated_count, 1);

    let ExecuteResult::Rows { rows, .. } = executor.execute("SELECT name FROM products WHERE id = 10")
    else {
        panic!("expected Rows");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("Book AA".to_string())));
    assert!(rows[0].get("id").is_none());
}

#[test]
fn scenario_delete_has_no_foreign_key_enforcement() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100))");
    executor.execute(
        "CREATE TABLE products (id INT PRIMARY KEY, name VARCHAR(200), category_id INT NOT NULL)",
    );
    executor.execute("INSERT INTO categories VALUES (1, 'Books')");
    executor.execute("INSERT INTO products VALUES (10, 'Book A', 1)");

    let result = executor.execute("DELETE FROM categories WHERE id = 1");
    let ExecuteResult::Delete { deleted_count, .. } = result else {
        panic!("expected Delete, got {result:?}");
    };
    assert_eq!(deleted_count, 1);

    let ExecuteResult::ShowTables { tables, .. } = executor.execute("SHOW TABLES") else {
        panic!("expected ShowTables");
    };
    assert_eq!(tables, vec!["categories".to_string(), "products".to_string()]);

    let ExecuteResult::Rows { count, .. } = executor.execute("SELECT * FROM categories") else {
        panic!("expected Rows");
    };
    assert_eq!(count, 0);
}

#[test]
fn scenario_describe_reports_declaration_order_and_constraints() {
    let (executor, _dir) = open_executor();
    executor.execute(
        "CREATE TABLE products (id INT PRIMARY KEY, name VARCHAR(200), category_id INT NOT NULL)",
    );

    let result = executor.execute("DESCRIBE products");
    let ExecuteResult::Describe {
        table,
        columns,
        row_count,
        ..
    } = result
    else {
        panic!("expected Describe, got {result:?}");
    };
    assert_eq!(table, "products");
    assert_eq!(row_count, 0);
    assert_eq!(columns[0].column, "id");
    assert_eq!(columns[0].constraints.as_deref(), Some("PRIMARY KEY, NOT NULL"));
    assert_eq!(columns[1].column, "name");
    assert_eq!(columns[2].column, "category_id");
    assert_eq!(columns[2].constraints.as_deref(), Some("NOT NULL"));
}

#[test]
fn boundary_update_and_delete_require_where() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE t (id INT PRIMARY KEY)");
    executor.execute("INSERT INTO t VALUES (1)");

    let ExecuteResult::Failure { error: update_err, .. } = executor.execute("UPDATE t SET id = 2")
    else {
        panic!("expected Failure");
    };
    assert!(update_err.contains("safety"));

    let ExecuteResult::Failure { error: delete_err, .. } = executor.execute("DELETE FROM t") else {
        panic!("expected Failure");
    };
    assert!(delete_err.contains("safety"));

    let ExecuteResult::Rows { count, .. } = executor.execute("SELECT * FROM t") else {
        panic!("expected Rows");
    };
    assert_eq!(count, 1);
}

#[test]
fn boundary_varchar_length_is_a_type_error() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE t (name VARCHAR(5))");
    let result = executor.execute("INSERT INTO t VALUES ('abcdef')");
    assert!(!result.is_success());
}

#[test]
fn boundary_unknown_projected_column_is_silently_absent() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE t (id INT PRIMARY KEY)");
    executor.execute("INSERT INTO t VALUES (1)");
    let ExecuteResult::Rows { rows, count, .. } = executor.execute("SELECT id, ghost FROM t") else {
        panic!("expected Rows");
    };
    assert_eq!(count, 1);
    assert!(rows[0].contains_key("id"));
    assert!(!rows[0].contains_key("ghost"));
}

#[test]
fn boundary_insert_column_count_mismatch_is_cardinality_error() {
    let (executor, _dir) = open_executor();
    executor.execute("CREATE TABLE t (a INT, b INT)");
    let result = executor.execute("INSERT INTO t (a, b) VALUES (1, 2, 3)");
    assert!(!result.is_success());
    let result = executor.execute("INSERT INTO t VALUES (1)");
    assert!(!result.is_success());
}

#[test]
fn persistence_round_trip_across_engine_instances() {
    let dir = tempdir().unwrap();
    {
        let executor = Executor::open(dir.path()).unwrap();
        executor.execute("CREATE TABLE categories (id INT PRIMARY KEY, name VARCHAR(100))");
        executor.execute("INSERT INTO categories VALUES (1, 'Books')");
        executor.execute("INSERT INTO categories VALUES (2, 'Games')");
    }

    let reopened = Executor::open(dir.path()).unwrap();
    let ExecuteResult::ShowTables { tables, .. } = reopened.execute("SHOW TABLES") else {
        panic!("expected ShowTables");
    };
    assert_eq!(tables, vec!["categories".to_string()]);

    let ExecuteResult::Rows { rows, count, .. } = reopened.execute("SELECT * FROM categories")
    else {
        panic!("expected Rows");
    };
    assert_eq!(count, 2);
    assert!(rows.iter().any(|r| r.get("name") == Some(&Value::Text("Games".to_string()))));
}

#[test]
fn fresh_data_directory_starts_with_no_tables() {
    let (executor, _dir) = open_executor();
    let ExecuteResult::ShowTables { tables, count, .. } = executor.execute("SHOW TABLES") else {
        panic!("expected ShowTables");
    };
    assert!(tables.is_empty());
    assert_eq!(count, 0);
}
