// Statement execution over the catalog and the storage layer.
//
// The engine owns the catalog and the data directory; tables are opened
// lazily per statement. Every catalog write goes through the engine, which
// is how catalog updates stay serialized within a process.

use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::ast::{CreateIndexStmt, CreateTableStmt, InsertStmt, SelectStmt, Statement};
use crate::catalog::{Catalog, TableSchema};
use crate::error::Result;
use crate::parser;
use crate::table::Table;
use crate::types::Value;

/// Result of executing one statement. Serializes with the wire protocol's
/// field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub affected: usize,
    pub message: String,
}

impl ExecResult {
    fn ok() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected: 0,
            message: "OK".to_string(),
        }
    }
}

pub struct Engine {
    data_dir: PathBuf,
    catalog: Catalog,
}

impl Engine {
    /// Open an engine over a data directory, loading the catalog.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let catalog = Catalog::open(data_dir.join("catalog.json"))?;
        Ok(Self { data_dir, catalog })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn table_names(&self) -> Vec<String> {
        self.catalog.table_names()
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.tbl"))
    }

    /// Open a table declared in the catalog.
    pub fn get_table(&self, name: &str) -> Result<Table<'_>> {
        let schema = self.catalog.get_table(name)?;
        Table::open(name, &self.table_path(name), schema)
    }

    /// Parse and execute one SQL statement.
    pub fn execute(&mut self, sql: &str) -> Result<ExecResult> {
        let stmt = parser::parse(sql)?;
        debug!("executing {stmt:?}");
        self.execute_statement(&stmt)
    }

    pub fn execute_statement(&mut self, stmt: &Statement) -> Result<ExecResult> {
        match stmt {
            Statement::CreateTable(s) => self.exec_create_table(s),
            Statement::CreateIndex(s) => self.exec_create_index(s),
            Statement::Insert(s) => self.exec_insert(s),
            Statement::Select(s) => self.exec_select(s),
        }
    }

    /// Register the schema in the catalog, then allocate the heap file.
    fn exec_create_table(&mut self, stmt: &CreateTableStmt) -> Result<ExecResult> {
        let schema = TableSchema::new(stmt.name.clone(), stmt.columns.clone());
        self.catalog.create_table(schema)?;
        self.get_table(&stmt.name)?;
        Ok(ExecResult::ok())
    }

    /// Register the index in the catalog, then backfill the B-tree from
    /// the rows already in the heap. The column is validated up front so a
    /// bad statement leaves the catalog untouched.
    fn exec_create_index(&mut self, stmt: &CreateIndexStmt) -> Result<ExecResult> {
        {
            let table = self.get_table(&stmt.table)?;
            table.resolve_column(&stmt.column)?;
        }
        self.catalog
            .create_index(&stmt.table, &stmt.name, &stmt.column)?;
        let mut table = self.get_table(&stmt.table)?;
        table.create_index(&stmt.name, &stmt.column)?;
        Ok(ExecResult {
            message: format!(
                "index {} created on table {}({})",
                stmt.name, stmt.table, stmt.column
            ),
            ..ExecResult::ok()
        })
    }

    fn exec_insert(&mut self, stmt: &InsertStmt) -> Result<ExecResult> {
        let mut table = self.get_table(&stmt.table)?;
        table.insert_row(&stmt.values)?;
        Ok(ExecResult {
            affected: 1,
            ..ExecResult::ok()
        })
    }

    fn exec_select(&mut self, stmt: &SelectStmt) -> Result<ExecResult> {
        let mut table = self.get_table(&stmt.table)?;
        let (col_idxs, col_names) = table.resolve_columns(&stmt.columns)?;

        let filter = match &stmt.where_clause {
            Some(cond) => Some((table.resolve_column(&cond.column)?, &cond.value)),
            None => None,
        };

        let mut rows = Vec::new();
        for row in table.read_all_rows()? {
            if let Some((idx, value)) = filter {
                // Typed equality: an int column never matches a string
                // literal and vice versa.
                if &row[idx] != value {
                    continue;
                }
            }
            rows.push(col_idxs.iter().map(|&i| row[i].clone()).collect());
        }

        Ok(ExecResult {
            columns: col_names,
            rows,
            affected: 0,
            message: "OK".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    fn engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path()).unwrap();
        (dir, engine)
    }

    #[test]
    fn test_create_insert_select_star() {
        let (_dir, mut engine) = engine();
        engine
            .execute("CREATE TABLE users (id INT, name TEXT);")
            .unwrap();
        engine
            .execute("INSERT INTO users VALUES (1, 'alice');")
            .unwrap();
        engine
            .execute("INSERT INTO users VALUES (2, 'bob');")
            .unwrap();

        let result = engine.execute("SELECT * FROM users;").unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Int(1), Value::Text("alice".into())],
                vec![Value::Int(2), Value::Text("bob".into())],
            ]
        );
    }

    #[test]
    fn test_select_projection_with_where() {
        let (_dir, mut engine) = engine();
        engine
            .execute("CREATE TABLE users (id INT, name TEXT)")
            .unwrap();
        engine
            .execute("INSERT INTO users VALUES (1, 'alice')")
            .unwrap();
        engine
            .execute("INSERT INTO users VALUES (2, 'bob')")
            .unwrap();

        let result = engine
            .execute("SELECT name FROM users WHERE id = 2")
            .unwrap();
        assert_eq!(result.columns, vec!["name"]);
        assert_eq!(result.rows, vec![vec![Value::Text("bob".into())]]);
    }

    #[test]
    fn test_where_mixed_types_never_match() {
        let (_dir, mut engine) = engine();
        engine.execute("CREATE TABLE t (k INT)").unwrap();
        engine.execute("INSERT INTO t VALUES (1)").unwrap();

        let result = engine.execute("SELECT * FROM t WHERE k = '1'").unwrap();
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_insert_type_checked_against_schema() {
        let (_dir, mut engine) = engine();
        engine.execute("CREATE TABLE t (k INT)").unwrap();
        assert!(matches!(
            engine.execute("INSERT INTO t VALUES ('nope')"),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(matches!(
            engine.execute("INSERT INTO t VALUES (1, 2)"),
            Err(DbError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_unknown_table_and_column() {
        let (_dir, mut engine) = engine();
        assert!(matches!(
            engine.execute("SELECT * FROM ghosts"),
            Err(DbError::TableNotFound(_))
        ));
        engine.execute("CREATE TABLE t (k INT)").unwrap();
        assert!(matches!(
            engine.execute("SELECT nope FROM t"),
            Err(DbError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_table() {
        let (_dir, mut engine) = engine();
        engine.execute("CREATE TABLE t (k INT)").unwrap();
        assert!(matches!(
            engine.execute("CREATE TABLE t (k INT)"),
            Err(DbError::TableExists(_))
        ));
    }

    #[test]
    fn test_create_index_bad_column_leaves_catalog_clean() {
        let (_dir, mut engine) = engine();
        engine.execute("CREATE TABLE t (k INT)").unwrap();
        assert!(matches!(
            engine.execute("CREATE INDEX idx ON t (nope)"),
            Err(DbError::ColumnNotFound(_))
        ));
        // The failed statement must not have claimed the index name.
        engine.execute("CREATE INDEX idx ON t (k)").unwrap();
    }

    #[test]
    fn test_affected_and_message() {
        let (_dir, mut engine) = engine();
        let r = engine.execute("CREATE TABLE t (k INT)").unwrap();
        assert_eq!(r.message, "OK");
        let r = engine.execute("INSERT INTO t VALUES (1)").unwrap();
        assert_eq!(r.affected, 1);
    }

    #[test]
    fn test_exec_result_json_field_names() {
        let result = ExecResult {
            columns: vec!["id".into()],
            rows: vec![vec![Value::Int(1)]],
            affected: 0,
            message: "OK".into(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"Columns":["id"],"Rows":[[1]],"Affected":0,"Message":"OK"}"#
        );
    }

    #[test]
    fn test_persistence_across_engine_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut engine = Engine::open(dir.path()).unwrap();
            engine.execute("CREATE TABLE t (k INT, v TEXT)").unwrap();
            engine.execute("INSERT INTO t VALUES (1, 'one')").unwrap();
            engine.execute("INSERT INTO t VALUES (2, 'two')").unwrap();
        }
        let mut engine = Engine::open(dir.path()).unwrap();
        let result = engine.execute("SELECT v FROM t WHERE k = 2").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Text("two".into())]]);
    }
}
