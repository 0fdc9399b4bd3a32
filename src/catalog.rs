// Table schemas and their JSON-backed registry.
//
// The catalog maps table names to schemas and is persisted as a single
// JSON document at {data_dir}/catalog.json. The JSON field names and the
// integer column-type codes are part of the on-disk format.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Storage type of a column. Serialized as its integer code
/// (0 = INT, 1 = TEXT) in the catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ColumnType {
    Int,
    Text,
}

impl From<ColumnType> for u8 {
    fn from(t: ColumnType) -> u8 {
        match t {
            ColumnType::Int => 0,
            ColumnType::Text => 1,
        }
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, String> {
        match code {
            0 => Ok(ColumnType::Int),
            1 => Ok(ColumnType::Text),
            other => Err(format!("unknown column type code {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "Type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A secondary index declaration: the index name and the column it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDef {
    pub name: String,
    pub column_name: String,
}

/// Schema of one table. Column order is the canonical order for the
/// row codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            indexes: BTreeMap::new(),
        }
    }
}

/// The persistent registry of table schemas.
pub struct Catalog {
    path: PathBuf,
    tables: BTreeMap<String, TableSchema>,
}

impl Catalog {
    /// Load the catalog from its JSON file. A missing file is an empty
    /// catalog; an unreadable or unparsable file is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| DbError::Corrupt(format!("catalog {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(DbError::Io(e)),
        };
        Ok(Self { path, tables })
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.tables)
            .map_err(|e| DbError::Corrupt(format!("encode catalog: {e}")))?;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        if self.tables.contains_key(&schema.name) {
            return Err(DbError::TableExists(schema.name));
        }
        self.tables.insert(schema.name.clone(), schema);
        self.save()
    }

    pub fn get_table(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn create_index(&mut self, table: &str, index_name: &str, column: &str) -> Result<()> {
        let schema = self
            .tables
            .get_mut(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))?;
        if schema.indexes.contains_key(index_name) {
            return Err(DbError::IndexExists(format!("{index_name} on {table}")));
        }
        schema.indexes.insert(
            index_name.to_string(),
            IndexDef {
                name: index_name.to_string(),
                column_name: column.to_string(),
            },
        );
        self.save()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int),
                Column::new("name", ColumnType::Text),
            ],
        )
    }

    #[test]
    fn test_missing_file_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("catalog.json")).unwrap();
        assert!(catalog.table_names().is_empty());
    }

    #[test]
    fn test_create_and_get_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(dir.path().join("catalog.json")).unwrap();
        catalog.create_table(users_schema()).unwrap();
        let schema = catalog.get_table("users").unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert!(matches!(
            catalog.get_table("ghosts"),
            Err(DbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(dir.path().join("catalog.json")).unwrap();
        catalog.create_table(users_schema()).unwrap();
        assert!(matches!(
            catalog.create_table(users_schema()),
            Err(DbError::TableExists(_))
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(dir.path().join("catalog.json")).unwrap();
        catalog.create_table(users_schema()).unwrap();
        catalog.create_index("users", "by_id", "id").unwrap();
        assert!(matches!(
            catalog.create_index("users", "by_id", "id"),
            Err(DbError::IndexExists(_))
        ));
    }

    #[test]
    fn test_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        {
            let mut catalog = Catalog::open(&path).unwrap();
            catalog.create_table(users_schema()).unwrap();
            catalog.create_index("users", "by_name", "name").unwrap();
        }
        let catalog = Catalog::open(&path).unwrap();
        let schema = catalog.get_table("users").unwrap();
        assert_eq!(schema.indexes["by_name"].column_name, "name");
    }

    #[test]
    fn test_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut catalog = Catalog::open(&path).unwrap();
        catalog.create_table(users_schema()).unwrap();
        catalog.create_index("users", "by_id", "id").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        let users = &doc["users"];
        assert_eq!(users["Name"], "users");
        assert_eq!(users["Columns"][0]["Name"], "id");
        assert_eq!(users["Columns"][0]["Type"], 0);
        assert_eq!(users["Columns"][1]["Type"], 1);
        assert_eq!(users["Indexes"]["by_id"]["ColumnName"], "id");
    }

    #[test]
    fn test_garbage_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Catalog::open(&path), Err(DbError::Corrupt(_))));
    }
}
