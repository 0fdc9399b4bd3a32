// A table: one heap file plus the B-trees for its declared indexes.
//
// The heap is append-only. Rows go into the last page, or a fresh page
// when the last one is full; the heap write for a row always lands before
// any of its index entries do. If the process dies in between, the row is
// visible but unindexed — accepted, there is no recovery log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::btree::Index;
use crate::catalog::TableSchema;
use crate::error::{DbError, Result};
use crate::page::{Page, Tuple, TUPLE_FLAG_NORMAL, TUPLE_HEADER_SIZE};
use crate::pager::Pager;
use crate::rowcodec;
use crate::types::{Tid, Value};

pub struct Table<'a> {
    name: String,
    schema: &'a TableSchema,
    pager: Pager,
    indexes: HashMap<String, Index>,
    data_dir: PathBuf,
}

impl<'a> Table<'a> {
    /// Open (or create) the table's heap file and any index files the
    /// schema declares. An index file that fails to open is skipped and
    /// will be re-created on next use.
    pub fn open(name: &str, path: &Path, schema: &'a TableSchema) -> Result<Self> {
        let pager = Pager::open(path)?;
        let data_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(PathBuf::new);
        let mut table = Table {
            name: name.to_string(),
            schema,
            pager,
            indexes: HashMap::new(),
            data_dir,
        };
        for index_name in schema.indexes.keys() {
            match table.open_index(index_name) {
                Ok(index) => {
                    table.indexes.insert(index_name.clone(), index);
                }
                Err(e) => {
                    warn!("skipping index {index_name} of table {name}: {e}");
                }
            }
        }
        Ok(table)
    }

    pub fn schema(&self) -> &TableSchema {
        self.schema
    }

    fn index_path(&self, index_name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}.idx", self.name, index_name))
    }

    fn open_index(&self, index_name: &str) -> Result<Index> {
        let pager = Pager::open(self.index_path(index_name))?;
        Index::open(pager)
    }

    fn index_mut(&mut self, index_name: &str) -> Result<&mut Index> {
        if !self.indexes.contains_key(index_name) {
            let index = self.open_index(index_name)?;
            self.indexes.insert(index_name.to_string(), index);
        }
        Ok(self.indexes.get_mut(index_name).unwrap())
    }

    /// Append one row and update every declared index.
    pub fn insert_row(&mut self, values: &[Value]) -> Result<()> {
        let schema = self.schema;
        let payload = rowcodec::encode_row(schema, values)?;

        let num_pages = self.pager.num_pages()?;
        let mut page = if num_pages == 0 {
            Page::new_empty(0)
        } else {
            self.pager.read_page(num_pages - 1)?
        };
        if !page.can_insert(payload.len() + TUPLE_HEADER_SIZE) {
            page = Page::new_empty(num_pages);
        }

        let slot_id = page.insert_tuple(&payload, 0, TUPLE_FLAG_NORMAL)?;
        self.pager.write_page(&page)?;
        let tid = Tid::new(page.id(), slot_id);

        for (index_name, def) in &schema.indexes {
            let col_idx = resolve_column(schema, &def.column_name)?;
            let key = rowcodec::encode_value(schema, col_idx, &values[col_idx])?;
            self.index_mut(index_name)?.insert(&key, tid)?;
        }
        Ok(())
    }

    /// Every row in the heap, in insertion order (page order, then slot
    /// order within the page).
    pub fn read_all_rows(&mut self) -> Result<Vec<Vec<Value>>> {
        let num_pages = self.pager.num_pages()?;
        let mut rows = Vec::new();
        for page_id in 0..num_pages {
            let page = self.pager.read_page(page_id)?;
            for slot_id in 0..page.slot_count() {
                let tuple = page.get_tuple(slot_id)?;
                rows.push(rowcodec::decode_row(self.schema, &tuple.data)?);
            }
        }
        Ok(rows)
    }

    /// Read one tuple through its identifier.
    pub fn get_tuple_by_tid(&mut self, tid: Tid) -> Result<Tuple> {
        let page = self.pager.read_page(tid.page_id)?;
        page.get_tuple(tid.slot_id)
    }

    /// Build a fresh index over the named column from the rows already in
    /// the heap, then cache it for the maintenance path.
    pub fn create_index(&mut self, index_name: &str, column: &str) -> Result<()> {
        let schema = self.schema;
        let col_idx = resolve_column(schema, column)?;

        let pager = Pager::open(self.index_path(index_name))?;
        let mut index = Index::open(pager)?;

        let num_pages = self.pager.num_pages()?;
        for page_id in 0..num_pages {
            let page = self.pager.read_page(page_id)?;
            for slot_id in 0..page.slot_count() {
                let tuple = page.get_tuple(slot_id)?;
                let row = rowcodec::decode_row(schema, &tuple.data)?;
                let key = rowcodec::encode_value(schema, col_idx, &row[col_idx])?;
                index.insert(&key, Tid::new(page_id, slot_id))?;
            }
        }

        self.indexes.insert(index_name.to_string(), index);
        Ok(())
    }

    /// Fetch an index by name, opening it lazily if needed.
    pub fn get_index(&mut self, index_name: &str) -> Result<&mut Index> {
        self.index_mut(index_name)
    }

    /// Map requested column names to schema positions. `["*"]` expands to
    /// all columns in schema order.
    pub fn resolve_columns(&self, requested: &[String]) -> Result<(Vec<usize>, Vec<String>)> {
        if requested.len() == 1 && requested[0] == "*" {
            let idxs = (0..self.schema.columns.len()).collect();
            let names = self.schema.columns.iter().map(|c| c.name.clone()).collect();
            return Ok((idxs, names));
        }
        let mut idxs = Vec::with_capacity(requested.len());
        for name in requested {
            idxs.push(resolve_column(self.schema, name)?);
        }
        Ok((idxs, requested.to_vec()))
    }

    pub fn resolve_column(&self, column: &str) -> Result<usize> {
        resolve_column(self.schema, column)
    }
}

fn resolve_column(schema: &TableSchema, column: &str) -> Result<usize> {
    schema
        .columns
        .iter()
        .position(|c| c.name == column)
        .ok_or_else(|| DbError::ColumnNotFound(column.to_string()))
}
