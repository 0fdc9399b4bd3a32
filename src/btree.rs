// On-disk B-tree for secondary indexes.
//
// Each page of the index file is one node. Keys are arbitrary byte strings
// ordered by memcmp. A leaf stores, per key, the list of tuple identifiers
// inserted under that key (duplicates collapse into one entry), so the tree
// is a multi-map from key to TIDs. Internal nodes store separator keys and
// num_keys + 1 child page ids.
//
// Page 0 of the file is a metadata page holding the current root page id;
// a fresh index starts with an empty leaf root at page 1. Splits propagate
// upward through the insert recursion's return value, and a root split
// rewrites the metadata page.
//
// Node layout: u8 is_leaf | u8 num_keys | per key: u32 key_len, key bytes,
// and for a leaf u32 tid_count followed by (u64 page_id, u32 slot_id) pairs.
// An internal node ends with (num_keys + 1) u64 child page ids after the
// last key.

use crate::error::{DbError, Result};
use crate::page::{self, Page, PageType, PAGE_SIZE};
use crate::pager::Pager;
use crate::types::Tid;

pub const MAX_KEYS_PER_NODE: usize = 64;

const META_PAGE_ID: u64 = 0;
const INITIAL_ROOT_PAGE_ID: u64 = 1;

/// One node of the tree, decoded from a page.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        keys: Vec<Vec<u8>>,
        tids: Vec<Vec<Tid>>,
    },
    Internal {
        keys: Vec<Vec<u8>>,
        children: Vec<u64>,
    },
}

/// Outcome of inserting into a subtree: either the node absorbed the key,
/// or it split and hands the separator and new right sibling to its parent.
enum InsertResult {
    Done,
    Split { sep_key: Vec<u8>, right_page: u64 },
}

/// A B-tree index over its own page file.
pub struct Index {
    pager: Pager,
    root_page_id: u64,
}

impl Index {
    /// Open an index over the given pager. An empty file is initialized
    /// with a metadata page and an empty leaf root; otherwise the root
    /// page id is read back from the metadata page.
    pub fn open(pager: Pager) -> Result<Self> {
        let mut index = Index {
            pager,
            root_page_id: INITIAL_ROOT_PAGE_ID,
        };
        if index.pager.num_pages()? == 0 {
            index.write_meta()?;
            index.write_node(
                INITIAL_ROOT_PAGE_ID,
                &Node::Leaf {
                    keys: Vec::new(),
                    tids: Vec::new(),
                },
            )?;
        } else {
            index.root_page_id = index.read_meta()?;
        }
        Ok(index)
    }

    pub fn root_page_id(&self) -> u64 {
        self.root_page_id
    }

    pub fn num_pages(&self) -> Result<u64> {
        self.pager.num_pages()
    }

    /// All TIDs stored under `key`, in insertion order. A missing key is
    /// an empty result, never an error.
    pub fn search(&mut self, key: &[u8]) -> Result<Vec<Tid>> {
        let mut page_id = self.root_page_id;
        loop {
            match self.read_node(page_id)? {
                Node::Internal { keys, children } => {
                    // Advance past every separator <= key: an exact match
                    // of a separator descends right, because leaf splits
                    // copy the right sibling's first key up.
                    let mut i = 0;
                    while i < keys.len() && keys[i].as_slice() <= key {
                        i += 1;
                    }
                    page_id = children[i];
                }
                Node::Leaf { keys, tids } => {
                    for (k, t) in keys.iter().zip(&tids) {
                        if k.as_slice() == key {
                            return Ok(t.clone());
                        }
                    }
                    return Ok(Vec::new());
                }
            }
        }
    }

    /// Insert one (key, tid) pair. Duplicate keys append to the existing
    /// TID list in the leaf.
    pub fn insert(&mut self, key: &[u8], tid: Tid) -> Result<()> {
        if let InsertResult::Split {
            sep_key,
            right_page,
        } = self.insert_into(self.root_page_id, key, tid)?
        {
            // The root itself split: grow the tree by one level.
            let new_root_id = self.pager.num_pages()?;
            self.write_node(
                new_root_id,
                &Node::Internal {
                    keys: vec![sep_key],
                    children: vec![self.root_page_id, right_page],
                },
            )?;
            self.root_page_id = new_root_id;
            self.write_meta()?;
        }
        Ok(())
    }

    fn insert_into(&mut self, page_id: u64, key: &[u8], tid: Tid) -> Result<InsertResult> {
        match self.read_node(page_id)? {
            Node::Leaf {
                mut keys,
                mut tids,
            } => {
                let pos = keys.partition_point(|k| k.as_slice() < key);
                if pos < keys.len() && keys[pos] == key {
                    tids[pos].push(tid);
                    self.write_node(page_id, &Node::Leaf { keys, tids })?;
                    return Ok(InsertResult::Done);
                }
                keys.insert(pos, key.to_vec());
                tids.insert(pos, vec![tid]);
                if keys.len() <= MAX_KEYS_PER_NODE {
                    self.write_node(page_id, &Node::Leaf { keys, tids })?;
                    return Ok(InsertResult::Done);
                }
                self.split_leaf(page_id, keys, tids)
            }
            Node::Internal {
                mut keys,
                mut children,
            } => {
                let mut i = 0;
                while i < keys.len() && keys[i].as_slice() <= key {
                    i += 1;
                }
                let child = children[i];
                match self.insert_into(child, key, tid)? {
                    InsertResult::Done => Ok(InsertResult::Done),
                    InsertResult::Split {
                        sep_key,
                        right_page,
                    } => {
                        keys.insert(i, sep_key);
                        children.insert(i + 1, right_page);
                        if keys.len() <= MAX_KEYS_PER_NODE {
                            self.write_node(page_id, &Node::Internal { keys, children })?;
                            return Ok(InsertResult::Done);
                        }
                        self.split_internal(page_id, keys, children)
                    }
                }
            }
        }
    }

    /// Split an over-full leaf. The right sibling takes the upper half and
    /// the separator is a copy of its first key.
    fn split_leaf(
        &mut self,
        page_id: u64,
        mut keys: Vec<Vec<u8>>,
        mut tids: Vec<Vec<Tid>>,
    ) -> Result<InsertResult> {
        let mid = keys.len() / 2;
        let right_keys = keys.split_off(mid);
        let right_tids = tids.split_off(mid);
        let sep_key = right_keys[0].clone();

        let right_page = self.pager.num_pages()?;
        self.write_node(page_id, &Node::Leaf { keys, tids })?;
        self.write_node(
            right_page,
            &Node::Leaf {
                keys: right_keys,
                tids: right_tids,
            },
        )?;
        Ok(InsertResult::Split {
            sep_key,
            right_page,
        })
    }

    /// Split an over-full internal node. The middle key moves up and lives
    /// in neither child.
    fn split_internal(
        &mut self,
        page_id: u64,
        mut keys: Vec<Vec<u8>>,
        mut children: Vec<u64>,
    ) -> Result<InsertResult> {
        let mid = keys.len() / 2;
        let mut right_keys = keys.split_off(mid);
        let sep_key = right_keys.remove(0);
        let right_children = children.split_off(mid + 1);

        let right_page = self.pager.num_pages()?;
        self.write_node(page_id, &Node::Internal { keys, children })?;
        self.write_node(
            right_page,
            &Node::Internal {
                keys: right_keys,
                children: right_children,
            },
        )?;
        Ok(InsertResult::Split {
            sep_key,
            right_page,
        })
    }

    // ---------------- node and metadata page I/O ----------------

    fn read_meta(&mut self) -> Result<u64> {
        let page = self.pager.read_page(META_PAGE_ID)?;
        if page.page_type() != PageType::Meta as u16 {
            return Err(DbError::Corrupt(format!(
                "index {} has no metadata page",
                self.pager.path().display()
            )));
        }
        let record = page.get_record(0)?;
        if record.len() != 8 {
            return Err(DbError::Corrupt("bad index metadata record".into()));
        }
        Ok(page::read_u64(&record, 0))
    }

    fn write_meta(&mut self) -> Result<()> {
        let mut page = Page::new_empty(META_PAGE_ID);
        page.set_page_type(PageType::Meta);
        page.insert_record(&self.root_page_id.to_le_bytes())?;
        self.pager.write_page(&page)
    }

    fn write_node(&mut self, page_id: u64, node: &Node) -> Result<()> {
        let mut buf = vec![0u8; PAGE_SIZE];
        let overflow = || {
            DbError::PageOverflow(format!("index entry too large for page {page_id}"))
        };

        let (is_leaf, keys) = match node {
            Node::Leaf { keys, .. } => (1u8, keys),
            Node::Internal { keys, .. } => (0u8, keys),
        };
        buf[0] = is_leaf;
        buf[1] = keys.len() as u8;

        let mut off = 2usize;
        for (i, key) in keys.iter().enumerate() {
            if off + 4 + key.len() > PAGE_SIZE {
                return Err(overflow());
            }
            page::write_u32(&mut buf, off, key.len() as u32);
            off += 4;
            buf[off..off + key.len()].copy_from_slice(key);
            off += key.len();

            if let Node::Leaf { tids, .. } = node {
                let list = &tids[i];
                if off + 4 + list.len() * 12 > PAGE_SIZE {
                    return Err(overflow());
                }
                page::write_u32(&mut buf, off, list.len() as u32);
                off += 4;
                for tid in list {
                    page::write_u64(&mut buf, off, tid.page_id);
                    page::write_u32(&mut buf, off + 8, tid.slot_id);
                    off += 12;
                }
            }
        }

        if let Node::Internal { children, .. } = node {
            if off + children.len() * 8 > PAGE_SIZE {
                return Err(overflow());
            }
            for child in children {
                page::write_u64(&mut buf, off, *child);
                off += 8;
            }
        }

        self.pager.write_page(&Page::from_buf(page_id, buf))
    }

    fn read_node(&mut self, page_id: u64) -> Result<Node> {
        let page = self.pager.read_page(page_id)?;
        let buf = page.data();
        let is_leaf = buf[0] == 1;
        let num_keys = buf[1] as usize;

        let corrupt = |what: &str| {
            DbError::Corrupt(format!("index node {page_id}: {what} out of bounds"))
        };

        let mut off = 2usize;
        let mut keys = Vec::with_capacity(num_keys);
        let mut tids = Vec::with_capacity(if is_leaf { num_keys } else { 0 });
        for _ in 0..num_keys {
            if off + 4 > PAGE_SIZE {
                return Err(corrupt("key length"));
            }
            let key_len = page::read_u32(buf, off) as usize;
            off += 4;
            if off + key_len > PAGE_SIZE {
                return Err(corrupt("key data"));
            }
            keys.push(buf[off..off + key_len].to_vec());
            off += key_len;

            if is_leaf {
                if off + 4 > PAGE_SIZE {
                    return Err(corrupt("TID count"));
                }
                let count = page::read_u32(buf, off) as usize;
                off += 4;
                if off + count * 12 > PAGE_SIZE {
                    return Err(corrupt("TID list"));
                }
                let mut list = Vec::with_capacity(count);
                for _ in 0..count {
                    list.push(Tid::new(
                        page::read_u64(buf, off),
                        page::read_u32(buf, off + 8),
                    ));
                    off += 12;
                }
                tids.push(list);
            }
        }

        if is_leaf {
            Ok(Node::Leaf { keys, tids })
        } else {
            if off + (num_keys + 1) * 8 > PAGE_SIZE {
                return Err(corrupt("child pointers"));
            }
            let mut children = Vec::with_capacity(num_keys + 1);
            for _ in 0..=num_keys {
                children.push(page::read_u64(buf, off));
                off += 8;
            }
            Ok(Node::Internal { keys, children })
        }
    }
}
