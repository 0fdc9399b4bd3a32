// Page-based file I/O.
//
// The pager reads and writes whole fixed-size pages at `id * PAGE_SIZE`.
// There is no buffer pool and no dirty tracking: a successful write_page
// has hit the OS page cache before the call returns, which is the only
// durability this engine promises.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{DbError, Result};
use crate::page::{Page, PAGE_SIZE};

/// Owns one page file. The handle is released when the pager is dropped,
/// which covers every exit path out of the surrounding table operation.
pub struct Pager {
    file: File,
    path: PathBuf,
}

impl Pager {
    /// Open (or create) a page file, creating the parent directory first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the page with the given id. A read that cannot deliver a full
    /// page is a storage error, not a partial result.
    pub fn read_page(&mut self, id: u64) -> Result<Page> {
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file.seek(SeekFrom::Start(id * PAGE_SIZE as u64))?;
        self.file.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DbError::Storage(format!("short read of page {} in {}", id, self.path.display()))
            } else {
                DbError::Io(e)
            }
        })?;
        Ok(Page::from_buf(id, buf))
    }

    /// Write a whole page at its id's offset.
    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(page.id() * PAGE_SIZE as u64))?;
        self.file.write_all(page.data())?;
        Ok(())
    }

    /// Number of whole pages in the file. A size that is not a multiple of
    /// PAGE_SIZE means a torn write or foreign file.
    pub fn num_pages(&self) -> Result<u64> {
        let size = self.file.metadata()?.len();
        if size % PAGE_SIZE as u64 != 0 {
            return Err(DbError::Storage(format!(
                "file size {} of {} is not a multiple of page size",
                size,
                self.path.display()
            )));
        }
        Ok(size / PAGE_SIZE as u64)
    }
}
