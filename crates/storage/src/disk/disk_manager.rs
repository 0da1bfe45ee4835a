use crate::page::PAGE_SIZE;
use crate::typedef::PageId;
use crate::Result;
use bytes::{Bytes, BytesMut};
use fs2::FileExt;
use rilldb_error::{errdata, Error};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::trace;

pub(crate) const DATA_DIR: &str = "data/";

const EMPTY_BUFFER: &[u8] = &[0; PAGE_SIZE];

/// File-backed page store. Page ids are handed out by the buffer pool; the
/// disk manager only maps them to file offsets and recycles offsets of
/// deallocated pages.
#[derive(Debug)]
pub struct DiskManager {
    file: RefCell<std::fs::File>,
    /// The maximum capacity (in pages) that the file can hold before we resize it.
    page_capacity: usize,
    /// Map from page_id -> file offset
    pages: HashMap<PageId, u64>,
    /// Free file offsets to reuse for future page writes.
    free_slots: VecDeque<u64>,
}

impl DiskManager {
    /// Creates a new disk manager for the given database file `filename`.
    /// The file is truncated and locked exclusively at creation.
    pub fn new(filename: &str) -> Result<Self> {
        std::fs::create_dir_all(DATA_DIR)
            .map_err(|e| Error::IO(format!("Unable to create {}: {}", DATA_DIR, e)))?;
        let path = Path::new(DATA_DIR).join(filename);

        // Open or create the file, truncating it
        let file = std::fs::OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::IO(format!("Unable to open file {}: {}", path.display(), e)))?;

        // Acquire an exclusive lock on the file at creation
        file.lock_exclusive()
            .map_err(|e| Error::IO(format!("Failed to acquire exclusive file lock: {}", e)))?;

        // Build the DiskManager struct
        let mut dm = Self {
            file: RefCell::new(file),
            page_capacity: 32, // Start with 32 as the default capacity
            pages: HashMap::new(),
            free_slots: VecDeque::new(),
        };

        // Initialize the file with enough space for `page_capacity + 1` pages
        dm.resize_file()?;

        Ok(dm)
    }

    /// Releases a page's file offset for reuse. A page that never reached
    /// disk has no offset and nothing to reclaim.
    pub fn deallocate_page(&mut self, page_id: PageId) {
        if let Some(offset) = self.pages.remove(&page_id) {
            self.free_slots.push_back(offset);
        }
    }

    /// Read a page if it exists. Returns `None` for a page that was never
    /// written.
    pub(crate) fn read(&mut self, page_id: PageId) -> Result<Option<Bytes>> {
        let offset = match self.pages.get(&page_id) {
            Some(&off) => off,
            None => {
                return Ok(None);
            }
        };

        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;

        let mut bytes = BytesMut::zeroed(PAGE_SIZE);
        file.read_exact(&mut bytes)?;
        Ok(Some(bytes.freeze()))
    }

    /// Write data to a page. Must not exceed `PAGE_SIZE`.
    pub(crate) fn write(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return errdata!("Page data must fit in a page.");
        }

        // If we don't already have an offset for this page, allocate a new one.
        let offset = match self.pages.get(&page_id) {
            Some(&off) => off,
            None => {
                let off = self.allocate_offset()?; // reuses a free slot or appends
                self.pages.insert(page_id, off);
                off
            }
        };

        let mut file = self.file.borrow_mut();
        file.seek(std::io::SeekFrom::Start(offset))?;
        file.write_all(data)?;
        if data.len() < PAGE_SIZE {
            // Pad short writes so the page slot is fully initialized.
            file.write_all(&EMPTY_BUFFER[data.len()..])?;
        }
        file.sync_all()?;

        Ok(())
    }

    /// Helper: reuse a free offset from `free_slots` or append at the end.
    fn allocate_offset(&mut self) -> Result<u64> {
        // If we have a free offset from a previously deleted page, reuse it
        if let Some(off) = self.free_slots.pop_front() {
            return Ok(off);
        }

        // Otherwise the page goes at the end of the used region,
        // but only if we have capacity
        let used_pages = self.pages.len() as u64;
        if used_pages + 1 >= self.page_capacity as u64 {
            // resize (double capacity) if needed
            self.page_capacity *= 2;
            self.resize_file()?;
        }

        let offset = used_pages * PAGE_SIZE as u64;
        Ok(offset)
    }

    /// Resizes the underlying file to `(page_capacity + 1) * PAGE_SIZE`.
    fn resize_file(&mut self) -> Result<()> {
        let size = (self.page_capacity as u64 + 1) * PAGE_SIZE as u64;
        trace!(capacity = self.page_capacity, size, "resizing database file");
        let file = self.file.borrow();
        file.set_len(size)
            .map_err(|e| Error::IO(format!("Failed to resize file: {}", e)))?;
        Ok(())
    }

    /// Returns the current size of the database file.
    pub fn get_db_file_size(&self) -> Result<u64> {
        let file = self.file.borrow();
        file.metadata()
            .map(|meta| meta.len())
            .map_err(|e| Error::IO(format!("Failed to get file size: {}", e)))
    }
}

impl Drop for DiskManager {
    /// We unlock the file when the DiskManager is dropped.
    ///
    /// While the DiskManager is running, it has exclusive access to the
    /// database file, preventing other processes from modifying it
    /// concurrently. Releasing the lock here lets a new instance (or another
    /// process) take over the file safely.
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&*self.file.borrow()) {
            panic!("Failed to unlock file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_disk_manager_write_read_roundtrip() {
        let mut dm = DiskManager::new("disk_test.db").unwrap();

        let mut data = vec![0u8; PAGE_SIZE];
        data[0..5].copy_from_slice(b"hello");
        dm.write(1, &data).unwrap();

        let read = dm.read(1).unwrap().expect("page 1 should exist");
        assert_eq!(&read[..], &data[..]);

        // A page that was never written reads as absent.
        assert!(dm.read(2).unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_disk_manager_deallocate_reuses_offset() {
        let mut dm = DiskManager::new("disk_test.db").unwrap();

        dm.write(1, EMPTY_BUFFER).unwrap();
        dm.write(2, EMPTY_BUFFER).unwrap();
        let freed_offset = dm.pages[&1];

        dm.deallocate_page(1);
        assert!(dm.read(1).unwrap().is_none());

        // The freed slot is handed to the next page instead of growing the
        // used region.
        dm.write(3, EMPTY_BUFFER).unwrap();
        assert_eq!(freed_offset, dm.pages[&3]);

        // Deallocating a page with no on-disk image is a no-op.
        dm.deallocate_page(42);
    }

    #[test]
    #[serial]
    fn test_disk_manager_grows_file_beyond_initial_capacity() {
        let mut dm = DiskManager::new("disk_test.db").unwrap();
        let initial_size = dm.get_db_file_size().unwrap();

        for page_id in 1..=64 {
            dm.write(page_id, EMPTY_BUFFER).unwrap();
        }
        assert!(dm.get_db_file_size().unwrap() > initial_size);

        for page_id in 1..=64 {
            assert!(dm.read(page_id).unwrap().is_some());
        }
    }

    #[test]
    #[serial]
    fn test_disk_manager_rejects_oversized_write() {
        let mut dm = DiskManager::new("disk_test.db").unwrap();
        let too_big = vec![0u8; PAGE_SIZE + 1];
        assert!(dm.write(1, &too_big).is_err());
    }
}
