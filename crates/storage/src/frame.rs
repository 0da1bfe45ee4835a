use core::fmt;
use std::sync::RwLock;

use rilldb_error::errdata;

use crate::{
    page::{INVALID_PAGE_ID, PAGE_SIZE},
    typedef::PageId,
    Result,
};

/// One buffer pool slot: a page-sized byte buffer plus the bookkeeping the
/// pool needs to track residency.
///
/// The latch only protects the page bytes. The metadata is read and written
/// exclusively under the pool's master latch, so plain fields suffice.
pub struct PageFrame {
    page_id: PageId,
    dirty: bool,
    pins: u16,
    latch: RwLock<()>,
    data: Box<[u8; PAGE_SIZE]>,
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("page_id", &self.page_id)
            .field("dirty", &self.dirty)
            .field("pins", &self.pins)
            .finish()
    }
}

impl PageFrame {
    /// Creates a frame holding no page.
    pub(crate) fn new() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            dirty: false,
            pins: 0,
            latch: RwLock::new(()),
            data: Box::new([0; PAGE_SIZE]),
        }
    }

    /// Returns the id of the resident page, or [`INVALID_PAGE_ID`] if free.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// True iff the in-memory bytes diverge from the on-disk copy.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pin_count(&self) -> u16 {
        self.pins
    }

    /// Read-only view of the page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Mutable view of the page bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// Copies `bytes` into the page at `offset`, rejecting writes that would
    /// run past the end of the page.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        match offset
            .checked_add(bytes.len())
            .filter(|&end| end <= PAGE_SIZE)
        {
            Some(end) => {
                self.data[offset..end].copy_from_slice(bytes);
                Ok(())
            }
            None => errdata!(
                "write of {} bytes at offset {} does not fit a {} byte page",
                bytes.len(),
                offset,
                PAGE_SIZE
            ),
        }
    }

    /// Makes this frame the home of `page_id`: id stamped, clean, exactly one
    /// pin. The caller decides what the bytes hold.
    pub(crate) fn install(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.dirty = false;
        self.pins = 1;
    }

    /// Takes one more pin and returns the new count.
    pub(crate) fn pin(&mut self) -> u16 {
        self.pins += 1;
        self.pins
    }

    /// Releases one pin and returns the new count. The pool checks for zero
    /// before calling; reaching this without a pin is a bookkeeping bug.
    pub(crate) fn unpin(&mut self) -> u16 {
        self.pins = self
            .pins
            .checked_sub(1)
            .unwrap_or_else(|| panic!("page {} unpinned with no outstanding pins", self.page_id));
        self.pins
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Returns the frame to the free state: no page, no pins, zeroed bytes.
    pub(crate) fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.dirty = false;
        self.pins = 0;
        self.data.fill(0);
    }

    /// Shared latch over the page bytes.
    pub(crate) fn read_latch(&self) -> std::sync::RwLockReadGuard<'_, ()> {
        self.latch.read().unwrap()
    }

    /// Exclusive latch over the page bytes.
    pub(crate) fn write_latch(&self) -> std::sync::RwLockWriteGuard<'_, ()> {
        self.latch.write().unwrap()
    }
}
