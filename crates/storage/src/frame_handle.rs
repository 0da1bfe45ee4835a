use crate::buffer_pool::BufferPoolManager;
use crate::frame::PageFrame;
use crate::replacer::replacer::AccessType;
use crate::Result;
use core::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A basic handle for a pinned `PageFrame`, without a content latch.
///
/// Dropping the handle unpins the page, reporting it dirty iff the handle
/// was written through. Callers that share a page across threads should use
/// the latched handles instead.
pub struct PageFrameHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a mut PageFrame,
    dirtied: bool,
}

impl fmt::Debug for PageFrameHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameHandle")
            .field("page_frame", &self.page_frame)
            .field("dirtied", &self.dirtied)
            .finish()
    }
}

impl<'a> PageFrameHandle<'a> {
    pub(crate) fn new(
        bpm: &'a Arc<RwLock<BufferPoolManager>>,
        page_frame: &'a mut PageFrame,
    ) -> Self {
        PageFrameHandle {
            bpm,
            page_frame,
            dirtied: false,
        }
    }

    /// Writes into the page and remembers to report it dirty on unpin.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.page_frame.write_at(offset, data)?;
        self.dirtied = true;
        Ok(())
    }

    /// Explicitly unpins the page. Equivalent to dropping the handle.
    pub fn release(self) {}
}

impl<'a> Drop for PageFrameHandle<'a> {
    fn drop(&mut self) {
        self.bpm.write().unwrap().unpin_page(
            self.page_frame.page_id(),
            self.dirtied,
            AccessType::Unknown,
        );
    }
}

impl<'a> Deref for PageFrameHandle<'a> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

/// A handle for a read-only `PageFrame`, holding the frame's shared content
/// latch for its whole lifetime.
///
/// When the handle is dropped, the latch is released first and the page is
/// unpinned after, so the pool never reclaims a frame whose bytes are still
/// being read.
pub struct PageFrameRefHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a PageFrame,
    latch_guard: Option<RwLockReadGuard<'a, ()>>,
}

impl fmt::Debug for PageFrameRefHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameRefHandle")
            .field("page_frame", &self.page_frame)
            .finish()
    }
}

impl<'a> PageFrameRefHandle<'a> {
    pub(crate) fn new(bpm: &'a Arc<RwLock<BufferPoolManager>>, page_frame: &'a PageFrame) -> Self {
        let latch_guard = page_frame.read_latch();
        PageFrameRefHandle {
            bpm,
            page_frame,
            latch_guard: Some(latch_guard),
        }
    }

    /// Explicitly releases the latch and unpins the page. Equivalent to
    /// dropping the handle.
    pub fn release(self) {}
}

impl<'a> Drop for PageFrameRefHandle<'a> {
    fn drop(&mut self) {
        // Latch first, pin second: once the page is unpinned it may be
        // evicted, and eviction does not take the content latch.
        self.latch_guard.take();
        self.bpm
            .write()
            .unwrap()
            .unpin_page(self.page_frame.page_id(), false, AccessType::Unknown);
    }
}

/// A handle for exclusive write access to a `PageFrame`, holding the frame's
/// exclusive content latch for its whole lifetime.
///
/// Dropping the handle releases the latch, then unpins the page with the
/// dirty hint set.
pub struct PageFrameMutHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a mut PageFrame,
    latch_guard: Option<RwLockWriteGuard<'a, ()>>,
}

impl fmt::Debug for PageFrameMutHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameMutHandle")
            .field("page_frame", &self.page_frame)
            .finish()
    }
}

impl<'a> PageFrameMutHandle<'a> {
    pub(crate) fn new(
        bpm: &'a Arc<RwLock<BufferPoolManager>>,
        page_frame: &'a mut PageFrame,
    ) -> Self {
        let fp_ptr = &mut *page_frame as *mut PageFrame;
        // SAFETY:
        // The latch guard borrows the frame, which the struct also stores as
        // a mutable reference, and the borrow checker cannot see those two
        // uses as disjoint. The latch only guards the page bytes; the guard
        // itself never reads the frame again, so holding both is sound.
        let latch_guard = unsafe { (*fp_ptr).write_latch() };
        PageFrameMutHandle {
            bpm,
            page_frame,
            latch_guard: Some(latch_guard),
        }
    }

    /// Explicitly releases the latch and unpins the page. Equivalent to
    /// dropping the handle.
    pub fn release(self) {}
}

impl<'a> Drop for PageFrameMutHandle<'a> {
    fn drop(&mut self) {
        // Same order as the read handle: latch before pin.
        self.latch_guard.take();
        self.bpm
            .write()
            .unwrap()
            .unpin_page(self.page_frame.page_id(), true, AccessType::Unknown);
    }
}

/// Implement `Deref` for `PageFrameRefHandle` to provide transparent access to `PageFrame`.
impl<'a> Deref for PageFrameRefHandle<'a> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

/// Implement `Deref` for `PageFrameMutHandle` to provide transparent access to `PageFrame`.
impl<'a> Deref for PageFrameMutHandle<'a> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

/// Implement `DerefMut` for `PageFrameMutHandle` to allow mutable access to `PageFrame`.
impl<'a> DerefMut for PageFrameMutHandle<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.page_frame
    }
}
