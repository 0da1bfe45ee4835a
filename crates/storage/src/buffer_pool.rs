use rilldb_error::Error;

use crate::disk::disk_manager::DiskManager;
use crate::frame::PageFrame;
use crate::frame_handle::{PageFrameHandle, PageFrameMutHandle, PageFrameRefHandle};
use crate::page::INVALID_PAGE_ID;
use crate::replacer::replacer::{AccessType, Replacer};
use crate::typedef::{FrameId, PageId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

use crate::Result;

/// Manages page allocation, caching, and eviction in the buffer pool.
///
/// The pool is shared behind an `Arc<RwLock<..>>`; that outer lock is the
/// master latch, and every public operation (including its disk I/O) runs
/// entirely inside it.
#[derive(Debug)]
pub struct BufferPoolManager {
    frames: Vec<PageFrame>, // Storage for all frames in the buffer pool
    page_table: HashMap<PageId, FrameId>, // Maps page IDs to frame IDs
    replacer: Box<dyn Replacer>, // Handles page replacement policy (e.g. LRU-K)
    free_list: VecDeque<FrameId>, // List of free frames
    disk_manager: Arc<Mutex<DiskManager>>, // Manages reading/writing pages to disk
    next_page_id: PageId,   // Monotonic page id allocator; the disk manager only deallocates
}

impl BufferPoolManager {
    /// Initializes the buffer pool with a given size.
    pub fn new(
        pool_size: usize,
        disk_manager: Arc<Mutex<DiskManager>>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        frames.resize_with(pool_size, PageFrame::new);

        Self {
            frames,
            page_table: HashMap::new(),
            replacer,
            free_list: (0..pool_size).collect(),
            disk_manager,
            next_page_id: INVALID_PAGE_ID + 1,
        }
    }

    /// Hands out the next page id. Ids are never reused by the pool.
    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Claims a frame for a new occupant. The free list is the cheap path;
    /// otherwise a victim is taken from the replacer, written back if its
    /// bytes are newer than the disk's, and scrubbed.
    fn take_victim_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = match self.replacer.evict() {
            Some(frame_id) => frame_id,
            None => {
                return Err(Error::BufferPoolError(
                    "every frame is pinned; nothing can be evicted".to_string(),
                ))
            }
        };

        let evicted = &mut self.frames[frame_id];
        assert!(
            evicted.pin_count() == 0,
            "replacer chose pinned frame {frame_id}"
        );
        debug!(frame_id, page_id = evicted.page_id(), "evicting resident page");

        if evicted.is_dirty() {
            self.disk_manager
                .lock()?
                .write(evicted.page_id(), evicted.data())?;
        }

        self.page_table.remove(&evicted.page_id());
        evicted.reset();

        Ok(frame_id)
    }

    /// Allocates a new page and installs it into a free frame, pinned.
    pub fn create_page(&mut self) -> Result<&mut PageFrame> {
        // claim a frame before burning an id, in case the pool is full
        let frame_id = self.take_victim_frame()?;
        let page_id = self.allocate_page();

        // the frame comes back zeroed; stamp the new identity on it
        self.frames[frame_id].install(page_id);
        self.page_table.insert(page_id, frame_id);

        self.replacer.record_access(frame_id, AccessType::Unknown);
        self.replacer.set_evictable(frame_id, false);

        Ok(&mut self.frames[frame_id])
    }

    /// Fetches a mutable reference to a page, loading it from disk if necessary.
    pub fn fetch_page_mut(
        &mut self,
        page_id: PageId,
        access_type: AccessType,
    ) -> Result<&mut PageFrame> {
        // resident: one more pin, and the access feeds the replacer
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            self.frames[frame_id].pin();
            self.replacer.record_access(frame_id, access_type);
            self.replacer.set_evictable(frame_id, false);

            return Ok(&mut self.frames[frame_id]);
        }

        let frame_id = self.take_victim_frame()?;

        // pull the on-disk image into the frame; an id with no image yet
        // reads as all zeroes
        let image = self.disk_manager.lock()?.read(page_id)?;
        let frame = &mut self.frames[frame_id];
        if let Some(bytes) = image {
            frame.data_mut().copy_from_slice(&bytes);
        }
        frame.install(page_id);

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, access_type);
        self.replacer.set_evictable(frame_id, false);

        Ok(&mut self.frames[frame_id])
    }

    /// Fetches an immutable reference to a page.
    pub fn fetch_page(&mut self, page_id: PageId, access_type: AccessType) -> Result<&PageFrame> {
        Ok(&*self.fetch_page_mut(page_id, access_type)?)
    }

    /// Unpins a page, making it evictable once the pin count reaches zero.
    ///
    /// The dirty hint only ever raises the flag; a clean unpin never wipes
    /// out an earlier writer's mark. Returns `false` for the invalid page
    /// id, a non-resident page, or a page that is not pinned.
    pub fn unpin_page(
        &mut self,
        page_id: PageId,
        is_dirty: bool,
        _access_type: AccessType,
    ) -> bool {
        if page_id == INVALID_PAGE_ID {
            return false;
        }
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };

        let frame = &mut self.frames[frame_id];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Writes a page to disk unconditionally and clears its dirty flag.
    /// Pin state and evictability are unaffected.
    pub fn flush_page(&mut self, page_id: PageId) -> Result<()> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            let frame = &mut self.frames[frame_id];

            let mut disk = self.disk_manager.lock()?;
            disk.write(page_id, frame.data())?;
            frame.mark_clean();

            Ok(())
        } else {
            Err(Error::BufferPoolError(format!(
                "Page {:?} not found in buffer pool",
                page_id
            )))
        }
    }

    /// Writes every resident dirty page to disk, clearing the dirty flags.
    pub fn flush_all_pages(&mut self) -> Result<()> {
        let mut disk = self.disk_manager.lock()?;
        for frame in self.frames.iter_mut() {
            if frame.page_id() != INVALID_PAGE_ID && frame.is_dirty() {
                debug!(page_id = frame.page_id(), "flushing dirty page");
                disk.write(frame.page_id(), frame.data())?;
                frame.mark_clean();
            }
        }
        Ok(())
    }

    /// Deletes a page from the buffer pool and disk.
    ///
    /// A page that is not resident counts as already deleted. A pinned page
    /// cannot be deleted.
    pub fn delete_page(&mut self, page_id: PageId) -> Result<()> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            {
                let frame = &self.frames[frame_id];
                if frame.pin_count() > 0 {
                    return Err(Error::PagePinned(page_id));
                }
            }

            // Write back first so the on-disk image is current up to the
            // moment of deletion.
            if self.frames[frame_id].is_dirty() {
                self.flush_page(page_id)?;
            }

            // remove from page table and replacer
            self.page_table.remove(&page_id);
            self.replacer.remove(frame_id);

            // reset the frame and recycle it
            self.frames[frame_id].reset();
            self.free_list.push_back(frame_id);
        }

        // release the on-disk slot
        self.disk_manager.lock()?.deallocate_page(page_id);

        Ok(())
    }

    /// Returns the total number of frames in the buffer pool.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of frames that could hold a new page right now.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.len() + self.replacer.evictable_count()
    }

    /// Returns the pin count of a page, or `None` if it is not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u16> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(self.frames[*frame_id].pin_count())
    }

    /// Creates a new page and returns a basic (unlatched) handle for it.
    pub fn create_page_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<PageFrameHandle<'_>> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY:
            // The handle must package a reference to a frame inside the pool
            // together with the pool `Arc` itself, but `create_page` returns a
            // reference whose lifetime is tied to `bpm_guard`, so the borrow
            // checker treats the whole pool as borrowed and rejects the pair.
            // We extract a raw pointer to split that borrow: the frame stays
            // valid because it lives in the pool's frame array, and it cannot
            // be evicted or reused while the handle holds its pin.
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).create_page()? }
        };

        Ok(PageFrameHandle::new(bpm, page_frame))
    }

    /// Fetches a basic (unlatched) handle to a page.
    pub fn fetch_page_basic_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<PageFrameHandle<'_>> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY: see `create_page_handle`
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).fetch_page_mut(page_id, AccessType::Unknown)? }
        };

        Ok(PageFrameHandle::new(bpm, page_frame))
    }

    /// Fetches a read-only handle to a page. Blocks until the frame's shared
    /// content latch is available; the pool latch is released first.
    pub fn fetch_page_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<PageFrameRefHandle<'_>> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY: see `create_page_handle`
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).fetch_page(page_id, AccessType::Unknown)? }
        };

        Ok(PageFrameRefHandle::new(bpm, page_frame))
    }

    /// Fetches a writable handle to a page, holding the frame's exclusive
    /// content latch for the handle's lifetime.
    pub fn fetch_page_mut_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<PageFrameMutHandle<'_>> {
        let page_frame = {
            let mut bpm_guard = bpm.write()?;
            // SAFETY: see `create_page_handle`
            let bpm_ptr = &mut *bpm_guard as *mut BufferPoolManager;
            unsafe { (*bpm_ptr).fetch_page_mut(page_id, AccessType::Unknown)? }
        };

        Ok(PageFrameMutHandle::new(bpm, page_frame))
    }
}
