/// Logical identifier of a page on disk. 0 is reserved for the invalid page.
pub type PageId = u32;

/// Index of a frame slot inside the buffer pool.
pub type FrameId = usize;
