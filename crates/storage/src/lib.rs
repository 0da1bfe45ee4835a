pub mod buffer_pool;
pub mod disk;
pub mod frame;
pub mod frame_handle;
pub mod page;
pub mod replacer;
pub mod typedef;

pub type Result<T> = std::result::Result<T, rilldb_error::Error>;
