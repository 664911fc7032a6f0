pub mod http_remote_store;
pub mod memory_remote_store;

pub use http_remote_store::HttpRemoteStore;
pub use memory_remote_store::MemoryRemoteStore;
