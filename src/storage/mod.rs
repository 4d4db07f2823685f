pub mod session_cache;
pub mod store;

pub use session_cache::SessionCache;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
