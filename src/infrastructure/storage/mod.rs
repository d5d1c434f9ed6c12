mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryDurableStore;
pub use sqlite_store::SqliteDurableStore;
