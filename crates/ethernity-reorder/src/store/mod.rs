//! Implementações de `FindingsStore`

mod memory;
mod redb_store;

pub use memory::MemoryFindingsStore;
pub use redb_store::{RedbFindingsStore, DB_FILE};
