//! Subscription entries and their persistence.

mod entry;
mod error;
mod store;

pub use entry::{ConfigEntry, entry_title};
pub use error::StoreError;
pub use store::{EntryStore, FileEntryStore, MemoryEntryStore};
