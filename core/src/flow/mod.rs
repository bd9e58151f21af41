// paygate/src/flow/mod.rs

pub mod catalog_entry;

pub use catalog_entry::{CatalogEntryFlow, EntryInput, EntryReply, EntryStep};
