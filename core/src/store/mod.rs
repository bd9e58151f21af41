// paygate/src/store/mod.rs

pub mod catalog_store;
pub mod keyed;
pub mod memory;
pub mod order_store;
pub mod repository;

pub use catalog_store::CatalogStore;
pub use memory::{InMemoryCatalogRepository, InMemoryOrderRepository};
pub use order_store::{OrderStore, TransitionReport};
pub use repository::{AppliedEvent, AttachResult, CatalogRepository, OrderRepository};
