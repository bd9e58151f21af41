// paygate/server/src/db/mod.rs

pub mod catalog;
pub mod orders;
pub mod schema;

pub use catalog::PgCatalogRepository;
pub use orders::PgOrderRepository;
