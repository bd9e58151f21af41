// paygate/server/src/models/mod.rs

//! Row types for the PostgreSQL repositories and their conversion into engine types.

pub mod order;
pub mod product;

pub use order::{OrderRow, ORDER_COLUMNS};
pub use product::{ProductRow, PRODUCT_COLUMNS};
